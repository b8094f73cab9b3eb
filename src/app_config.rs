//! Application configuration loading for CLI defaults.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use sharefetch_core::download::{
    CONNECT_TIMEOUT_SECS, CacheDir, DEFAULT_CACHE_DIR, DEFAULT_CONCURRENCY, FetchOptions,
    REQUEST_TIMEOUT_SECS,
};

use crate::cli::Args;

/// TOML-backed file configuration for fetch defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory that receives fetched files.
    pub cache_dir: Option<PathBuf>,
    /// Default concurrency (same range as CLI).
    pub concurrency: Option<u8>,
    /// Force HTTP/1.1 on every connection.
    pub force_http1: Option<bool>,
    /// Decode gzip content-encoding before writing.
    pub decode_gzip: Option<bool>,
    /// Send the desktop browser header profile.
    pub browser_headers: Option<bool>,
    /// Seconds to wait for response headers.
    pub header_timeout_secs: Option<u64>,
    /// Overall per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=100");
        }
        if let Some(dir) = &self.cache_dir
            && dir.as_os_str().is_empty()
        {
            bail!("Invalid config value for `cache_dir`: must not be empty");
        }
        validate_timeout_secs("header_timeout_secs", self.header_timeout_secs)?;
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Indicates whether configuration was loaded from disk.
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/sharefetch/config.toml`
/// 2. `$HOME/.config/sharefetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    config_path_from(
        env_var_non_empty_os("XDG_CONFIG_HOME"),
        env_var_non_empty_os("HOME"),
    )
}

fn config_path_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    if let Some(xdg_config_home) = xdg_config_home {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("sharefetch")
                .join("config.toml"),
        );
    }
    let home = home?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("sharefetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` when given, otherwise from the default path
/// if a file exists there.
///
/// An explicitly named file must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Effective settings after merging CLI flags over file config over defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache: CacheDir,
    pub concurrency: usize,
    pub fetch: FetchOptions,
}

/// Merges `args` over `file` over built-in defaults.
#[must_use]
pub fn resolve_settings(args: &Args, file: Option<&FileConfig>) -> Settings {
    let file = file.cloned().unwrap_or_default();

    let cache_root = args
        .cache_dir
        .clone()
        .or(file.cache_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

    let concurrency = args
        .concurrency
        .or(file.concurrency)
        .map_or(DEFAULT_CONCURRENCY, usize::from);

    let force_http1 = if args.allow_http2 {
        false
    } else {
        file.force_http1.unwrap_or(true)
    };
    let decode_gzip = if args.no_gzip {
        false
    } else {
        file.decode_gzip.unwrap_or(true)
    };
    let spoof_browser_headers = args.browser_headers || file.browser_headers.unwrap_or(false);

    let header_timeout = args
        .header_timeout
        .or(file.header_timeout_secs)
        .map(Duration::from_secs);
    let request_timeout = Duration::from_secs(
        args.timeout
            .or(file.request_timeout_secs)
            .unwrap_or(REQUEST_TIMEOUT_SECS),
    );
    let connect_timeout = Duration::from_secs(
        args.connect_timeout
            .or(file.connect_timeout_secs)
            .unwrap_or(CONNECT_TIMEOUT_SECS),
    );

    Settings {
        cache: CacheDir::new(cache_root),
        concurrency,
        fetch: FetchOptions {
            force_http1,
            decode_gzip,
            spoof_browser_headers,
            header_timeout,
            request_timeout,
            connect_timeout,
        },
    }
}
