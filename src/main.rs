//! CLI entry point for the sharefetch tool.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sharefetch_core::{BatchFetcher, Fetcher, ShareListing, format_bytes, is_share_link};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_config(args.config.as_deref())?;
    if loaded.loaded_from_file() {
        debug!(path = ?loaded.path, "loaded config file");
    }
    let settings = app_config::resolve_settings(&args, loaded.config.as_ref());
    debug!(?settings, "effective settings");

    let mut urls = Vec::new();
    if let Some(path) = &args.share_json {
        urls.extend(urls_from_listing(path)?);
    }
    if !args.urls.is_empty() {
        urls.extend(urls_from_lines(&args.urls.join("\n")));
    } else if args.share_json.is_none() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        urls.extend(urls_from_lines(&buffer));
    }

    if urls.is_empty() {
        info!("No input provided. Pass URLs as arguments, pipe them via stdin, or use --share-json.");
        info!("Example: echo 'https://example.com/file.zip' | sharefetch");
        return Ok(ExitCode::SUCCESS);
    }

    info!(
        files = urls.len(),
        cache_dir = %settings.cache.path().display(),
        "fetching"
    );

    let fetcher = Fetcher::new(settings.cache, settings.fetch)
        .context("Failed to build HTTP client")?;
    let batch = BatchFetcher::new(settings.concurrency)?;
    let report = batch.fetch_all(&fetcher, &urls).await?;

    for (_, fetched) in report.successes() {
        println!("{}\t{}", fetched.path.display(), fetched.content_type);
    }

    info!(
        completed = report.completed(),
        failed = report.failed(),
        total = report.total(),
        "Fetch complete"
    );

    match report.failure_summary() {
        Some(summary) => {
            eprintln!("{summary}");
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

/// Reads a resolver listing and returns the download URL of each file.
fn urls_from_listing(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read share listing '{}'", path.display()))?;
    let listing = ShareListing::from_json(&raw)
        .with_context(|| format!("Failed to load share listing '{}'", path.display()))?;

    info!(share_id = %listing.share_id, files = listing.list.len(), "share listing loaded");

    let mut urls = Vec::with_capacity(listing.list.len());
    for file in &listing.list {
        match file.download_url() {
            Some(url) => {
                info!(name = %file.filename, size = %format_bytes(file.size), "queued");
                urls.push(url.to_string());
            }
            None => warn!(name = %file.filename, "no download link in listing, skipping"),
        }
    }
    Ok(urls)
}

/// One URL per non-blank line; `#` starts a comment line.
///
/// Unresolved share links are skipped with a warning since they point at a
/// landing page rather than the file.
fn urls_from_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            if is_share_link(line) {
                warn!(url = %line, "share link needs resolving first, skipping");
                false
            } else {
                true
            }
        })
        .map(str::to_string)
        .collect()
}
