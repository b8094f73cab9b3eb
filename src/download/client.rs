//! The retrieval engine: one GET, one file in the cache directory.
//!
//! [`Fetcher`] wraps a configured `reqwest` client and a [`CacheDir`]. Each
//! call to [`Fetcher::fetch`] runs the same linear sequence with no retries:
//! ensure the cache directory, send the request, check the status, pick a
//! filename, stream the (optionally gzip-decoded) body to disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::cache::CacheDir;
use super::constants::{CONNECT_TIMEOUT_SECS, MAX_COLLISION_SUFFIX, REQUEST_TIMEOUT_SECS};
use super::error::FetchError;
use super::filename::{
    ensure_extension, mime_essence, resolve_filename, sanitize_filename, suffixed_filename,
    timestamp,
};
use crate::user_agent::{BROWSER_USER_AGENT, browser_headers, default_fetch_user_agent};

/// Transport options for a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Speak HTTP/1.1 only.
    pub force_http1: bool,
    /// Transparently decode `Content-Encoding: gzip` bodies.
    pub decode_gzip: bool,
    /// Send the Firefox header profile instead of the tool User-Agent.
    pub spoof_browser_headers: bool,
    /// Upper bound on the wait for response headers, on top of the overall timeout.
    pub header_timeout: Option<Duration>,
    /// Overall timeout covering connect, headers and the full body.
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            force_http1: true,
            decode_gzip: true,
            spoof_browser_headers: false,
            header_timeout: None,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        }
    }
}

/// A file that landed in the cache directory.
///
/// The caller owns the file from here on; the fetcher keeps no handle to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalResult {
    /// Path of the written file, under the cache directory.
    pub path: PathBuf,
    /// Response content type without parameters (`text/html; charset=utf-8` -> `text/html`).
    /// Empty when the server sent none.
    pub content_type: String,
}

/// HTTP fetcher writing into a [`CacheDir`].
///
/// Create once and share: cloning is cheap and clones reuse the connection pool.
///
/// # Example
///
/// ```no_run
/// use sharefetch_core::download::{CacheDir, FetchOptions, Fetcher};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Fetcher::new(CacheDir::default(), FetchOptions::default())?;
/// let fetched = fetcher.fetch("https://example.com/file.zip").await?;
/// println!("{} ({})", fetched.path.display(), fetched.content_type);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    cache: CacheDir,
    options: FetchOptions,
}

impl Fetcher {
    /// Creates a fetcher with the given storage root and options.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the TLS backend or resolver
    /// cannot be initialized.
    #[instrument(level = "debug", skip(cache), fields(cache = %cache.path().display()))]
    pub fn new(cache: CacheDir, options: FetchOptions) -> Result<Self, reqwest::Error> {
        let client = client_builder(&options).build()?;
        Ok(Self {
            client,
            cache,
            options,
        })
    }

    /// Returns the storage root.
    #[must_use]
    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }

    /// Returns the options this fetcher was built with.
    #[must_use]
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Downloads `url` into the cache directory.
    ///
    /// The filename comes from `Content-Disposition`, then the URL path, then
    /// a timestamped synthetic name; an extension is added from the content
    /// type when missing and the result is sanitized. An existing file with
    /// the same name is never overwritten: `name_1.ext`, `name_2.ext`, ... are
    /// tried instead.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Storage`] if the cache directory or file cannot be written
    /// - [`FetchError::InvalidUrl`] if `url` does not parse
    /// - [`FetchError::Network`] / [`FetchError::Timeout`] on transport failure
    /// - [`FetchError::Upstream`] for any status other than `200 OK`
    /// - [`FetchError::Decode`] if a gzip body cannot be decoded
    ///
    /// A partially written file is removed before any error is returned.
    #[must_use = "fetch result contains the path to the downloaded file"]
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<RetrievalResult, FetchError> {
        self.cache.ensure().await?;

        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        info!("downloading");

        let response = self.send(parsed, url).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::upstream(
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown"),
            ));
        }

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(mime_essence)
            .unwrap_or_default()
            .to_string();
        // reqwest strips this header once it has taken over decoding
        let raw_encoding = headers
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok());
        debug!(
            content_type = %content_type,
            content_encoding = raw_encoding.unwrap_or("identity"),
            decode_gzip = self.options.decode_gzip,
            "response accepted"
        );

        let candidate = resolve_filename(url, headers);
        let filename = sanitize_filename(&ensure_extension(&candidate, &content_type));
        let (file, path) = create_destination(self.cache.path(), &filename).await?;
        debug!(candidate = %candidate, path = %path.display(), "resolved output path");

        let started = Instant::now();
        let decoding = self.options.decode_gzip;
        let written = match stream_to_file(file, response, url, &path, decoding).await {
            Ok(written) => written,
            Err(e) => {
                debug!(path = %path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
        };
        let elapsed = started.elapsed();

        info!(
            path = %path.display(),
            bytes = written,
            megabytes = format_args!("{:.2}", megabytes(written)),
            seconds = format_args!("{:.2}", elapsed.as_secs_f64()),
            kib_per_sec = format_args!("{:.2}", kib_per_sec(written, elapsed)),
            "download complete"
        );

        Ok(RetrievalResult { path, content_type })
    }

    async fn send(&self, url: Url, raw_url: &str) -> Result<reqwest::Response, FetchError> {
        let pending = self.client.get(url).send();
        let result = match self.options.header_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| FetchError::timeout(raw_url))?,
            None => pending.await,
        };
        result.map_err(|e| FetchError::from_transport(raw_url, e))
    }
}

fn client_builder(options: &FetchOptions) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(options.connect_timeout)
        .timeout(options.request_timeout)
        .gzip(options.decode_gzip);
    builder = if options.spoof_browser_headers {
        builder
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
    } else {
        builder.user_agent(default_fetch_user_agent())
    };
    if options.force_http1 {
        builder = builder.http1_only();
    }
    builder
}

/// Opens a new file for `filename` under `dir` without clobbering anything.
async fn create_destination(dir: &Path, filename: &str) -> Result<(File, PathBuf), FetchError> {
    for n in 0..MAX_COLLISION_SUFFIX {
        let name = if n == 0 {
            filename.to_string()
        } else {
            suffixed_filename(filename, n)
        };
        let path = dir.join(name);
        match create_new(&path).await {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(FetchError::storage(path, e)),
        }
    }

    // Fallback (extremely unlikely)
    let path = dir.join(suffixed_filename(filename, timestamp()));
    let file = create_new(&path)
        .await
        .map_err(|e| FetchError::storage(path.clone(), e))?;
    Ok((file, path))
}

async fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

/// Streams response body to file, returning bytes written.
///
/// Split out so the caller can remove the file on error.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    decoding: bool,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::from_body(url, e, decoding))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::storage(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::storage(file_path, e))?;

    Ok(bytes_written)
}

#[allow(clippy::cast_precision_loss)]
fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

#[allow(clippy::cast_precision_loss)]
fn kib_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        return 0.0;
    }
    bytes as f64 / secs / 1024.0
}
