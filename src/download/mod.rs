//! HTTP retrieval into a local cache directory.
//!
//! This module fetches already-resolved download URLs and streams each body
//! into a file under a [`CacheDir`].
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Filename from Content-Disposition, URL path, or a timestamped fallback
//! - Extension inference from the content type
//! - Optional HTTP/1.1 forcing, gzip decoding, and browser header profile
//! - Configurable timeouts (30s connect, 5min overall, optional header timeout)
//! - Structured error types with full context
//! - Collision-safe file creation (numeric suffix, never overwrite)
//! - Bounded-concurrency batches with per-file failure isolation
//!
//! # Example
//!
//! ```no_run
//! use sharefetch_core::download::{CacheDir, FetchOptions, Fetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(CacheDir::new("./cache"), FetchOptions::default())?;
//! let fetched = fetcher.fetch("https://example.com/video.mp4").await?;
//! println!("Downloaded: {}", fetched.path.display());
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
mod constants;
mod engine;
mod error;
pub mod filename;

pub use cache::CacheDir;
pub use client::{FetchOptions, Fetcher, RetrievalResult};
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_CACHE_DIR, REQUEST_TIMEOUT_SECS};
pub use engine::{BatchFetcher, BatchReport, DEFAULT_CONCURRENCY, EngineError, FileOutcome};
pub use error::{FailureKind, FetchError};
pub use filename::{ensure_extension, resolve_filename, sanitize_filename};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
