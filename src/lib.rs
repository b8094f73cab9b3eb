//! Sharefetch Core Library
//!
//! Fetches files behind resolved share links into a local cache directory.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Retrieval engine: filename resolution, gzip negotiation,
//!   streaming to the cache directory, bounded-concurrency batches
//! - [`share`] - Share link records from an external resolver, size formatting

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod share;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{
    BatchFetcher, BatchReport, CacheDir, DEFAULT_CONCURRENCY, EngineError, FailureKind,
    FetchError, FetchOptions, Fetcher, FileOutcome, RetrievalResult,
};
pub use share::{ShareError, ShareFile, ShareListing, format_bytes, is_share_link};
