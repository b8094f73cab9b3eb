//! Constants for the download module (timeouts, cache location).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default overall request timeout (5 minutes for large files).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Attempts at a numbered name before falling back to a timestamp suffix.
pub const MAX_COLLISION_SUFFIX: usize = 1000;
