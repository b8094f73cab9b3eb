//! Error types for the download module.
//!
//! Every failure is scoped to a single retrieval; none of them is retried
//! internally and none is fatal to the process.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a file into the cache directory.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The cache directory or destination file could not be created or written.
    #[error("storage error at {path}: {source}")]
    Storage {
        /// The directory or file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with something other than `200 OK`.
    #[error("bad status: {status} {reason} fetching {url}")]
    Upstream {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase, kept for diagnostics.
        reason: String,
    },

    /// The declared content encoding could not be decoded.
    #[error("decode error fetching {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying decoder error.
        #[source]
        source: reqwest::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The task running the fetch died before producing a result.
    #[error("fetch task for {url} failed: {reason}")]
    TaskFailed {
        /// The URL the task was fetching.
        url: String,
        /// Panic or cancellation message from the runtime.
        reason: String,
    },
}

/// Coarse classification of a [`FetchError`], for callers that report
/// per-file failures without caring about the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Cache directory or destination file problem.
    Storage,
    /// Connection, DNS or timeout failure.
    Network,
    /// Non-200 response.
    Upstream,
    /// Content-encoding decode failure.
    Decode,
    /// The caller handed over something that is not a URL.
    InvalidInput,
    /// The fetch task panicked or was cancelled.
    Internal,
}

impl FailureKind {
    /// Returns the stable label used in summaries and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Upstream => "upstream",
            Self::Decode => "decode",
            Self::InvalidInput => "invalid-input",
            Self::Internal => "internal",
        }
    }
}

impl FetchError {
    /// Creates a storage error.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an upstream status error.
    pub fn upstream(url: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self::Upstream {
            url: url.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an error for a fetch task that panicked or was cancelled.
    pub fn task_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Maps a reqwest error raised while sending a request.
    pub(crate) fn from_transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Maps a reqwest error raised while reading the response body.
    ///
    /// reqwest tags every body failure as a decode error, truncated plain
    /// bodies included. Only a failure of the content decoder itself, with
    /// gzip decoding switched on, is reported as [`FetchError::Decode`].
    pub(crate) fn from_body(url: &str, source: reqwest::Error, decoding: bool) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else if decoding && source.is_decode() && !is_transport_failure(&source) {
            Self::decode(url, source)
        } else {
            Self::network(url, source)
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Storage { .. } => FailureKind::Storage,
            Self::Network { .. } | Self::Timeout { .. } => FailureKind::Network,
            Self::Upstream { .. } => FailureKind::Upstream,
            Self::Decode { .. } => FailureKind::Decode,
            Self::InvalidUrl { .. } => FailureKind::InvalidInput,
            Self::TaskFailed { .. } => FailureKind::Internal,
        }
    }
}

/// Whether a body error was caused by the connection rather than the decoder.
fn is_transport_failure(source: &reqwest::Error) -> bool {
    let mut next = std::error::Error::source(source);
    while let Some(err) = next {
        if err
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_body() || e.is_timeout())
        {
            return true;
        }
        if let Some(io) = err.downcast_ref::<std::io::Error>()
            && matches!(
                io.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
            )
        {
            return true;
        }
        next = err.source();
    }
    false
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the url
// or path that the source error does not carry.
