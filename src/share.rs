//! Share link records, as handed over by an external link resolver.
//!
//! A share link names a bundle of files on a hosting service. Turning it into
//! direct download URLs is somebody else's job; this module only reads the
//! resolver's JSON listing and offers helpers for presenting it.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Share links on the supported hosts: `/s/<id>` or `/sharing/link?surl=<id>`.
#[allow(clippy::expect_used)]
static SHARE_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:https?://)?(?:www\.)?(?:mirrobox\.com|nephobox\.com|freeterabox\.com|1024tera\.com|1024terabox\.com|terabox\.com|4funbox\.com|terabox\.app|terabox\.fun|tibibox\.com|momerybox\.com|teraboxapp\.com|4funbox\.co)/(?:s/[a-zA-Z0-9_-]+|sharing/link\?surl=[a-zA-Z0-9_-]+)",
    )
    .expect("share link regex is valid") // Static pattern, safe to panic
});

/// Errors reading a resolver listing.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The listing is not the expected JSON shape.
    #[error("invalid share listing: {source}")]
    InvalidListing {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The resolver reported a non-zero error number.
    #[error("resolver returned errno {errno}")]
    Resolver {
        /// The resolver's error number.
        errno: i64,
    },
}

/// One file inside a share.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShareFile {
    /// Display name on the hosting service.
    #[serde(rename = "server_filename", default)]
    pub filename: String,
    /// Size in bytes as reported by the service.
    #[serde(default)]
    pub size: u64,
    /// CDN download link.
    #[serde(default)]
    pub dlink: String,
    /// Faster direct link, when the resolver offers one.
    #[serde(default)]
    pub direct_link: String,
    /// Streaming page URL.
    #[serde(default)]
    pub stream_url: String,
}

impl ShareFile {
    /// The URL to fetch: `direct_link`, falling back to `dlink`.
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        [self.direct_link.as_str(), self.dlink.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|url| !url.is_empty())
    }
}

/// The resolver's answer for one share link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShareListing {
    /// Zero on success.
    #[serde(default)]
    pub errno: i64,
    /// Identifier of the share on the hosting service.
    #[serde(default)]
    pub share_id: String,
    /// Files in the share.
    #[serde(default)]
    pub list: Vec<ShareFile>,
}

impl ShareListing {
    /// Parses a resolver listing from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::InvalidListing`] for malformed JSON and
    /// [`ShareError::Resolver`] when `errno` is non-zero.
    pub fn from_json(raw: &str) -> Result<Self, ShareError> {
        let listing: Self =
            serde_json::from_str(raw).map_err(|source| ShareError::InvalidListing { source })?;
        if listing.errno != 0 {
            return Err(ShareError::Resolver {
                errno: listing.errno,
            });
        }
        Ok(listing)
    }
}

/// Whether `text` is a share link on one of the supported hosts.
///
/// The link must start the text (leading whitespace aside), so a direct URL
/// that merely mentions a share link in its query string does not match.
#[must_use]
pub fn is_share_link(text: &str) -> bool {
    SHARE_LINK_PATTERN.is_match(text)
}

/// Human-readable size with binary units: `512 B`, `1.50 KB`, `2.00 GB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.2} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}
