//! Filename derivation, sanitization, and extension inference for fetched files.
//!
//! The engine runs these in a fixed order for every retrieval:
//! [`resolve_filename`] picks a candidate, [`ensure_extension`] adds an
//! extension from the content type when the candidate lacks one, and
//! [`sanitize_filename`] makes the result safe to join onto the cache directory.

use std::borrow::Cow;
use std::path::Path;

use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use url::Url;

/// Prefix for names synthesized from the URL when nothing better exists.
pub const SYNTHETIC_PREFIX: &str = "download_";

/// Prefix for names that sanitize down to nothing.
pub const EMPTY_NAME_PREFIX: &str = "file_";

/// Maximum number of URL characters embedded in a synthetic name.
pub const SYNTHETIC_URL_CHARS: usize = 50;

/// Derives a candidate filename for a response.
///
/// Resolution order (first success wins):
/// 1. `filename*` / `filename` parameter of `Content-Disposition`
/// 2. Final path segment of the URL
/// 3. `download_<timestamp>_<cleaned url>`
///
/// The result is not sanitized yet.
#[must_use]
pub fn resolve_filename(url: &str, headers: &HeaderMap) -> String {
    if let Some(name) = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_disposition)
    {
        return name;
    }

    if let Some(name) = Url::parse(url)
        .ok()
        .as_ref()
        .and_then(filename_from_url_path)
    {
        return name;
    }

    synthetic_filename(url)
}

/// Parses a Content-Disposition header value and extracts its filename.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example%20file.pdf` (RFC 5987)
///
/// `filename*` wins over `filename` when both are present. Parameter names
/// match case-insensitively.
#[must_use]
pub fn parse_content_disposition(header: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets valid for slicing `header`.
    let lower = header.to_ascii_lowercase();

    if let Some(pos) = lower.find("filename*=") {
        let raw = header[pos + "filename*=".len()..].trim_start();
        let value = raw.split(';').next().unwrap_or("").trim().trim_matches('"');
        let encoded = strip_charset_marker(value);
        let decoded =
            urlencoding::decode(encoded).map_or_else(|_| encoded.to_string(), Cow::into_owned);
        if !decoded.trim().is_empty() {
            return Some(decoded);
        }
    }

    if let Some(pos) = lower.find("filename=") {
        let raw = header[pos + "filename=".len()..].trim_start();
        let value = if let Some(quoted) = raw.strip_prefix('"') {
            quoted.split('"').next().unwrap_or("")
        } else {
            raw.split(';').next().unwrap_or("").trim()
        };
        let value = strip_charset_marker(value);
        if !value.trim().is_empty() {
            return Some(value.to_string());
        }
    }

    None
}

/// Drops a leading `charset'language'` marker such as `UTF-8''`.
fn strip_charset_marker(value: &str) -> &str {
    let mut parts = value.splitn(3, '\'');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(charset), Some(_language), Some(rest)) if is_charset_label(charset) => rest,
        _ => value,
    }
}

fn is_charset_label(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    label.starts_with("utf-") || label.starts_with("iso-") || label == "us-ascii"
}

/// Final, percent-decoded path segment, ignoring trailing slashes.
fn filename_from_url_path(url: &Url) -> Option<String> {
    let path = url.path().trim_end_matches('/');
    let last = path.rsplit('/').next()?;
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), Cow::into_owned);
    if decoded.is_empty() || matches!(decoded.as_str(), "." | ".." | "/") {
        return None;
    }
    Some(decoded)
}

/// Builds `download_<timestamp>_<cleaned url>` for URLs without a usable name.
#[must_use]
pub fn synthetic_filename(url: &str) -> String {
    let cleaned = url
        .replace("https://", "")
        .replace("http://", "")
        .replace("www.", "")
        .replace(['/', '?', '&', '='], "_");
    let truncated: String = cleaned.chars().take(SYNTHETIC_URL_CHARS).collect();
    format!("{SYNTHETIC_PREFIX}{}_{truncated}", timestamp())
}

/// Sanitizes a filename for the local filesystem.
///
/// Control characters and `< > : " / \ | ? *` become `_`, surrounding
/// whitespace and dots are trimmed, and an empty result is replaced with
/// `file_<timestamp>`. Idempotent.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        return format!("{EMPTY_NAME_PREFIX}{}", timestamp());
    }
    trimmed.to_string()
}

/// Appends an extension derived from `content_type` when `filename` has none.
///
/// Names that already carry an extension are trusted over MIME inference.
/// Unknown content types leave the name unchanged apart from dropping
/// trailing dots, so `video.` never becomes `video..png`.
#[must_use]
pub fn ensure_extension(filename: &str, content_type: &str) -> String {
    let base = filename.trim_end_matches('.');
    if base.is_empty() {
        return filename.to_string();
    }
    if has_extension(base) {
        return base.to_string();
    }

    let mime = mime_essence(content_type).to_ascii_lowercase();
    if mime.is_empty() {
        return base.to_string();
    }

    match mime_guess::get_mime_extensions_str(&mime).and_then(|exts| exts.first()) {
        Some(ext) => format!("{base}.{ext}"),
        None => base.to_string(),
    }
}

/// Content type without parameters: `text/html; charset=utf-8` -> `text/html`.
#[must_use]
pub fn mime_essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

fn has_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| !ext.is_empty())
}

/// `report.pdf` with suffix `2` becomes `report_2.pdf`.
pub(crate) fn suffixed_filename(filename: &str, suffix: impl std::fmt::Display) -> String {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => format!("{}_{suffix}{}", &filename[..pos], &filename[pos..]),
        _ => format!("{filename}_{suffix}"),
    }
}

/// Local time, second resolution, lexically sortable.
pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn disposition(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_resolve_filename_prefers_content_disposition() {
        let headers = disposition(r#"attachment; filename="report.pdf""#);
        assert_eq!(
            resolve_filename("https://example.com/a/b/c.zip", &headers),
            "report.pdf"
        );
    }

    #[test]
    fn test_resolve_filename_uses_last_path_segment() {
        assert_eq!(
            resolve_filename("https://example.com/a/b/c.zip", &HeaderMap::new()),
            "c.zip"
        );
    }

    #[test]
    fn test_resolve_filename_ignores_trailing_slash() {
        assert_eq!(
            resolve_filename("https://example.com/files/bundle/", &HeaderMap::new()),
            "bundle"
        );
    }

    #[test]
    fn test_resolve_filename_percent_decodes_path_segment() {
        assert_eq!(
            resolve_filename("https://example.com/my%20video.mp4", &HeaderMap::new()),
            "my video.mp4"
        );
    }

    #[test]
    fn test_resolve_filename_without_path_is_synthetic() {
        let name = resolve_filename("https://example.com", &HeaderMap::new());
        let pattern = regex::Regex::new(r"^download_\d{8}_\d{6}_example\.com$").unwrap();
        assert!(pattern.is_match(&name), "unexpected synthetic name: {name}");
    }

    #[test]
    fn test_resolve_filename_empty_disposition_falls_through() {
        let headers = disposition(r#"attachment; filename="""#);
        assert_eq!(
            resolve_filename("https://example.com/x/clip.mkv", &headers),
            "clip.mkv"
        );
    }

    #[test]
    fn test_resolve_filename_unparseable_url_is_synthetic() {
        let name = resolve_filename("not a url", &HeaderMap::new());
        assert!(name.starts_with(SYNTHETIC_PREFIX));
    }

    #[test]
    fn test_synthetic_filename_is_bounded() {
        let long = format!("https://www.example.com/{}?a=1&b=2", "x".repeat(200));
        let name = synthetic_filename(&long);
        let tail = name.splitn(4, '_').nth(3).unwrap();
        assert_eq!(tail.chars().count(), SYNTHETIC_URL_CHARS);
        assert!(tail.starts_with("example.com_"));
        assert!(!name.contains('/'));
        assert!(name.len() <= SYNTHETIC_PREFIX.len() + 16 + SYNTHETIC_URL_CHARS);
    }

    #[test]
    fn test_synthetic_filename_replaces_query_separators() {
        let name = synthetic_filename("http://host.test/dl?id=7&k=v");
        assert!(name.ends_with("_host.test_dl_id_7_k_v"), "got {name}");
    }

    #[test]
    fn test_parse_content_disposition_quoted() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="example.pdf""#),
            Some("example.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_unquoted() {
        assert_eq!(
            parse_content_disposition("attachment; filename=example.pdf"),
            Some("example.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_with_trailing_params() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="example.pdf"; size=1234"#),
            Some("example.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_rfc5987() {
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''example%20file.pdf"),
            Some("example file.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_rfc5987_with_language() {
        assert_eq!(
            parse_content_disposition("attachment; filename*=utf-8'en'notes.txt"),
            Some("notes.txt".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_encoding_marker_in_plain_filename() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="UTF-8''movie.mp4""#),
            Some("movie.mp4".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_keeps_apostrophes() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="O'Brien's notes.txt""#),
            Some("O'Brien's notes.txt".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_prefers_extended_parameter() {
        let header = r#"attachment; filename="fallback.bin"; filename*=UTF-8''real.bin"#;
        assert_eq!(parse_content_disposition(header), Some("real.bin".to_string()));
    }

    #[test]
    fn test_parse_content_disposition_case_insensitive_name() {
        assert_eq!(
            parse_content_disposition(r#"Attachment; FileName="Data.CSV""#),
            Some("Data.CSV".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_missing() {
        assert_eq!(parse_content_disposition("attachment"), None);
        assert_eq!(parse_content_disposition("inline"), None);
    }

    #[test]
    fn test_sanitize_filename_replaces_reserved_chars() {
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("tab\tname\u{0}.txt"), "tab_name_.txt");
    }

    #[test]
    fn test_sanitize_filename_trims_whitespace_and_dots() {
        assert_eq!(sanitize_filename("  .hidden.txt. "), "hidden.txt");
        assert_eq!(sanitize_filename("...name..."), "name");
    }

    #[test]
    fn test_sanitize_filename_preserves_valid_chars() {
        assert_eq!(sanitize_filename("valid-file_name (1).pdf"), "valid-file_name (1).pdf");
        assert_eq!(sanitize_filename("日本語.pdf"), "日本語.pdf");
    }

    #[test]
    fn test_sanitize_filename_empty_gets_timestamp_name() {
        for input in ["", "   ", "..", ".", " . . "] {
            let name = sanitize_filename(input);
            assert!(name.starts_with(EMPTY_NAME_PREFIX), "got {name} for {input:?}");
            assert!(name.len() > EMPTY_NAME_PREFIX.len());
        }
    }

    #[test]
    fn test_sanitize_filename_is_idempotent_and_safe() {
        let inputs = [
            "report.pdf",
            "../../etc/passwd",
            " <weird>: name?.zip. ",
            "\u{1}\u{2}\u{3}",
            "a\\b/c",
            "...",
            "ok name",
            "\u{7f}del",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            let twice = sanitize_filename(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
            assert!(!once.is_empty());
            assert!(
                !once.chars().any(|c| "<>:\"/\\|?*".contains(c) || c.is_control()),
                "unsafe output {once:?} for {input:?}"
            );
        }
    }

    #[test]
    fn test_ensure_extension_appends_png() {
        assert_eq!(ensure_extension("picture", "image/png"), "picture.png");
    }

    #[test]
    fn test_ensure_extension_keeps_existing_extension() {
        assert_eq!(ensure_extension("photo.jpg", "image/png"), "photo.jpg");
    }

    #[test]
    fn test_ensure_extension_trailing_dot_not_doubled() {
        assert_eq!(ensure_extension("video.", "image/png"), "video.png");
        assert_eq!(ensure_extension("clip.mp4..", "image/png"), "clip.mp4");
        assert_eq!(sanitize_filename(&ensure_extension("video.", "image/png")), "video.png");
    }

    #[test]
    fn test_ensure_extension_only_dots_left_for_sanitizer() {
        assert_eq!(ensure_extension("...", "image/png"), "...");
        assert!(sanitize_filename(&ensure_extension("...", "image/png")).starts_with("file_"));
    }

    #[test]
    fn test_ensure_extension_strips_parameters() {
        let name = ensure_extension("page", "text/html; charset=utf-8");
        assert!(name.starts_with("page."), "got {name}");
        assert_ne!(name, "page");
    }

    #[test]
    fn test_ensure_extension_unknown_type_unchanged() {
        assert_eq!(ensure_extension("blob", "application/x-not-a-real-type"), "blob");
        assert_eq!(ensure_extension("blob", ""), "blob");
    }

    #[test]
    fn test_mime_essence_strips_parameters() {
        assert_eq!(mime_essence("text/html; charset=utf-8"), "text/html");
        assert_eq!(mime_essence("video/mp4"), "video/mp4");
        assert_eq!(mime_essence(""), "");
    }

    #[test]
    fn test_suffixed_filename() {
        assert_eq!(suffixed_filename("report.pdf", 2), "report_2.pdf");
        assert_eq!(suffixed_filename("archive.tar.gz", 1), "archive.tar_1.gz");
        assert_eq!(suffixed_filename("README", 3), "README_3");
        assert_eq!(suffixed_filename(".env", "x"), ".env_x");
    }
}
