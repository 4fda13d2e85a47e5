//! URL scanning, validation and normalization helpers for the extractor.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use url::Url;

use super::error::{ExtractionError, MAX_URL_LENGTH};

/// Matches absolute http/https URLs that appear verbatim in page text or
/// inline scripts, up to whitespace, quotes or angle brackets.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'\]\\]+"#).expect("URL regex is valid")
});

/// Finds absolute URLs written verbatim anywhere in `text`.
///
/// Candidates that fail to parse are dropped.
pub(crate) fn scan_absolute_urls(text: &str) -> impl Iterator<Item = Url> + '_ {
    URL_PATTERN.find_iter(text).filter_map(|m| {
        let cleaned = clean_url_trailing(m.as_str());
        trace!(url = %cleaned, "found verbatim URL candidate");
        Url::parse(cleaned).ok()
    })
}

/// Strips sentence punctuation and unbalanced closing brackets that a text
/// scan captures along with a URL.
pub(crate) fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' => {
                result = &result[..result.len() - 1];
            }
            ')' | ']' => {
                // Keep balanced pairs (Wikipedia-style paths).
                let open = if last == ')' { '(' } else { '[' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

/// Removes the fragment so `a.pdf#page=2` and `a.pdf` key the same task.
pub(crate) fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Returns true for schemes the scheduler can fetch.
pub(crate) fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host().is_some()
}

/// Validates the page URL given on the command line.
///
/// # Validation rules
/// - Must not exceed [`MAX_URL_LENGTH`] chars
/// - Must be parseable by the `url` crate
/// - Must use http or https
/// - Must have a host
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidUrl`] describing the first rule broken.
pub fn parse_page_url(raw: &str) -> Result<Url, ExtractionError> {
    let raw = raw.trim();
    if raw.len() > MAX_URL_LENGTH {
        return Err(ExtractionError::too_long(raw));
    }

    let parsed = Url::parse(raw).map_err(|e| ExtractionError::malformed(raw, &e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(ExtractionError::unsupported_scheme(raw, scheme)),
    }

    if parsed.host().is_none() {
        return Err(ExtractionError::no_host(raw));
    }

    Ok(parsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_urls_in_script_text() {
        let text = r#"<script>var f = "https://cdn.example.com/files/report.pdf";</script>"#;
        let urls: Vec<Url> = scan_absolute_urls(text).collect();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "https://cdn.example.com/files/report.pdf");
    }

    #[test]
    fn test_clean_url_trailing_strips_sentence_punctuation() {
        assert_eq!(
            clean_url_trailing("https://example.com/a.pdf,"),
            "https://example.com/a.pdf"
        );
        assert_eq!(
            clean_url_trailing("https://example.com/a.pdf)."),
            "https://example.com/a.pdf"
        );
    }

    #[test]
    fn test_clean_url_trailing_keeps_balanced_parens() {
        let url = "https://en.wikipedia.org/wiki/Rust_(language)";
        assert_eq!(clean_url_trailing(url), url);
    }

    #[test]
    fn test_normalize_drops_fragment() {
        let url = Url::parse("https://example.com/a.pdf#page=3").unwrap();
        assert_eq!(normalize(url).as_str(), "https://example.com/a.pdf");
    }

    #[test]
    fn test_parse_page_url_accepts_https() {
        let url = parse_page_url("  https://example.com/docs ").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_parse_page_url_rejects_ftp() {
        let err = parse_page_url("ftp://files.example.com/").unwrap_err();
        assert!(err.to_string().contains("scheme 'ftp'"), "{err}");
    }

    #[test]
    fn test_parse_page_url_rejects_garbage() {
        assert!(matches!(
            parse_page_url("not a url"),
            Err(ExtractionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_is_fetchable_rejects_mailto_and_data() {
        assert!(!is_fetchable(&Url::parse("mailto:someone@example.com").unwrap()));
        assert!(!is_fetchable(&Url::parse("data:text/plain,hi").unwrap()));
        assert!(is_fetchable(&Url::parse("http://example.com/x.pdf").unwrap()));
    }
}
