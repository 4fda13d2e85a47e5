//! Link discovery: turn a page's HTML into the set of file URLs to fetch.
//!
//! # Sources considered
//!
//! - `<a href>` anchors, resolved against the page URL (or `<base href>`)
//! - `<img>` elements, preferring lazy-loading `data-src` over `src`
//! - absolute `http(s)://` URLs written verbatim in text, scripts or
//!   attribute values, after character references are decoded
//!
//! Every candidate goes through the same test: its final path segment must
//! carry the requested extension, compared case-insensitively. The result is
//! a [`BTreeSet`], so duplicates collapse and iteration order is stable.
//!
//! # Example
//!
//! ```
//! use webdl_core::extract::{FileType, extract_links};
//! use url::Url;
//!
//! let base = Url::parse("https://example.com/docs/").unwrap();
//! let html = r#"<a href="a.pdf">A</a><a href="/b.PDF">B</a><a href="c.txt">C</a>"#;
//! let file_type: FileType = "pdf".parse().unwrap();
//! let links = extract_links(html, &base, &file_type).unwrap();
//! assert_eq!(links.len(), 2);
//! ```

mod error;
mod scan;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use scraper::{Html, Node, Selector};
use tracing::{debug, instrument, trace};
use url::Url;

pub use self::error::{ExtractionError, MAX_URL_LENGTH};
pub use self::scan::parse_page_url;
use self::scan::{is_fetchable, normalize, scan_absolute_urls};

#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

#[allow(clippy::expect_used)]
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector is valid"));

#[allow(clippy::expect_used)]
static BASE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("base selector is valid"));

/// A validated file extension, stored lowercase without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileType(String);

impl FileType {
    /// Parses a user-supplied extension such as `pdf`, `PDF` or `.pdf`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::InvalidFileType`] when the value is empty
    /// or contains anything but ASCII letters and digits.
    pub fn parse(raw: &str) -> Result<Self, ExtractionError> {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if bare.is_empty() {
            return Err(ExtractionError::invalid_file_type(raw, "must not be empty"));
        }
        if !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ExtractionError::invalid_file_type(
                raw,
                "must contain only ASCII letters and digits",
            ));
        }
        Ok(Self(bare.to_ascii_lowercase()))
    }

    /// Returns the lowercase extension without a dot.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the URL's final path segment has this extension.
    ///
    /// Dotfiles such as `/.pdf` have no extension and never match.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        let Some(last) = url.path_segments().and_then(|mut s| s.next_back()) else {
            return false;
        };
        match last.rsplit_once('.') {
            Some((stem, ext)) => !stem.is_empty() && ext.eq_ignore_ascii_case(&self.0),
            None => false,
        }
    }
}

impl FromStr for FileType {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the absolute URLs of every `file_type` file linked from `html`.
///
/// Malformed or missing attributes are skipped silently. Only http/https
/// results are kept and fragments are removed before deduplication.
///
/// # Errors
///
/// Returns [`ExtractionError::CannotBeABase`] if `base` cannot resolve
/// relative links (e.g. a `data:` URL).
#[instrument(skip(html), fields(html_len = html.len(), base = %base, file_type = %file_type))]
pub fn extract_links(
    html: &str,
    base: &Url,
    file_type: &FileType,
) -> Result<BTreeSet<Url>, ExtractionError> {
    if base.cannot_be_a_base() {
        return Err(ExtractionError::CannotBeABase {
            url: base.to_string(),
        });
    }

    let document = Html::parse_document(html);
    let base = document_base(&document, base);

    let anchors = document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|el| el.value().attr("href"));
    let images = document.select(&IMG_SELECTOR).filter_map(|el| {
        let attrs = el.value();
        attrs
            .attr("data-src")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| attrs.attr("src"))
    });

    let mut links = BTreeSet::new();
    for href in anchors.chain(images) {
        let href = href.trim();
        if href.is_empty() {
            continue;
        }
        match base.join(href) {
            Ok(resolved) => keep_if_matching(&mut links, resolved, file_type),
            Err(e) => trace!(href, error = %e, "skipping unresolvable link"),
        }
    }

    for text in verbatim_sources(&document) {
        for found in scan_absolute_urls(text) {
            keep_if_matching(&mut links, found, file_type);
        }
    }

    debug!(count = links.len(), "extracted links");
    Ok(links)
}

fn keep_if_matching(links: &mut BTreeSet<Url>, url: Url, file_type: &FileType) {
    if is_fetchable(&url) && file_type.matches(&url) {
        links.insert(normalize(url));
    }
}

/// Decoded text nodes and attribute values, so character references such
/// as `&amp;` never reach the URL scanner.
fn verbatim_sources(document: &Html) -> Vec<&str> {
    let mut sources = Vec::new();
    for node in document.tree.nodes() {
        match node.value() {
            Node::Text(text) => sources.push(&**text),
            Node::Element(element) => sources.extend(element.attrs().map(|(_, value)| value)),
            _ => {}
        }
    }
    sources
}

/// Honors a `<base href>` element when it resolves against the page URL.
fn document_base(document: &Html, page_url: &Url) -> Url {
    document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| !url.cannot_be_a_base())
        .unwrap_or_else(|| page_url.clone())
}
