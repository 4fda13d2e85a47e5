//! Filename derivation, sanitization, and deterministic name assignment.
//!
//! Every discovered URL maps to exactly one local basename. The mapping is a
//! pure function of the sorted URL set, so two runs over the same page pick
//! the same names and the existence filter can recognise earlier downloads.

use std::collections::{BTreeSet, HashSet};
use std::path::{Component, Path};

use tracing::debug;
use url::Url;

use super::constants::MAX_FILENAME_BYTES;

/// Derives the local basename for `url`: the last path segment,
/// percent-decoded and sanitized.
///
/// Returns `None` when the segment is empty (e.g. `https://host/dir/`).
#[must_use]
pub fn derive_filename(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }

    // Invalid UTF-8 after decoding keeps the raw segment.
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(truncate_to_limit(&sanitize_filename(trimmed)))
}

/// Assigns a unique basename to every URL, walking them in sorted order.
///
/// - URLs whose derived name is empty get `download_<n>.<ext>`, `n`
///   counting from 1 in sorted URL order.
/// - When a name is already taken, the later URL gets `<stem>_2.<ext>`,
///   then `<stem>_3.<ext>`, and so on.
#[must_use]
pub fn assign_filenames(urls: &BTreeSet<Url>, extension: &str) -> Vec<(Url, String)> {
    let mut used: HashSet<String> = HashSet::with_capacity(urls.len());
    let mut unnamed = 0usize;
    let mut assigned = Vec::with_capacity(urls.len());

    for url in urls {
        let candidate = derive_filename(url).unwrap_or_else(|| {
            unnamed += 1;
            format!("download_{unnamed}.{extension}")
        });
        let name = unique_name(&candidate, &used);
        if name != candidate {
            debug!(url = %url, derived = %candidate, assigned = %name, "filename collision");
        }
        used.insert(name.clone());
        assigned.push((url.clone(), name));
    }

    assigned
}

/// Returns `filename` if unused, else the first free `<stem>_<n><ext>` from 2.
fn unique_name(filename: &str, used: &HashSet<String>) -> String {
    if !used.contains(filename) {
        return filename.to_string();
    }

    let (stem, ext) = split_extension(filename);
    (2usize..)
        .map(|i| format!("{stem}_{i}{ext}"))
        .find(|name| !used.contains(name))
        .unwrap_or_else(|| filename.to_string())
}

/// Splits `report.pdf` into (`report`, `.pdf`). Dotfiles have no extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Shortens the stem so the name (plus the `.part` wrapper) fits common
/// filesystem limits, keeping the extension and UTF-8 boundaries intact.
fn truncate_to_limit(filename: &str) -> String {
    if filename.len() <= MAX_FILENAME_BYTES {
        return filename.to_string();
    }

    let (stem, ext) = split_extension(filename);
    let budget = MAX_FILENAME_BYTES.saturating_sub(ext.len());
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{ext}", &stem[..cut])
}
