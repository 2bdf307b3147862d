//! Listing-page parsing: anchor names from the root listing, file/dir
//! rows from package directory pages.
//!
//! The root listing is scanned as HTML for anchor `href` values. Package
//! directory pages are IIS-style listings where a file row shows a byte
//! size before the anchor and a directory row shows an escaped `<dir>`
//! marker; those rows are classified with regexes over the raw page text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::trace;
use url::Url;

/// Anchor selector for the root listing scan.
#[allow(clippy::expect_used)]
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector is valid"));

/// File row: a byte size followed by an absolute link.
#[allow(clippy::expect_used)]
static FILE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\d+ <a href="(https?://[^"]+)">"#).expect("file row regex is valid")
});

/// Directory row: an escaped `<dir>` marker followed by an absolute link.
#[allow(clippy::expect_used)]
static DIR_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"&lt;dir&gt;? <a href="(https?://[^"]+)">"#).expect("dir row regex is valid")
});

/// One parsed package directory page.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute URLs of files in this directory.
    pub file_urls: Vec<String>,
    /// Absolute URLs of subdirectories.
    pub dir_urls: Vec<String>,
}

/// Extracts entry names from the root listing HTML.
///
/// Every anchor's `href` is reduced to its last path segment; empty names
/// are dropped. Order follows document order.
#[must_use]
pub fn extract_entry_names(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut names = Vec::new();
    for anchor in document.select(&ANCHOR) {
        if let Some(href) = anchor.value().attr("href") {
            let name = file_name_from_href(href);
            if !name.is_empty() {
                trace!(name = %name, "listing entry");
                names.push(name);
            }
        }
    }
    names
}

/// Returns the last path segment of an href, trimmed.
///
/// Absolute URLs are parsed properly; anything else falls back to a plain
/// separator split.
#[must_use]
pub fn file_name_from_href(href: &str) -> String {
    let last = match Url::parse(href) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(ToString::to_string))
            .unwrap_or_default(),
        Err(_) => href.rsplit('/').next().unwrap_or(href).to_string(),
    };
    last.trim().to_string()
}

/// Classifies a package directory page into file and subdirectory URLs.
#[must_use]
pub fn parse_directory_listing(html: &str) -> ListingPage {
    let file_urls = FILE_ROW
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect();
    let dir_urls = DIR_ROW
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect();
    ListingPage {
        file_urls,
        dir_urls,
    }
}
