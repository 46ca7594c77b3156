//! Shared selectors and text helpers over parsed listing documents.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Selector};

/// Anchors pointing at a product detail page.
pub(crate) static PRODUCT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/product/"]"#).expect("valid selector"));

pub(crate) static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

pub(crate) static PRICE_PROP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="price"]"#).expect("valid selector"));

pub(crate) static META_PRICE_PROP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[itemprop="price"]"#).expect("valid selector"));

pub(crate) static CLASSED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[class]").expect("valid selector"));

/// A dollar amount as it appears in tile text, e.g. `$1,299.99` or `$54.9`.
pub(crate) static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)").expect("valid regex")
});

/// Text nodes trimmed and joined with single spaces, skipping blanks.
pub(crate) fn flattened_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text nodes trimmed and concatenated with no separator.
pub(crate) fn compact_text(element: &ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Resolves `href` against the page URL unless it is already absolute.
pub(crate) fn absolutize(base: Option<&Url>, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    base.and_then(|b| b.join(href).ok())
        .map_or_else(|| href.to_string(), |u| u.to_string())
}
