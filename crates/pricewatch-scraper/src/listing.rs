//! Listing scrape orchestration: first page, optional pagination, per-page
//! extraction with structured-data fallback, then SKU dedup.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use pricewatch_core::{dedupe_by_sku, ProductRecord};
use reqwest::Url;
use scraper::Html;

use crate::cache::CacheWriter;
use crate::dom::{absolutize, flattened_text, ANCHOR};
use crate::error::ScraperError;
use crate::extract::extract_record;
use crate::fetch::{FetchSession, ListingPage};
use crate::jsonld::extract_structured;
use crate::tiles::locate_tiles;

const LISTING_PATH: &str = "/search/search_results.aspx";

/// Per-call knobs for [`scrape`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOptions {
    /// Follow pagination links found on the first page.
    pub follow_pages: bool,
    /// Pause after each processed page.
    pub throttle: Duration,
    /// Root directory for cached HTML; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Also cache the HTML of each accepted product tile.
    pub cache_tiles: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            follow_pages: false,
            throttle: Duration::from_millis(800),
            cache_dir: None,
            cache_tiles: false,
        }
    }
}

/// Scrapes every product record reachable from the listing at `url`.
///
/// Pages are fetched one at a time with `options.throttle` between them.
/// Records are returned in page order with later duplicates of a non-empty
/// SKU dropped. An empty result is not an error; callers decide how to
/// report it.
///
/// **All-or-nothing semantics**: a fetch failure on any page, first or
/// later, aborts the scrape and discards rows collected so far.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `url` does not parse, or
/// [`ScraperError::Fetch`] if every strategy fails for some page.
pub async fn scrape(
    session: &mut FetchSession,
    url: &str,
    options: &ScrapeOptions,
) -> Result<Vec<ProductRecord>, ScraperError> {
    Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    let cache = options.cache_dir.as_ref().map(|dir| CacheWriter::new(dir.clone()));

    let first = session.fetch(url).await?;
    save_to_cache(cache.as_ref(), "listing", &first.final_url, &first.html);

    let page_urls = if options.follow_pages {
        discover_pages(&first.html, &first.final_url)
    } else {
        vec![first.final_url.clone()]
    };
    tracing::info!(url, pages = page_urls.len(), "listing pages resolved");

    let mut fetched: HashMap<String, ListingPage> =
        HashMap::from([(first.final_url.clone(), first)]);
    let mut visited: HashSet<String> = HashSet::new();
    let mut rows: Vec<ProductRecord> = Vec::new();

    for (idx, page_url) in page_urls.iter().enumerate() {
        if !visited.insert(page_url.clone()) {
            continue;
        }
        let page_number = idx + 1;

        let page = if let Some(page) = fetched.remove(page_url) {
            page
        } else {
            let page = session.fetch(page_url).await.inspect_err(|err| {
                tracing::warn!(
                    url = %page_url,
                    page = page_number,
                    error = %err,
                    "pagination fetch failed; aborting scrape"
                );
            })?;
            save_to_cache(
                cache.as_ref(),
                &format!("listing_p{page_number}"),
                page_url,
                &page.html,
            );
            page
        };

        let tile_cache = if options.cache_tiles {
            cache.as_ref()
        } else {
            None
        };
        rows.extend(extract_page(&page, page_number, tile_cache));

        if !options.throttle.is_zero() {
            tokio::time::sleep(options.throttle).await;
        }
    }

    let total = rows.len();
    let records = dedupe_by_sku(rows);
    tracing::info!(
        url,
        rows = total,
        records = records.len(),
        "listing scrape complete"
    );
    Ok(records)
}

/// Pagination URLs on a listing page, plus `page_url` itself, ordered by
/// `(length, value)`.
#[must_use]
pub fn discover_pages(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let mut pages: HashSet<String> = HashSet::from([page_url.to_owned()]);
    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(LISTING_PATH) {
            continue;
        }
        if href.contains("page=") || flattened_text(&anchor).contains("Page") {
            pages.insert(absolutize(base.as_ref(), href));
        }
    }

    let mut pages: Vec<String> = pages.into_iter().collect();
    pages.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    pages
}

/// Valid records from one page: tile extraction first, JSON-LD when no
/// tile produced a usable record.
fn extract_page(
    page: &ListingPage,
    page_number: usize,
    tile_cache: Option<&CacheWriter>,
) -> Vec<ProductRecord> {
    let document = Html::parse_document(&page.html);
    let base = Url::parse(&page.final_url).ok();

    let tiles = locate_tiles(&document);
    let mut rows = Vec::new();
    for (idx, tile) in tiles.iter().enumerate() {
        let record = extract_record(tile, base.as_ref());
        if !record.is_valid() {
            continue;
        }
        if let Some(cache) = tile_cache {
            let sku = if record.sku.is_empty() {
                "unknown"
            } else {
                record.sku.as_str()
            };
            let key = format!("SKU:{sku}__{}", idx + 1);
            save_to_cache(Some(cache), "tile", &key, &tile.html());
        }
        rows.push(record);
    }

    let used_fallback = rows.is_empty();
    if used_fallback {
        rows = extract_structured(&document, base.as_ref())
            .into_iter()
            .filter(ProductRecord::is_valid)
            .collect();
    }

    tracing::info!(
        url = %page.final_url,
        page = page_number,
        tiles = tiles.len(),
        rows = rows.len(),
        fallback = used_fallback,
        "listing page extracted"
    );
    rows
}

/// Best-effort cache write; failures are logged and ignored.
fn save_to_cache(cache: Option<&CacheWriter>, kind: &str, key: &str, html: &str) {
    let Some(cache) = cache else {
        return;
    };
    match cache.save(kind, key, html) {
        Ok(path) => tracing::info!(kind, path = %path.display(), "cached html"),
        Err(err) => tracing::warn!(kind, error = %err, "cache write failed; continuing"),
    }
}
