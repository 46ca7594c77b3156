//! Tile location: finding the document subtrees that each hold one product.
//!
//! Two layers, first success wins:
//! 1. known product-container selectors, filtered to tiles that carry a
//!    product link plus price or SKU evidence;
//! 2. an ancestor walk upward from every product link to the nearest
//!    wrapper-looking element.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::dom::{flattened_text, CLASSED, PRICE_PROP, PRICE_RE, PRODUCT_LINK};

/// Container selectors seen across supported markup versions of the listing.
const TILE_SELECTORS: [&str; 9] = [
    "li.product_wrapper",
    "li.product-wrap",
    "li.Product_wrapper",
    "article.product_wrapper",
    "div.product_wrapper",
    "div.product-tile",
    "div.product_tile",
    "div.product-grid__item",
    "div.productGridItem",
];

/// Class-name fragments that mark an element as a product wrapper.
const PRODUCT_CLASS_HINTS: [&str; 5] = ["product", "result", "search-item", "listing", "tile"];

/// Ancestors examined above a product link before giving up.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

static TILE_SELECTOR_LIST: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    TILE_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static SKU_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsku\b").expect("valid regex"));

/// One region of a listing document believed to describe a single product.
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    element: ElementRef<'a>,
}

impl<'a> Tile<'a> {
    #[must_use]
    pub fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    #[must_use]
    pub fn element(&self) -> ElementRef<'a> {
        self.element
    }

    /// Outer HTML of the tile, used for the tile cache.
    #[must_use]
    pub fn html(&self) -> String {
        self.element.html()
    }
}

/// Minimal view of a tree node needed by the ancestor walk.
///
/// Implemented for [`scraper::ElementRef`]; tests implement it for small
/// synthetic trees.
pub trait TreeNode: Sized {
    /// Lower-case element name, e.g. `"li"`.
    fn tag_name(&self) -> &str;
    /// Space-separated class attribute, possibly empty.
    fn class_list(&self) -> String;
    /// Nearest ancestor that is an element.
    fn parent_element(&self) -> Option<Self>;
    /// Whether the subtree carries a price element or dollar amount.
    fn has_price_evidence(&self) -> bool;
}

impl TreeNode for ElementRef<'_> {
    fn tag_name(&self) -> &str {
        self.value().name()
    }

    fn class_list(&self) -> String {
        self.value().classes().collect::<Vec<_>>().join(" ")
    }

    fn parent_element(&self) -> Option<Self> {
        self.parent().and_then(ElementRef::wrap)
    }

    fn has_price_evidence(&self) -> bool {
        self.select(&PRICE_PROP).next().is_some() || PRICE_RE.is_match(&flattened_text(self))
    }
}

/// Returns the product tiles of `document` in document order.
///
/// An empty vector means no strategy found a qualifying tile.
#[must_use]
pub fn locate_tiles(document: &Html) -> Vec<Tile<'_>> {
    let tiles = tiles_by_selector(document);
    if !tiles.is_empty() {
        return tiles;
    }
    tiles_by_anchor_walk(document)
}

/// Primary strategy: probe the known container selectors in order.
fn tiles_by_selector(document: &Html) -> Vec<Tile<'_>> {
    let mut seen = HashSet::new();
    let mut tiles = Vec::new();

    for selector in TILE_SELECTOR_LIST.iter() {
        for element in document.select(selector) {
            if seen.contains(&element.id()) || !qualifies_as_tile(&element) {
                continue;
            }
            seen.insert(element.id());
            tiles.push(Tile::new(element));
        }
    }

    sort_document_order(document, &mut tiles);
    tiles
}

/// Secondary strategy: climb from each product link to its wrapper.
fn tiles_by_anchor_walk(document: &Html) -> Vec<Tile<'_>> {
    let mut seen = HashSet::new();
    let mut tiles = Vec::new();

    for anchor in document.select(&PRODUCT_LINK) {
        let Some(wrapper) = wrapper_for_anchor(&anchor) else {
            continue;
        };
        if seen.insert(wrapper.id()) {
            tiles.push(Tile::new(wrapper));
        }
    }

    sort_document_order(document, &mut tiles);
    tiles
}

/// A selector match counts as a tile only when it links to a product page
/// and shows either price or SKU evidence.
fn qualifies_as_tile(element: &ElementRef<'_>) -> bool {
    if element.select(&PRODUCT_LINK).next().is_none() {
        return false;
    }
    let text = flattened_text(element);
    let has_price = element.select(&PRICE_PROP).next().is_some() || PRICE_RE.is_match(&text);
    has_price || has_sku_marker(element, &text)
}

fn has_sku_marker(element: &ElementRef<'_>, text: &str) -> bool {
    text.to_lowercase().contains("sku:")
        || element
            .select(&CLASSED)
            .any(|el| SKU_CLASS_RE.is_match(&el.class_list()))
}

fn has_product_hint(classes: &str) -> bool {
    let lowered = classes.to_lowercase();
    PRODUCT_CLASS_HINTS.iter().any(|hint| lowered.contains(hint))
}

/// Walks up from `anchor` looking for the element that wraps one product.
///
/// A hinted `li`/`article` wins immediately. The first hinted `div`/`section`
/// holding price evidence is kept as a fallback, returned when the walk hits
/// a list boundary (`ul`/`ol`), the depth limit, or `html`/`body`.
pub fn wrapper_for_anchor<N: TreeNode>(anchor: &N) -> Option<N> {
    let mut best: Option<N> = None;
    let mut current = anchor.parent_element();

    for _ in 0..MAX_ANCESTOR_DEPTH {
        let Some(node) = current.take() else {
            break;
        };
        let tag = node.tag_name().to_ascii_lowercase();
        if tag == "html" || tag == "body" {
            break;
        }
        let hinted = has_product_hint(&node.class_list());
        let parent = node.parent_element();

        match tag.as_str() {
            "li" | "article" if hinted => return Some(node),
            "div" | "section" if hinted && best.is_none() && node.has_price_evidence() => {
                best = Some(node);
            }
            "ul" | "ol" => return best,
            _ => {}
        }

        current = parent;
    }

    best
}

/// Restores document order after per-selector accumulation.
fn sort_document_order<'a>(document: &'a Html, tiles: &mut [Tile<'a>]) {
    if tiles.len() < 2 {
        return;
    }
    let order: HashMap<_, usize> = document
        .tree
        .root()
        .descendants()
        .enumerate()
        .map(|(idx, node)| (node.id(), idx))
        .collect();
    tiles.sort_by_key(|tile| order.get(&tile.element.id()).copied().unwrap_or(usize::MAX));
}

#[cfg(test)]
#[path = "tiles_test.rs"]
mod tests;
