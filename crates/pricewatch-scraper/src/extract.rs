//! Record extraction from a single product tile.
//!
//! Extraction never fails: missing pieces degrade to empty fields and the
//! caller decides usability via [`ProductRecord::is_valid`].

use std::str::FromStr;
use std::sync::LazyLock;

use pricewatch_core::{ProductRecord, StockStatus};
use regex::Regex;
use reqwest::Url;
use rust_decimal::Decimal;

use crate::dom::{
    absolutize, compact_text, flattened_text, META_PRICE_PROP, PRICE_PROP, PRICE_RE, PRODUCT_LINK,
};
use crate::tiles::Tile;

static SKU_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSKU:\s*([0-9]+)\b").expect("valid regex"));

/// First number in a price string, thousands separators allowed.
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9][0-9,]*(?:\.[0-9]{1,2})?)").expect("valid regex"));

/// Status phrases reported verbatim as `availability_raw`, first hit wins.
const AVAILABILITY_HINTS: [&str; 10] = [
    "Usually ships",
    "In stock",
    "SOLD OUT",
    "Sold Out",
    "Out of Stock",
    "In-Store Only",
    "Buy In Store",
    "Pickup Today",
    "In-Store Pickup",
    "Pickup Only",
];

const STORE_ONLY_PHRASES: [&str; 6] = [
    "buy in store",
    "in-store only",
    "in store only",
    "pickup today",
    "in-store pickup",
    "pickup only",
];
const SOLD_OUT_PHRASES: [&str; 2] = ["sold out", "out of stock"];
const IN_STOCK_PHRASES: [&str; 2] = ["usually ships", "in stock"];

/// Builds a best-effort record from one tile.
///
/// `base` is the resolved page URL used to absolutize product links.
#[must_use]
pub fn extract_record(tile: &Tile<'_>, base: Option<&Url>) -> ProductRecord {
    let element = tile.element();
    let text = flattened_text(&element);

    let sku = SKU_RE
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    // Longest link text names the product; ties keep the first link.
    let mut best: Option<(String, &str)> = None;
    for anchor in element.select(&PRODUCT_LINK) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let label = flattened_text(&anchor);
        let longer = best
            .as_ref()
            .is_none_or(|(name, _)| label.chars().count() > name.chars().count());
        if longer {
            best = Some((label, href));
        }
    }
    let (name, url) = best.map_or_else(
        || (String::new(), String::new()),
        |(name, href)| (name, absolutize(base, href)),
    );

    let price = element
        .select(&PRICE_PROP)
        .next()
        .map(|node| normalize_price(&compact_text(&node)))
        .filter(|p| !p.is_empty())
        .or_else(|| {
            element
                .select(&META_PRICE_PROP)
                .next()
                .and_then(|meta| meta.value().attr("content"))
                .map(normalize_price)
                .filter(|p| !p.is_empty())
        })
        .or_else(|| {
            PRICE_RE
                .captures(&text)
                .and_then(|c| c.get(1))
                .map(|m| normalize_price(m.as_str()))
        })
        .unwrap_or_default();

    let (availability_raw, stock) = classify_availability(&text);

    ProductRecord {
        sku,
        name,
        price,
        availability_raw,
        stock,
        url,
    }
}

/// Normalizes the first number in `raw` to `"$d.dd"`, or `""` if none.
///
/// Idempotent: `normalize_price("$12.34") == "$12.34"`.
#[must_use]
pub fn normalize_price(raw: &str) -> String {
    AMOUNT_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| format_amount(m.as_str()))
        .unwrap_or_default()
}

/// Formats a bare amount (`"1,299.5"`, `"79.99"`, `"8e1"`) as `"$d.dd"`.
/// Negative amounts are not prices.
pub(crate) fn format_amount(amount: &str) -> Option<String> {
    let cleaned = amount.trim().replace(',', "");
    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    Some(format!("${:.2}", value.abs().round_dp(2)))
}

/// Classifies tile text into a raw status phrase and a normalized stock
/// status.
///
/// Precedence: store-only phrases, then sold-out, then in-stock. The raw
/// phrase is the first literal from the hint list found in the text and is
/// independent of the stock class.
#[must_use]
pub fn classify_availability(text: &str) -> (String, StockStatus) {
    let lowered = text.to_lowercase();

    let availability_raw = AVAILABILITY_HINTS
        .iter()
        .find(|hint| lowered.contains(&hint.to_lowercase()))
        .map(|hint| (*hint).to_string())
        .unwrap_or_default();

    let has_any = |phrases: &[&str]| phrases.iter().any(|p| lowered.contains(p));
    let stock = if has_any(&STORE_ONLY_PHRASES) {
        StockStatus::BuyInStore
    } else if has_any(&SOLD_OUT_PHRASES) {
        StockStatus::OutOfStock
    } else if has_any(&IN_STOCK_PHRASES) {
        StockStatus::InStock
    } else {
        StockStatus::Unknown
    };

    (availability_raw, stock)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
