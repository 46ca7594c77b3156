//! Structured-data fallback: schema.org `ItemList` extraction.
//!
//! Used for pages whose markup yields no usable tiles but which embed an
//! `<script type="application/ld+json">` item list of `Product` entries.

use std::sync::LazyLock;

use pricewatch_core::{ProductRecord, StockStatus};
use reqwest::Url;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::dom::absolutize;
use crate::extract::format_amount;

static LD_JSON_SCRIPT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// Extracts one record per `Product` entry of every JSON-LD `ItemList`.
///
/// Blocks that are not valid JSON are skipped; the remaining blocks are
/// still parsed.
#[must_use]
pub fn extract_structured(document: &Html, base: Option<&Url>) -> Vec<ProductRecord> {
    let mut records = Vec::new();

    for (block, script) in document.select(&LD_JSON_SCRIPT).enumerate() {
        let payload: String = script.text().collect();
        let value: Value = match serde_json::from_str(payload.trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(block, error = %e, "skipping malformed ld+json block");
                continue;
            }
        };

        for candidate in candidates(&value) {
            if !has_type(candidate, "ItemList") {
                continue;
            }
            let Some(entries) = candidate.get("itemListElement").and_then(Value::as_array) else {
                continue;
            };
            for entry in entries {
                if let Some(item) = entry.get("item").filter(|i| has_type(i, "Product")) {
                    records.push(product_record(item, base));
                }
            }
        }
    }

    records
}

/// Top-level object plus its `@graph` / `itemListElement` members, or the
/// objects of a top-level array.
fn candidates(value: &Value) -> Vec<&Value> {
    match value {
        Value::Object(map) => {
            let mut out = vec![value];
            for key in ["@graph", "itemListElement"] {
                if let Some(items) = map.get(key).and_then(Value::as_array) {
                    out.extend(items.iter().filter(|v| v.is_object()));
                }
            }
            out
        }
        Value::Array(items) => items.iter().filter(|v| v.is_object()).collect(),
        _ => Vec::new(),
    }
}

/// `@type` may be a plain string or an array of strings.
fn has_type(item: &Value, wanted: &str) -> bool {
    match item.get("@type") {
        Some(Value::String(s)) => s == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn product_record(item: &Value, base: Option<&Url>) -> ProductRecord {
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    let name = text("name");
    let url = match text("url") {
        href if href.is_empty() => href,
        href => absolutize(base, &href),
    };
    let sku = match item.get("sku") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    // `offers` is usually one object; take the first when it is a list.
    let offer = match item.get("offers") {
        Some(Value::Array(list)) => list.iter().find(|o| o.is_object()),
        Some(o @ Value::Object(_)) => Some(o),
        _ => None,
    };

    let price = offer.map(offer_price).unwrap_or_default();
    let (availability_raw, stock) = offer
        .and_then(|o| o.get("availability"))
        .and_then(Value::as_str)
        .map(classify_schema_availability)
        .unwrap_or_default();

    ProductRecord {
        sku,
        name,
        price,
        availability_raw,
        stock,
        url,
    }
}

/// `offers.price`, else `offers.priceSpecification.price`; two decimals
/// when numeric, otherwise passed through.
fn offer_price(offer: &Value) -> String {
    let raw = offer
        .get("price")
        .filter(|p| is_present(p))
        .or_else(|| {
            offer
                .get("priceSpecification")
                .and_then(|spec| spec.get("price"))
                .filter(|p| is_present(p))
        });

    match raw {
        Some(Value::Number(n)) => {
            let s = n.to_string();
            format_amount(&s).unwrap_or(s)
        }
        Some(Value::String(s)) => format_amount(s).unwrap_or_else(|| s.clone()),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Null, blank, zero, negative and boolean prices count as missing.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) => false,
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && !s.starts_with('-')
        }
        Value::Number(n) => n.as_f64().is_some_and(|f| f > 0.0),
        _ => true,
    }
}

/// Maps `https://schema.org/OutOfStock` to `("Outofstock", OutOfStock)`.
///
/// The raw phrase is the last URI segment with hyphens turned into spaces
/// and each word capitalized.
fn classify_schema_availability(uri: &str) -> (String, StockStatus) {
    let segment = uri.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() {
        return (String::new(), StockStatus::Unknown);
    }

    let lowered = segment.to_lowercase();
    let stock = if lowered.contains("outofstock") || lowered.contains("out of stock") {
        StockStatus::OutOfStock
    } else if lowered.contains("instock") || lowered.contains("in stock") {
        StockStatus::InStock
    } else {
        StockStatus::Unknown
    };

    (title_case(&segment.replace('-', " ")), stock)
}

/// Upper-cases the first letter of each alphabetic run and lower-cases the
/// rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}
