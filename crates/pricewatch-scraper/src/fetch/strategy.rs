//! Fetch strategies: the ordered (URL, header profile) attempts for one
//! listing URL.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

pub(crate) const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

const BRAND_FILTER: &str = "fq=brand:";
const MY_STORE_OFF: &str = "myStore=false";

/// Which request headers a strategy sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Desktop browser headers with a search-page referer.
    Primary,
    /// Primary plus `Sec-Fetch-*` headers of a same-origin navigation.
    Navigation,
}

/// One concrete attempt: a URL variant plus a header profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub label: &'static str,
    pub url: String,
    pub profile: HeaderProfile,
}

/// Builds the ordered strategy list for `url`.
///
/// Always the primary and navigation profiles on the URL as given, then a
/// percent-encoded brand filter variant and a variant without the
/// "my store" scoping, when those apply.
#[must_use]
pub fn build_strategies(url: &str) -> Vec<Strategy> {
    let mut strategies = vec![
        Strategy {
            label: "primary",
            url: url.to_string(),
            profile: HeaderProfile::Primary,
        },
        Strategy {
            label: "navigation",
            url: url.to_string(),
            profile: HeaderProfile::Navigation,
        },
    ];

    if let Some(encoded) = percent_encoded_brand_filter(url) {
        strategies.push(Strategy {
            label: "brand-percent-encoded",
            url: encoded,
            profile: HeaderProfile::Navigation,
        });
    }

    if let Some(unscoped) = without_my_store(url) {
        strategies.push(Strategy {
            label: "without-my-store",
            url: unscoped,
            profile: HeaderProfile::Navigation,
        });
    }

    strategies
}

/// Rewrites `fq=brand:Raspberry+Pi` to `fq=brand:Raspberry%20Pi`.
fn percent_encoded_brand_filter(url: &str) -> Option<String> {
    let start = url.find(BRAND_FILTER)? + BRAND_FILTER.len();
    let end = url[start..].find(['&', '#']).map_or(url.len(), |i| start + i);
    let value = &url[start..end];
    if !value.contains('+') {
        return None;
    }
    Some(format!(
        "{}{}{}",
        &url[..start],
        value.replace('+', "%20"),
        &url[end..]
    ))
}

/// Drops the `myStore=false` query pair, keeping everything else verbatim.
fn without_my_store(url: &str) -> Option<String> {
    let (base, rest) = url.split_once('?')?;
    let (query, fragment) = match rest.split_once('#') {
        Some((q, f)) => (q, Some(f)),
        None => (rest, None),
    };

    let pairs: Vec<&str> = query.split('&').collect();
    let kept: Vec<&str> = pairs
        .iter()
        .copied()
        .filter(|pair| !pair.eq_ignore_ascii_case(MY_STORE_OFF))
        .collect();
    if kept.len() == pairs.len() {
        return None;
    }

    let mut out = base.to_string();
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Some(out)
}

/// Request headers for `profile`. `site_origin` feeds the `Referer`.
pub(crate) fn headers_for(profile: HeaderProfile, site_origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    if let Ok(referer) =
        HeaderValue::from_str(&format!("{site_origin}/search/search_results.aspx"))
    {
        headers.insert(REFERER, referer);
    }

    if profile == HeaderProfile::Navigation {
        for (name, value) in [
            ("sec-fetch-site", "same-origin"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-user", "?1"),
            ("sec-fetch-dest", "document"),
        ] {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
    }

    headers
}
