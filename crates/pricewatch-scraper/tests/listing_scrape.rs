//! End-to-end tests for `scrape` against a local `wiremock` storefront.
//!
//! Every test builds its own session pointed at the mock server with all
//! courtesy delays set to zero.

use std::time::Duration;

use pricewatch_core::{ScraperConfig, StockStatus};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch_scraper::{scrape, FetchSession, ScrapeOptions, ScraperError};

const LISTING_PATH: &str = "/search/search_results.aspx";

fn test_config(origin: &str) -> ScraperConfig {
    ScraperConfig {
        site_origin: origin.to_string(),
        request_timeout_secs: 5,
        warmup_timeout_secs: 5,
        strategy_delay_ms: 0,
        warmup_pause_ms: 0,
        throttle: Duration::ZERO,
        ..ScraperConfig::default()
    }
}

fn test_session(server: &MockServer) -> FetchSession {
    FetchSession::new(&test_config(&server.uri())).expect("failed to build test FetchSession")
}

fn options(follow_pages: bool) -> ScrapeOptions {
    ScrapeOptions {
        follow_pages,
        throttle: Duration::ZERO,
        cache_dir: None,
        cache_tiles: false,
    }
}

fn listing_url(server: &MockServer) -> String {
    format!(
        "{}{LISTING_PATH}?fq=brand:Raspberry+Pi&rpp=96&myStore=false",
        server.uri()
    )
}

fn tile(sku: &str, name: &str, price: &str, status: &str) -> String {
    format!(
        r#"<li class="product_wrapper">
             <a href="/product/{sku}/item">{name}</a>
             <span class="price">{price}</span>
             <p class="sku">SKU: {sku}</p>
             <span class="stock">{status}</span>
           </li>"#
    )
}

fn listing_html(tiles: &[String], extra: &str) -> String {
    format!(
        "<html><body><ul>{}</ul>{extra}</body></html>",
        tiles.concat()
    )
}

/// Serves `body` for every listing request without a `page` parameter.
async fn mount_listing(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("rpp", "96"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .with_priority(5)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page))
        .respond_with(response)
        .with_priority(1)
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Single-page extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scrape_extracts_single_tile_record() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        listing_html(
            &[tile("999001", "Raspberry Pi 4 4GB Board", "$54.99", "In stock")],
            "",
        ),
    )
    .await;

    let mut session = test_session(&server);
    let records = scrape(&mut session, &listing_url(&server), &options(false))
        .await
        .expect("scrape should succeed");

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.sku, "999001");
    assert_eq!(record.name, "Raspberry Pi 4 4GB Board");
    assert_eq!(record.price, "$54.99");
    assert_eq!(record.availability_raw, "In stock");
    assert_eq!(record.stock, StockStatus::InStock);
    assert_eq!(record.url, format!("{}/product/999001/item", server.uri()));
}

#[tokio::test]
async fn scrape_uses_structured_data_when_no_tiles_match() {
    let server = MockServer::start().await;
    let html = r#"<html><head><script type="application/ld+json">
        {"@context":"https://schema.org","@type":"ItemList","itemListElement":[
          {"@type":"ListItem","position":1,"item":{
            "@type":"Product","name":"Raspberry Pi Camera Module 3","sku":"777123",
            "url":"/product/777123/camera",
            "offers":{"@type":"Offer","price":79.99,
                      "availability":"https://schema.org/OutOfStock"}}}
        ]}
        </script></head><body><div class="empty">Nothing rendered</div></body></html>"#;
    mount_listing(&server, html.to_string()).await;

    let mut session = test_session(&server);
    let records = scrape(&mut session, &listing_url(&server), &options(false))
        .await
        .expect("scrape should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sku, "777123");
    assert_eq!(records[0].price, "$79.99");
    assert_eq!(records[0].availability_raw, "Outofstock");
    assert_eq!(records[0].stock, StockStatus::OutOfStock);
}

#[tokio::test]
async fn scrape_returns_empty_vec_when_page_has_no_products() {
    let server = MockServer::start().await;
    mount_listing(&server, listing_html(&[], "<p>No results</p>")).await;

    let mut session = test_session(&server);
    let records = scrape(&mut session, &listing_url(&server), &options(false))
        .await
        .expect("empty listing is not an error");

    assert!(records.is_empty());
}

// ---------------------------------------------------------------------------
// Fetch strategies and warm-up
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scrape_recovers_from_403_with_navigation_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(header("sec-fetch-mode", "navigate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(
            &[tile("555010", "Pi Pico W", "$6.00", "In stock")],
            "",
        )))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("Access Denied"))
        .with_priority(5)
        .mount(&server)
        .await;

    let mut session = test_session(&server);
    let records = scrape(&mut session, &listing_url(&server), &options(false))
        .await
        .expect("navigation strategy should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sku, "555010");
}

#[tokio::test]
async fn scrape_reports_last_failure_when_every_strategy_fails() {
    let server = MockServer::start().await;
    let body = format!("Access Denied\n{}", "z".repeat(1000));
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("rpp", "96"))
        .respond_with(ResponseTemplate::new(403).set_body_string(body))
        .expect(4)
        .mount(&server)
        .await;

    let mut session = test_session(&server);
    let err = scrape(&mut session, &listing_url(&server), &options(false))
        .await
        .expect_err("all strategies should fail");

    match err {
        ScraperError::Fetch {
            status, message, ..
        } => {
            assert_eq!(status, Some(403));
            assert!(message.starts_with("Access Denied z"), "got: {message}");
            assert_eq!(message.chars().count(), 300);
        }
        other => panic!("expected ScraperError::Fetch, got: {other:?}"),
    }
}

#[tokio::test]
async fn session_warms_up_only_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(
        &server,
        listing_html(&[tile("1", "Pi Zero 2 W", "$15.00", "")], ""),
    )
    .await;

    let mut session = test_session(&server);
    assert!(!session.is_warm());
    let url = listing_url(&server);
    scrape(&mut session, &url, &options(false)).await.unwrap();
    assert!(session.is_warm());
    scrape(&mut session, &url, &options(false)).await.unwrap();
}

#[tokio::test]
async fn warm_up_failure_does_not_abort_fetch() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        listing_html(&[tile("2", "Pi 400 Kit", "$100.00", "Sold out")], ""),
    )
    .await;

    // Warm-up targets an origin nothing listens on.
    let mut session = FetchSession::new(&test_config("http://127.0.0.1:9"))
        .expect("failed to build test FetchSession");
    let records = scrape(&mut session, &listing_url(&server), &options(false))
        .await
        .expect("warm-up failure should be swallowed");

    assert!(!session.is_warm());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stock, StockStatus::OutOfStock);
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

fn pagination_links() -> String {
    format!(
        r#"<div class="pages"><a href="{LISTING_PATH}?fq=brand:Raspberry+Pi&rpp=96&myStore=false&page=2">2</a></div>"#
    )
}

#[tokio::test]
async fn scrape_ignores_pagination_when_not_following_pages() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        listing_html(
            &[tile("10", "Pi 5 8GB", "$80.00", "In stock")],
            &pagination_links(),
        ),
    )
    .await;
    mount_page(
        &server,
        "2",
        ResponseTemplate::new(200).set_body_string(listing_html(
            &[tile("20", "Pi 5 Case", "$10.00", "In stock")],
            "",
        )),
    )
    .await;

    let mut session = test_session(&server);
    let records = scrape(&mut session, &listing_url(&server), &options(false))
        .await
        .unwrap();

    let skus: Vec<_> = records.iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(skus, vec!["10"]);
}

#[tokio::test]
async fn scrape_follows_pages_and_dedupes_by_sku() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        listing_html(
            &[
                tile("10", "Pi 5 8GB", "$80.00", "In stock"),
                tile("11", "Pi 5 4GB", "$60.00", "In stock"),
            ],
            &pagination_links(),
        ),
    )
    .await;
    mount_page(
        &server,
        "2",
        ResponseTemplate::new(200).set_body_string(listing_html(
            &[
                tile("11", "Pi 5 4GB (repeat)", "$60.00", "In stock"),
                tile("20", "Pi 5 Case", "$10.00", "In-store pickup"),
            ],
            "",
        )),
    )
    .await;

    let mut session = test_session(&server);
    let records = scrape(&mut session, &listing_url(&server), &options(true))
        .await
        .unwrap();

    let skus: Vec<_> = records.iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(skus, vec!["10", "11", "20"]);
    assert_eq!(records[1].name, "Pi 5 4GB");
    assert_eq!(records[2].stock, StockStatus::BuyInStore);
}

#[tokio::test]
async fn scrape_aborts_when_a_later_page_fails() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        listing_html(
            &[tile("10", "Pi 5 8GB", "$80.00", "In stock")],
            &pagination_links(),
        ),
    )
    .await;
    mount_page(
        &server,
        "2",
        ResponseTemplate::new(500).set_body_string("upstream error"),
    )
    .await;

    let mut session = test_session(&server);
    let err = scrape(&mut session, &listing_url(&server), &options(true))
        .await
        .expect_err("page 2 failure should abort");

    assert!(
        matches!(err, ScraperError::Fetch { status: Some(500), .. }),
        "got: {err:?}"
    );
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

fn cache_fixture() -> String {
    listing_html(
        &[
            tile("31", "Sense HAT", "$39.95", "In stock"),
            tile("32", "Camera Module 3", "$25.00", "Out of stock"),
        ],
        "",
    )
}

#[tokio::test]
async fn cache_writes_listing_and_tile_files() {
    let server = MockServer::start().await;
    mount_listing(&server, cache_fixture()).await;
    let dir = tempfile::tempdir().unwrap();

    let mut session = test_session(&server);
    let opts = ScrapeOptions {
        cache_dir: Some(dir.path().join("cache")),
        cache_tiles: true,
        ..options(false)
    };
    scrape(&mut session, &listing_url(&server), &opts)
        .await
        .unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path().join("cache"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 3, "got: {names:?}");
    assert_eq!(names.iter().filter(|n| n.contains("__listing__")).count(), 1);
    assert_eq!(names.iter().filter(|n| n.contains("__tile__")).count(), 2);
    assert!(names.iter().all(|n| n.ends_with(".html")));
}

#[tokio::test]
async fn cache_failures_do_not_change_records() {
    let server = MockServer::start().await;
    mount_listing(&server, cache_fixture()).await;
    let url = listing_url(&server);
    let dir = tempfile::tempdir().unwrap();

    // A regular file where the cache directory should be.
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "not a directory").unwrap();

    let mut session = test_session(&server);
    let uncached = scrape(&mut session, &url, &options(false)).await.unwrap();

    let cached_ok = scrape(
        &mut session,
        &url,
        &ScrapeOptions {
            cache_dir: Some(dir.path().join("ok")),
            cache_tiles: true,
            ..options(false)
        },
    )
    .await
    .unwrap();

    let cached_broken = scrape(
        &mut session,
        &url,
        &ScrapeOptions {
            cache_dir: Some(blocked.join("nested")),
            cache_tiles: true,
            ..options(false)
        },
    )
    .await
    .unwrap();

    assert_eq!(uncached.len(), 2);
    assert_eq!(uncached, cached_ok);
    assert_eq!(uncached, cached_broken);
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scrape_rejects_unparseable_url() {
    let server = MockServer::start().await;
    let mut session = test_session(&server);

    let err = scrape(&mut session, "not a url", &options(false))
        .await
        .expect_err("relative URL should be rejected");

    assert!(matches!(err, ScraperError::InvalidUrl { .. }), "got: {err:?}");
    assert!(!session.is_warm());
}
