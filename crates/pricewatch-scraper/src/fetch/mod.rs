//! Session-aware HTML fetching with ordered fallback strategies.

mod strategy;

use std::time::Duration;

use pricewatch_core::ScraperConfig;
use reqwest::Client;

use crate::error::ScraperError;

pub use strategy::{build_strategies, HeaderProfile, Strategy};

const WARMUP_PATHS: [&str; 3] = [
    "/",
    "/categories",
    "/search/search_results.aspx?storeid=029",
];
const SNIPPET_CHARS: usize = 300;

/// A successfully fetched listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// URL after redirects. Relative links resolve against this.
    pub final_url: String,
    pub html: String,
}

/// A browser-like HTTP session with a persistent cookie jar.
///
/// The first [`FetchSession::fetch`] warms the session up by visiting a few
/// landing pages so the site can set its cookies. Warm-up is attempted again
/// on later fetches until it succeeds once.
pub struct FetchSession {
    client: Client,
    site_origin: String,
    warmup_timeout: Duration,
    strategy_delay: Duration,
    warmup_pause: Duration,
    warm: bool,
}

/// Why one strategy attempt did not produce a page.
struct AttemptFailure {
    status: Option<u16>,
    message: String,
}

impl FetchSession {
    /// Builds a cold session from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ScraperConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(strategy::BROWSER_UA)
            .build()?;
        Ok(Self {
            client,
            site_origin: config.site_origin.trim_end_matches('/').to_string(),
            warmup_timeout: config.warmup_timeout(),
            strategy_delay: config.strategy_delay(),
            warmup_pause: config.warmup_pause(),
            warm: false,
        })
    }

    #[must_use]
    pub fn is_warm(&self) -> bool {
        self.warm
    }

    #[must_use]
    pub fn site_origin(&self) -> &str {
        &self.site_origin
    }

    /// Visits the warm-up pages. Any HTTP status counts as an answer; a
    /// transport error leaves the session cold and is otherwise ignored.
    async fn warm_up(&mut self) {
        let headers = strategy::headers_for(HeaderProfile::Primary, &self.site_origin);
        for path in WARMUP_PATHS {
            let url = format!("{}{path}", self.site_origin);
            let result = self
                .client
                .get(&url)
                .headers(headers.clone())
                .timeout(self.warmup_timeout)
                .send()
                .await;
            match result {
                Ok(response) => {
                    tracing::debug!(url = %url, status = response.status().as_u16(), "warm-up response");
                }
                Err(err) => {
                    tracing::debug!(url = %url, error = %err, "warm-up request failed; session stays cold");
                    return;
                }
            }
        }

        self.warm = true;
        if !self.warmup_pause.is_zero() {
            tokio::time::sleep(self.warmup_pause).await;
        }
    }

    /// Fetches `url`, trying each strategy from [`build_strategies`] in order
    /// and returning the first non-error response.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Fetch`] describing the last failure when every
    /// strategy fails.
    pub async fn fetch(&mut self, url: &str) -> Result<ListingPage, ScraperError> {
        if !self.warm {
            self.warm_up().await;
        }

        let strategies = build_strategies(url);
        let mut last_failure = AttemptFailure {
            status: None,
            message: "no fetch strategies".to_string(),
        };

        for strategy in &strategies {
            match self.attempt(strategy).await {
                Ok(page) => {
                    tracing::debug!(
                        url = %strategy.url,
                        strategy = strategy.label,
                        final_url = %page.final_url,
                        "fetch succeeded"
                    );
                    return Ok(page);
                }
                Err(failure) => {
                    tracing::warn!(
                        url = %strategy.url,
                        strategy = strategy.label,
                        status = failure.status,
                        message = %failure.message,
                        "fetch strategy failed"
                    );
                    last_failure = failure;
                    if !self.strategy_delay.is_zero() {
                        tokio::time::sleep(self.strategy_delay).await;
                    }
                }
            }
        }

        Err(ScraperError::Fetch {
            url: url.to_string(),
            status: last_failure.status,
            message: last_failure.message,
        })
    }

    async fn attempt(&self, strategy: &Strategy) -> Result<ListingPage, AttemptFailure> {
        let response = self
            .client
            .get(&strategy.url)
            .headers(strategy::headers_for(strategy.profile, &self.site_origin))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(transport_failure)?;

        if status.is_client_error() || status.is_server_error() {
            return Err(AttemptFailure {
                status: Some(status.as_u16()),
                message: body_snippet(&body),
            });
        }

        Ok(ListingPage {
            final_url,
            html: body,
        })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn transport_failure(err: reqwest::Error) -> AttemptFailure {
    AttemptFailure {
        status: None,
        message: err.to_string(),
    }
}

/// First characters of a response body on a single line.
fn body_snippet(body: &str) -> String {
    body.chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
