use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for one listing scrape, sourced from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScraperConfig {
    /// Scheme + host of the retailer, e.g. `https://www.microcenter.com`.
    pub site_origin: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub warmup_timeout_secs: u64,
    /// Courtesy delay after each failed fetch strategy.
    pub strategy_delay_ms: u64,
    /// Pause after the session warm-up completes.
    pub warmup_pause_ms: u64,
    /// Courtesy delay after each processed listing page.
    pub throttle: Duration,
    pub cache_dir: Option<PathBuf>,
}

impl ScraperConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_secs(self.warmup_timeout_secs)
    }

    #[must_use]
    pub fn strategy_delay(&self) -> Duration {
        Duration::from_millis(self.strategy_delay_ms)
    }

    #[must_use]
    pub fn warmup_pause(&self) -> Duration {
        Duration::from_millis(self.warmup_pause_ms)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            site_origin: "https://www.microcenter.com".to_string(),
            log_level: "info".to_string(),
            request_timeout_secs: 30,
            warmup_timeout_secs: 15,
            strategy_delay_ms: 600,
            warmup_pause_ms: 500,
            throttle: Duration::from_millis(800),
            cache_dir: None,
        }
    }
}
