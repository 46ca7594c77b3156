pub mod app_config;
pub mod config;
pub mod products;

use thiserror::Error;

pub use app_config::ScraperConfig;
pub use config::{load_scraper_config, load_scraper_config_from_env};
pub use products::{dedupe_by_sku, ProductRecord, StockStatus, CSV_COLUMNS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
