use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::app_config::ScraperConfig;
use crate::ConfigError;

/// Load scraper configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_scraper_config() -> Result<ScraperConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_scraper_config_from_env()
}

/// Load scraper configuration from environment variables already in the process.
///
/// Unlike [`load_scraper_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_scraper_config_from_env() -> Result<ScraperConfig, ConfigError> {
    build_scraper_config(|key| std::env::var(key))
}

/// Build scraper configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_scraper_config<F>(lookup: F) -> Result<ScraperConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = ScraperConfig::default();

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let site_origin = lookup("PRICEWATCH_SITE_ORIGIN").unwrap_or(defaults.site_origin);
    parse_origin(&site_origin).map_err(|reason| invalid("PRICEWATCH_SITE_ORIGIN", reason))?;

    let log_level = lookup("PRICEWATCH_LOG_LEVEL").unwrap_or(defaults.log_level);

    let request_timeout_secs =
        parse_u64("PRICEWATCH_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?;
    let warmup_timeout_secs =
        parse_u64("PRICEWATCH_WARMUP_TIMEOUT_SECS", defaults.warmup_timeout_secs)?;
    let strategy_delay_ms = parse_u64("PRICEWATCH_STRATEGY_DELAY_MS", defaults.strategy_delay_ms)?;
    let warmup_pause_ms = parse_u64("PRICEWATCH_WARMUP_PAUSE_MS", defaults.warmup_pause_ms)?;

    let throttle = match lookup("PRICEWATCH_THROTTLE_SECS") {
        Ok(raw) => parse_throttle(&raw).map_err(|reason| invalid("PRICEWATCH_THROTTLE_SECS", reason))?,
        Err(_) => defaults.throttle,
    };

    let cache_dir = lookup("PRICEWATCH_CACHE_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    Ok(ScraperConfig {
        site_origin: site_origin.trim_end_matches('/').to_string(),
        log_level,
        request_timeout_secs,
        warmup_timeout_secs,
        strategy_delay_ms,
        warmup_pause_ms,
        throttle,
        cache_dir,
    })
}

/// Parse a throttle value in seconds, e.g. `"0.8"`.
///
/// # Errors
///
/// Returns a human-readable reason when the value is not a number, is
/// negative or non-finite, or does not fit a [`Duration`].
pub fn parse_throttle(raw: &str) -> Result<Duration, String> {
    let secs = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("\"{raw}\" is not a number: {e}"))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| format!("\"{raw}\" is not a usable number of seconds: {e}"))
}

/// Absolute `http(s)` URL with a host.
fn parse_origin(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("\"{raw}\" is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("\"{raw}\" must use http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("\"{raw}\" has no host"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
