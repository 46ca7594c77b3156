mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use pricewatch_core::config::parse_throttle;
use pricewatch_core::ScraperConfig;
use pricewatch_scraper::{scrape, FetchSession, ScrapeOptions};
use tracing_subscriber::EnvFilter;

/// Exit status when the scrape finished but produced no rows.
const EMPTY_RESULT_EXIT: u8 = 2;

const EMPTY_RESULT_HINT: &str =
    "No items found. Try --pages all, increase --throttle, or check cache HTML.";

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "Scrape a retailer listing page into a CSV snapshot")]
struct Cli {
    /// Listing URL, e.g. a brand search results page.
    url: String,

    /// Output CSV path; `-` writes to stdout.
    #[arg(long, default_value = "items.csv")]
    out: PathBuf,

    /// `1` for the first page only, `all` to follow pagination.
    #[arg(long, default_value = "1", value_parser = parse_pages)]
    pages: PageMode,

    /// Directory for cached listing HTML (overrides `PRICEWATCH_CACHE_DIR`).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Also cache each product tile's HTML.
    #[arg(long)]
    cache_tiles: bool,

    /// Seconds to pause after each page (overrides `PRICEWATCH_THROTTLE_SECS`).
    #[arg(long, value_parser = parse_throttle)]
    throttle: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageMode {
    First,
    All,
}

fn parse_pages(raw: &str) -> Result<PageMode, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" => Ok(PageMode::First),
        "all" => Ok(PageMode::All),
        other => Err(format!("expected `1` or `all`, got `{other}`")),
    }
}

/// Flags win over values loaded from the environment.
fn scrape_options(cli: &Cli, config: &ScraperConfig) -> ScrapeOptions {
    ScrapeOptions {
        follow_pages: cli.pages == PageMode::All,
        throttle: cli.throttle.unwrap_or(config.throttle),
        cache_dir: cli.cache_dir.clone().or_else(|| config.cache_dir.clone()),
        cache_tiles: cli.cache_tiles,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = pricewatch_core::load_scraper_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let options = scrape_options(&cli, &config);
    tracing::info!(
        url = %cli.url,
        follow_pages = options.follow_pages,
        cache_dir = ?options.cache_dir,
        "starting listing scrape"
    );

    let mut session = FetchSession::new(&config)?;
    let records = scrape(&mut session, &cli.url, &options).await?;

    if records.is_empty() {
        eprintln!("{EMPTY_RESULT_HINT}");
        return Ok(ExitCode::from(EMPTY_RESULT_EXIT));
    }

    let written = output::write_records(&cli.out, &records)?;
    tracing::info!("wrote {written} rows -> {}", output::describe(&cli.out));
    Ok(ExitCode::SUCCESS)
}
