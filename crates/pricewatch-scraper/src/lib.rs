pub mod cache;
mod dom;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod jsonld;
pub mod listing;
pub mod tiles;

pub use cache::CacheWriter;
pub use error::{CacheError, ScraperError};
pub use extract::{classify_availability, extract_record, normalize_price};
pub use fetch::{build_strategies, FetchSession, HeaderProfile, ListingPage, Strategy};
pub use jsonld::extract_structured;
pub use listing::{discover_pages, scrape, ScrapeOptions};
pub use tiles::{locate_tiles, wrapper_for_anchor, Tile, TreeNode};
