//! Sensor.Community archive crawler: daily listings, file selection and download.

pub mod client;
pub mod filter;
pub mod scraper;

pub use client::ArchiveClient;
pub use filter::ArchiveFilter;
pub use scraper::{save_raw, ArchiveScraper, ScrapeSettings, ScrapeSummary};
