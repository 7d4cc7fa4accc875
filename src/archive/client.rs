use crate::error::{ProcessingError, Result};
use chrono::{Days, NaiveDate};
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

/// HTTP access to the daily directory listings of the sensor archive
pub struct ArchiveClient {
    client: Client,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { client, base_url })
    }

    /// Listing URL of every day from `start` to `end`, inclusive
    pub fn date_urls(&self, start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, String)> {
        let mut urls = Vec::new();
        let mut day = start;
        while day <= end {
            urls.push((day, format!("{}{}/", self.base_url, day)));
            match day.checked_add_days(Days::new(1)) {
                Some(next) => day = next,
                None => break,
            }
        }
        urls
    }

    /// CSV file names linked from a day's listing
    pub fn list_files(&self, date_url: &str) -> Result<Vec<String>> {
        info!("Retrieving file urls from {}", date_url);
        let html = self.client.get(date_url).send()?.error_for_status()?.text()?;
        let files = parse_listing(&html)?;
        info!("Retrieved {} file urls", files.len());
        Ok(files)
    }

    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}", url);
        let bytes = self.client.get(url).send()?.error_for_status()?.bytes()?;
        Ok(bytes.to_vec())
    }
}

/// `href` targets ending in `.csv`, in page order
pub fn parse_listing(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]")
        .map_err(|e| ProcessingError::InvalidFormat(format!("Invalid selector: {}", e)))?;

    Ok(document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.rsplit('/').next().unwrap_or(href))
        .filter(|name| name.ends_with(".csv"))
        .map(str::to_string)
        .collect())
}
