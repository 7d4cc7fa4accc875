//! Oxford COVID-19 Government Response Tracker timeseries (indicator C6).
//!
//! The CSV has one row per jurisdiction with a `country_code` column and one
//! column per day named like `01Jan2020`.

use super::{PolicyError, PolicySource};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;
use tracing::{info, warn};

const COUNTRY_CODE_COLUMN: &str = "country_code";
const DATE_COLUMN_FORMAT: &str = "%d%b%Y";

/// Per-country daily severity values
#[derive(Debug, Default)]
pub struct PolicyTable {
    countries: HashMap<String, HashMap<NaiveDate, f64>>,
}

impl PolicyTable {
    /// Parse the timeseries CSV. Only the first row of each country code is
    /// kept; later rows hold sub-national jurisdictions.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PolicyError> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let code_index = headers
            .iter()
            .position(|h| h.trim() == COUNTRY_CODE_COLUMN)
            .ok_or_else(|| PolicyError::Format(format!("missing '{}' column", COUNTRY_CODE_COLUMN)))?;

        let date_columns: Vec<(usize, NaiveDate)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| {
                NaiveDate::parse_from_str(h.trim(), DATE_COLUMN_FORMAT)
                    .ok()
                    .map(|date| (i, date))
            })
            .collect();

        if date_columns.is_empty() {
            return Err(PolicyError::Format("no date columns".to_string()));
        }

        let mut countries: HashMap<String, HashMap<NaiveDate, f64>> = HashMap::new();
        for record in csv_reader.records() {
            let record = record?;
            let Some(code) = record.get(code_index).map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };
            if countries.contains_key(code) {
                continue;
            }

            let values = date_columns
                .iter()
                .filter_map(|&(i, date)| {
                    record
                        .get(i)
                        .and_then(|v| v.trim().parse::<f64>().ok())
                        .filter(|v| v.is_finite())
                        .map(|v| (date, v))
                })
                .collect();
            countries.insert(code.to_string(), values);
        }

        Ok(Self { countries })
    }

    pub fn level(&self, date: NaiveDate, alpha3: &str) -> Option<f64> {
        self.countries.get(alpha3)?.get(&date).copied()
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }
}

/// Downloads the timeseries on first use and answers lookups from memory.
/// A failed download is not retried within the same source.
pub struct OxcgrtPolicySource {
    client: Client,
    url: String,
    table: OnceCell<Option<PolicyTable>>,
}

impl OxcgrtPolicySource {
    pub fn new(url: &str) -> Result<Self, PolicyError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            table: OnceCell::new(),
        })
    }

    /// Source backed by an already parsed table
    pub fn from_table(table: PolicyTable) -> Result<Self, PolicyError> {
        let source = Self::new("")?;
        let _ = source.table.set(Some(table));
        Ok(source)
    }

    fn download(&self) -> Result<PolicyTable, PolicyError> {
        info!("Downloading policy data from {}", self.url);
        let resp = self.client.get(&self.url).send()?.error_for_status()?;
        let table = PolicyTable::from_reader(resp)?;
        info!("Loaded policy data for {} countries", table.country_count());
        Ok(table)
    }

    fn table(&self) -> Option<&PolicyTable> {
        self.table
            .get_or_init(|| match self.download() {
                Ok(table) => Some(table),
                Err(e) => {
                    warn!("Failed to load policy data: {}", e);
                    None
                }
            })
            .as_ref()
    }
}

impl PolicySource for OxcgrtPolicySource {
    fn stay_at_home_level(&self, date: NaiveDate, alpha3: &str) -> Result<Option<f64>, PolicyError> {
        let table = self.table().ok_or(PolicyError::Unavailable)?;
        Ok(table.level(date, alpha3))
    }
}
