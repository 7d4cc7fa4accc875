use crate::archive::{ArchiveClient, ArchiveFilter};
use crate::error::{ProcessingError, Result};
use crate::models::RawRecord;
use crate::readers::SensorReader;
use crate::utils::progress::ProgressReporter;
use crate::utils::{
    ARCHIVE_DELIMITER, COL_LAT, COL_LOCATION, COL_LON, COL_SENSOR_ID, COL_SENSOR_TYPE,
    COL_TIMESTAMP, SETTINGS_FILE,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

/// What to scrape; written as `settings.json` next to saved raw files
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[validate(schema(function = "validate_date_range"))]
pub struct ScrapeSettings {
    #[validate(length(min = 1))]
    pub measurements: Vec<String>,
    pub sensor_type: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: Option<String>,
    pub sensor_ids: Vec<String>,
    pub remove_indoor: bool,
}

fn validate_date_range(settings: &ScrapeSettings) -> std::result::Result<(), ValidationError> {
    if settings.start_date > settings.end_date {
        return Err(ValidationError::new("start_date_after_end_date"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeSummary {
    pub days: usize,
    pub failed_days: usize,
    pub files: usize,
    pub records: usize,
}

/// Downloads matching archive files day by day.
///
/// Files of one day are fetched in parallel on a pool of `max_workers`
/// threads; each finished day is handed to a callback.
pub struct ArchiveScraper {
    client: ArchiveClient,
    reader: SensorReader,
    filter: ArchiveFilter,
    settings: ScrapeSettings,
    raw_dir: Option<PathBuf>,
    pool: rayon::ThreadPool,
}

impl ArchiveScraper {
    pub fn new(
        client: ArchiveClient,
        settings: ScrapeSettings,
        filter: ArchiveFilter,
        max_workers: usize,
    ) -> Result<Self> {
        settings.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .build()?;

        Ok(Self {
            client,
            reader: SensorReader::new(settings.measurements.clone()),
            filter,
            settings,
            raw_dir: None,
            pool,
        })
    }

    /// Save every downloaded record below `raw_dir`
    pub fn with_raw_dir(mut self, raw_dir: Option<PathBuf>) -> Self {
        self.raw_dir = raw_dir;
        self
    }

    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    /// Scrape all days in the configured range, calling `on_day` with each
    /// day's records. A day whose listing cannot be fetched is skipped.
    pub fn run<F>(&self, progress: Option<&ProgressReporter>, mut on_day: F) -> Result<ScrapeSummary>
    where
        F: FnMut(NaiveDate, Vec<RawRecord>) -> Result<()>,
    {
        if let Some(raw_dir) = &self.raw_dir {
            self.write_settings(raw_dir)?;
        }

        let mut summary = ScrapeSummary::default();
        for (date, url) in self
            .client
            .date_urls(self.settings.start_date, self.settings.end_date)
        {
            if let Some(p) = progress {
                p.set_message(&format!("Scraping {}", date));
            }

            summary.days += 1;
            match self.scrape_day(date, &url) {
                Ok((files, records)) => {
                    summary.files += files;
                    summary.records += records.len();
                    on_day(date, records)?;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", date, e);
                    summary.failed_days += 1;
                }
            }

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        info!(
            "Scraped {} records from {} files over {} days",
            summary.records, summary.files, summary.days
        );
        Ok(summary)
    }

    /// Fetch one day's listing and download the files the filter accepts.
    /// Returns the number of matching files and the non-empty records.
    pub fn scrape_day(&self, date: NaiveDate, date_url: &str) -> Result<(usize, Vec<RawRecord>)> {
        let files: Vec<String> = self
            .client
            .list_files(date_url)?
            .into_iter()
            .filter(|file| self.filter.accepts(file))
            .collect();

        info!("{} files match on {}", files.len(), date);

        let records = self.pool.install(|| {
            files
                .par_iter()
                .map(|file| self.fetch_record(date_url, file))
                .collect::<Result<Vec<Option<RawRecord>>>>()
        })?;

        Ok((files.len(), records.into_iter().flatten().collect()))
    }

    fn fetch_record(&self, date_url: &str, file_name: &str) -> Result<Option<RawRecord>> {
        let url = format!("{}{}", date_url, file_name);
        let parsed = self
            .client
            .download(&url)
            .and_then(|bytes| self.reader.parse_bytes(file_name, &bytes));

        let record = match parsed {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Skipping {}: {}", url, e);
                return Ok(None);
            }
        };

        if let Some(raw_dir) = &self.raw_dir {
            save_raw(raw_dir, &record)?;
        }
        Ok(Some(record))
    }

    fn write_settings(&self, raw_dir: &Path) -> Result<()> {
        let path = raw_dir.join(SETTINGS_FILE);
        fs::create_dir_all(raw_dir).map_err(|e| ProcessingError::OutputWrite(path.clone(), e))?;
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&path, json).map_err(|e| ProcessingError::OutputWrite(path, e))
    }
}

/// Write a record back in archive format to `{raw_dir}/{date}/{file_name}`
pub fn save_raw(raw_dir: &Path, record: &RawRecord) -> Result<PathBuf> {
    let dir = raw_dir.join(record.meta.date.to_string());
    let path = dir.join(&record.meta.file_name);

    write_archive_csv(&dir, &path, record).map_err(|e| ProcessingError::OutputWrite(path.clone(), e))?;
    Ok(path)
}

fn write_archive_csv(dir: &Path, path: &Path, record: &RawRecord) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(ARCHIVE_DELIMITER)
        .from_path(path)?;

    let mut header = vec![COL_SENSOR_ID, COL_SENSOR_TYPE, COL_LOCATION, COL_LAT, COL_LON, COL_TIMESTAMP];
    header.extend(record.measurements.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in &record.rows {
        let mut fields = vec![
            record.meta.sensor_id.clone(),
            record.meta.sensor_type.clone(),
            row.location_id.clone(),
            row.lat.to_string(),
            row.lon.to_string(),
            row.timestamp.clone(),
        ];
        fields.extend(row.values.iter().map(f64::to_string));
        writer.write_record(&fields)?;
    }

    writer.flush()
}
