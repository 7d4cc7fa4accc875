use crate::error::{ProcessingError, Result};
use crate::models::{RawRecord, RawRow, RecordMeta};
use crate::utils::{
    ArchiveFileName, ARCHIVE_DELIMITER, COL_LAT, COL_LOCATION, COL_LON, COL_SENSOR_ID,
    COL_SENSOR_TYPE, COL_TIMESTAMP,
};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Parses archive CSV files (`;` separated) into raw records.
///
/// Only the identity columns and the requested measurement columns are kept.
/// Rows with an empty or unparsable value in any of them are dropped.
pub struct SensorReader {
    measurements: Vec<String>,
}

struct ColumnIndices {
    sensor_id: usize,
    sensor_type: usize,
    location: usize,
    lat: usize,
    lon: usize,
    timestamp: usize,
    measurements: Vec<usize>,
}

impl SensorReader {
    pub fn new(measurements: Vec<String>) -> Self {
        Self { measurements }
    }

    /// Parse an archive file's content. `Ok(None)` when no row survives.
    pub fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<Option<RawRecord>> {
        let name = ArchiveFileName::parse(file_name)?;
        let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
        if had_errors {
            debug!("Replaced invalid UTF-8 sequences in {}", file_name);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(ARCHIVE_DELIMITER)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| ProcessingError::MissingColumn {
                    file: file_name.to_string(),
                    column: column.to_string(),
                })
        };

        let indices = ColumnIndices {
            sensor_id: position(COL_SENSOR_ID)?,
            sensor_type: position(COL_SENSOR_TYPE)?,
            location: position(COL_LOCATION)?,
            lat: position(COL_LAT)?,
            lon: position(COL_LON)?,
            timestamp: position(COL_TIMESTAMP)?,
            measurements: self
                .measurements
                .iter()
                .map(|m| position(m.as_str()))
                .collect::<Result<Vec<usize>>>()?,
        };

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for record in reader.records() {
            match parse_row(&record?, &indices) {
                Some(row) => rows.push(row),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!("Dropped {} incomplete rows from {}", dropped, file_name);
        }
        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(RawRecord::new(
            RecordMeta::from_archive_name(&name, file_name),
            self.measurements.clone(),
            rows,
        )))
    }

    pub fn read_file(&self, path: &Path) -> Result<Option<RawRecord>> {
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| ProcessingError::InvalidFileName(path.display().to_string()))?;
        let bytes = fs::read(path)?;
        self.parse_bytes(file_name, &bytes)
    }

    /// Read every archive CSV below `dir`. Files that cannot be parsed are
    /// skipped with a warning.
    pub fn read_folder(&self, dir: &Path) -> Result<Vec<RawRecord>> {
        if !dir.is_dir() {
            return Err(ProcessingError::MissingData(format!(
                "Data folder not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in &paths {
            match self.read_file(path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!("No complete rows in {}", path.display()),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} of {} csv files from {}", records.len(), paths.len(), dir.display());
        Ok(records)
    }
}

fn parse_row(record: &csv::StringRecord, indices: &ColumnIndices) -> Option<RawRow> {
    let field = |i: usize| record.get(i).filter(|v| !v.is_empty());

    field(indices.sensor_id)?;
    field(indices.sensor_type)?;
    let location_id = field(indices.location)?;
    let lat = field(indices.lat)?.parse::<f64>().ok()?;
    let lon = field(indices.lon)?.parse::<f64>().ok()?;
    let timestamp = field(indices.timestamp)?;

    let values = indices
        .measurements
        .iter()
        .map(|&i| field(i)?.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;

    Some(RawRow {
        timestamp: timestamp.to_string(),
        lat,
        lon,
        location_id: location_id.to_string(),
        values,
    })
}
