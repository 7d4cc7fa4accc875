use crate::utils::filename::ArchiveFileName;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identity of one sensor-day archive file, carried alongside its rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub sensor_id: String,
    pub sensor_type: String,
    pub date: NaiveDate,
    /// Archive file name the rows came from
    pub file_name: String,
}

impl RecordMeta {
    pub fn new(sensor_id: &str, sensor_type: &str, date: NaiveDate, file_name: &str) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            sensor_type: sensor_type.to_string(),
            date,
            file_name: file_name.to_string(),
        }
    }

    pub fn from_archive_name(name: &ArchiveFileName, file_name: &str) -> Self {
        Self::new(&name.sensor_id, &name.sensor_type, name.date, file_name)
    }

    /// Stem of the per-sensor-per-day output file
    pub fn series_stem(&self) -> String {
        format!("{}_{}_{}", self.date, self.sensor_id, self.sensor_type)
    }
}

/// One archive row with its required columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub timestamp: String,
    pub lat: f64,
    pub lon: f64,
    pub location_id: String,
    /// Measurement values, aligned with [`RawRecord::measurements`]
    pub values: Vec<f64>,
}

/// One sensor-day file's worth of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub meta: RecordMeta,
    pub measurements: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawRecord {
    pub fn new(meta: RecordMeta, measurements: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self {
            meta,
            measurements,
            rows,
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.meta.sensor_id
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Coordinates of the first row; a sensor is assumed not to move within a day
    pub fn first_coordinates(&self) -> Option<(f64, f64)> {
        self.rows.first().map(|row| (row.lat, row.lon))
    }
}
