use crate::error::{ProcessingError, Result};
use crate::models::SeriesTable;
use crate::readers::SeriesReader;
use crate::utils::stats::{mean, quantile, std_dev};
use crate::utils::STATISTICS_FILE;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Descriptive statistics of one column; missing values are not counted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStatistics {
    pub fn describe(values: &[f64]) -> Self {
        Self {
            count: values.iter().filter(|v| v.is_finite()).count(),
            mean: mean(values),
            std: std_dev(values, 1),
            min: quantile(values, 0.0),
            p25: quantile(values, 0.25),
            p50: quantile(values, 0.5),
            p75: quantile(values, 0.75),
            max: quantile(values, 1.0),
        }
    }
}

/// Time frame and per-column statistics over a set of tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStatistics {
    pub time_frame: String,
    #[serde(flatten)]
    pub measurements: BTreeMap<String, ColumnStatistics>,
}

impl GroupStatistics {
    pub fn from_tables<'a>(tables: impl IntoIterator<Item = &'a SeriesTable>) -> Self {
        let mut first = None;
        let mut last = None;
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for table in tables {
            for &timestamp in table.timestamps() {
                first = Some(first.map_or(timestamp, |f: chrono::NaiveDateTime| f.min(timestamp)));
                last = Some(last.map_or(timestamp, |l: chrono::NaiveDateTime| l.max(timestamp)));
            }
            for column in table.columns() {
                columns
                    .entry(column.name.clone())
                    .or_default()
                    .extend_from_slice(&column.values);
            }
        }

        let time_frame = match (first, last) {
            (Some(first), Some(last)) => format!("{} - {}", first.date(), last.date()),
            _ => String::new(),
        };

        Self {
            time_frame,
            measurements: columns
                .into_iter()
                .map(|(name, values)| (name, ColumnStatistics::describe(&values)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationStatistics {
    pub location_count: usize,
    #[serde(flatten)]
    pub locations: BTreeMap<String, GroupStatistics>,
}

/// Content of `statistics.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStatistics {
    #[serde(flatten)]
    pub overall: GroupStatistics,
    pub location_statistics: LocationStatistics,
}

impl DataStatistics {
    pub fn from_locations(locations: &BTreeMap<String, Vec<SeriesTable>>) -> Self {
        Self {
            overall: GroupStatistics::from_tables(locations.values().flatten()),
            location_statistics: LocationStatistics {
                location_count: locations.len(),
                locations: locations
                    .iter()
                    .map(|(location, tables)| (location.clone(), GroupStatistics::from_tables(tables)))
                    .collect(),
            },
        }
    }

    /// Compute statistics for a preprocessed output directory
    pub fn from_output_dir(data_folder: &Path) -> Result<Self> {
        let locations = SeriesReader::new().read_output_dir(data_folder)?;
        if locations.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No preprocessed series found in {}",
                data_folder.display()
            )));
        }
        Ok(Self::from_locations(&locations))
    }

    /// Write `statistics.json` into `output_dir`
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(STATISTICS_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(
            "Wrote statistics for {} locations to {}",
            self.location_statistics.location_count,
            path.display()
        );
        Ok(path)
    }
}
