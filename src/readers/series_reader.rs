use crate::error::{ProcessingError, Result};
use crate::models::{Column, SeriesTable};
use crate::processors::parse_timestamp;
use crate::utils::COL_TIMESTAMP;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Reads a preprocessed output directory back into tables, keyed by location
/// directory name
pub struct SeriesReader;

impl SeriesReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_output_dir(&self, dir: &Path) -> Result<BTreeMap<String, Vec<SeriesTable>>> {
        if !dir.is_dir() {
            return Err(ProcessingError::MissingData(format!(
                "Output folder not found: {}",
                dir.display()
            )));
        }

        let mut locations: BTreeMap<String, Vec<SeriesTable>> = BTreeMap::new();
        let mut entries: Vec<_> = WalkDir::new(dir)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        entries.sort();

        for path in entries {
            let Some(location) = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .map(str::to_string)
            else {
                continue;
            };

            match self.read_file(&path) {
                Ok(table) => locations.entry(location).or_default().push(table),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        debug!("Read {} locations from {}", locations.len(), dir.display());
        Ok(locations)
    }

    /// Read one series file. Empty cells become NaN.
    pub fn read_file(&self, path: &Path) -> Result<SeriesTable> {
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        let headers = reader.headers()?.clone();

        let timestamp_index = headers
            .iter()
            .position(|h| h == COL_TIMESTAMP)
            .ok_or_else(|| ProcessingError::MissingColumn {
                file: path.display().to_string(),
                column: COL_TIMESTAMP.to_string(),
            })?;

        let value_indices: Vec<(usize, &str)> = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != timestamp_index)
            .collect();

        let mut timestamps = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_indices.len()];

        for record in reader.records() {
            let record = record?;
            let raw = record.get(timestamp_index).unwrap_or_default();
            let timestamp = parse_timestamp(raw).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Unparsable timestamp '{}'", raw))
            })?;
            timestamps.push(timestamp);

            for (column, &(i, _)) in values.iter_mut().zip(&value_indices) {
                let value = record
                    .get(i)
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .unwrap_or(f64::NAN);
                column.push(value);
            }
        }

        let columns = value_indices
            .iter()
            .zip(values)
            .map(|(&(_, name), column)| Column::measurement(name, column))
            .collect();

        SeriesTable::new(timestamps, columns)
    }
}

impl Default for SeriesReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_output_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let stuttgart = dir.path().join("Stuttgart_Germany");
        fs::create_dir_all(&stuttgart)?;
        fs::write(
            stuttgart.join("Stuttgart_Germany.csv"),
            "timestamp,P1,P2,lockdown\n2021-01-01 00:00:00,1.5,,0\n2021-01-02 00:00:00,2.5,3,1\n",
        )?;
        fs::write(dir.path().join("settings.json"), "{}")?;

        let locations = SeriesReader::new().read_output_dir(dir.path())?;

        assert_eq!(locations.len(), 1);
        let table = &locations["Stuttgart_Germany"][0];
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_names(), vec!["P1", "P2", "lockdown"]);
        assert!(table.column("P2").unwrap().values[0].is_nan());
        assert_eq!(table.column("lockdown").unwrap().values, vec![0.0, 1.0]);
        Ok(())
    }
}
