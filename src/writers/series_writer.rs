use crate::error::{ProcessingError, Result};
use crate::models::{ColumnKind, PipelineConfig, ResolvedLocation, Series};
use crate::utils::{sanitize_path_segment, COL_TIMESTAMP, OUTPUT_TIMESTAMP_FORMAT, SETTINGS_FILE};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes per-location series as CSV under `{output_dir}/{location}/`.
///
/// A file that does not exist yet is created with a header; an existing file
/// is appended to without one, so repeated runs extend the same series.
pub struct SeriesWriter {
    output_dir: PathBuf,
}

impl SeriesWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Directory holding the series files of `location`
    pub fn location_dir(&self, location: &ResolvedLocation) -> PathBuf {
        self.output_dir.join(sanitize_path_segment(location.as_str()))
    }

    /// Write the run's configuration as the settings manifest
    pub fn write_settings(&self, config: &PipelineConfig) -> Result<()> {
        let path = self.output_dir.join(SETTINGS_FILE);
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| ProcessingError::OutputWrite(path.clone(), e))?;

        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json).map_err(|e| ProcessingError::OutputWrite(path, e))
    }

    /// Write every series of one location. Returns the number of rows written.
    pub fn write(&self, location: &ResolvedLocation, series: &[Series]) -> Result<usize> {
        let dir = self.location_dir(location);
        fs::create_dir_all(&dir).map_err(|e| ProcessingError::OutputWrite(dir.clone(), e))?;

        let mut rows = 0;
        for item in series {
            let path = dir.join(format!("{}.csv", sanitize_path_segment(&item.meta.file_stem)));
            self.write_series(&path, item)
                .map_err(|e| ProcessingError::OutputWrite(path.clone(), e))?;
            rows += item.table.len();
        }

        info!("Saved {} rows from {} to {}", rows, location, dir.display());
        Ok(rows)
    }

    fn write_series(&self, path: &Path, series: &Series) -> io::Result<()> {
        let exists = path.is_file();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));

        let table = &series.table;
        if !exists {
            let mut header = vec![COL_TIMESTAMP];
            header.extend(table.column_names());
            writer.write_record(&header)?;
        }

        let mut fields: Vec<String> = Vec::with_capacity(table.columns().len() + 1);
        for (row, timestamp) in table.timestamps().iter().enumerate() {
            fields.clear();
            fields.push(timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string());
            for column in table.columns() {
                fields.push(format_value(column.values[row], column.kind));
            }
            writer.write_record(&fields)?;
        }

        writer.flush()
    }
}

fn format_value(value: f64, kind: ColumnKind) -> String {
    if !value.is_finite() {
        return String::new();
    }
    match kind {
        ColumnKind::Flag => format!("{}", value as i64),
        ColumnKind::Measurement => value.to_string(),
    }
}
