use crate::error::{ProcessingError, Result};
use crate::models::RecordMeta;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Continuous sensor measurement, written as a float
    Measurement,
    /// 0/1 indicator, written as an integer
    Flag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<f64>,
}

impl Column {
    pub fn measurement(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Measurement,
            values,
        }
    }

    pub fn flag(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Flag,
            values,
        }
    }
}

/// Timestamp-indexed numeric table; every column has one value per timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesTable {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl SeriesTable {
    pub fn new(timestamps: Vec<NaiveDateTime>, columns: Vec<Column>) -> Result<Self> {
        if let Some(column) = columns.iter().find(|c| c.values.len() != timestamps.len()) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Column '{}' has {} values for {} timestamps",
                column.name,
                column.values.len(),
                timestamps.len()
            )));
        }

        Ok(Self {
            timestamps,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Add (or overwrite) a column holding the same value on every row
    pub fn set_constant_column(&mut self, name: &str, kind: ColumnKind, value: f64) {
        let values = vec![value; self.len()];
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => {
                column.kind = kind;
                column.values = values;
            }
            None => self.columns.push(Column {
                name: name.to_string(),
                kind,
                values,
            }),
        }
    }

    /// Stable sort of all rows by timestamp; ties keep their relative order
    pub fn sort_by_timestamp(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);

        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        for column in &mut self.columns {
            column.values = order.iter().map(|&i| column.values[i]).collect();
        }
    }

    /// Concatenate tables row-wise. Columns are matched by name in first-seen
    /// order; a table lacking a column contributes NaN for it.
    pub fn concat(tables: Vec<SeriesTable>) -> SeriesTable {
        let mut layout: Vec<(String, ColumnKind)> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !layout.iter().any(|(name, _)| name == &column.name) {
                    layout.push((column.name.clone(), column.kind));
                }
            }
        }

        let total: usize = tables.iter().map(SeriesTable::len).sum();
        let mut timestamps = Vec::with_capacity(total);
        let mut columns: Vec<Column> = layout
            .into_iter()
            .map(|(name, kind)| Column {
                name,
                kind,
                values: Vec::with_capacity(total),
            })
            .collect();

        for table in tables {
            let rows = table.len();
            timestamps.extend(table.timestamps);
            for column in &mut columns {
                match table.columns.iter().find(|c| c.name == column.name) {
                    Some(source) => column.values.extend_from_slice(&source.values),
                    None => column.values.extend(std::iter::repeat(f64::NAN).take(rows)),
                }
            }
        }

        SeriesTable {
            timestamps,
            columns,
        }
    }
}

/// Metadata carried alongside a table through every transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesMeta {
    /// Output file name without extension
    pub file_stem: String,
    /// Contributing sensors, in first-seen order
    pub sensor_ids: Vec<String>,
    /// Nominal date of the first contributing record
    pub date: NaiveDate,
}

impl SeriesMeta {
    pub fn from_record(meta: &RecordMeta) -> Self {
        Self {
            file_stem: meta.series_stem(),
            sensor_ids: vec![meta.sensor_id.clone()],
            date: meta.date,
        }
    }

    /// Metadata of a series built from several others
    pub fn combined<'a>(file_stem: &str, parts: impl IntoIterator<Item = &'a SeriesMeta>) -> Option<Self> {
        let mut sensor_ids: Vec<String> = Vec::new();
        let mut date: Option<NaiveDate> = None;

        for part in parts {
            for id in &part.sensor_ids {
                if !sensor_ids.contains(id) {
                    sensor_ids.push(id.clone());
                }
            }
            date = Some(date.map_or(part.date, |d| d.min(part.date)));
        }

        date.map(|date| Self {
            file_stem: file_stem.to_string(),
            sensor_ids,
            date,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub meta: SeriesMeta,
    pub table: SeriesTable,
}

impl Series {
    pub fn new(meta: SeriesMeta, table: SeriesTable) -> Self {
        Self { meta, table }
    }
}
