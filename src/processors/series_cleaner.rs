use crate::error::{ProcessingError, Result};
use crate::models::{CleaningPolicy, Column, RawRecord, Series, SeriesMeta, SeriesTable};
use crate::utils::stats::{mad, mean, median, std_dev};
use crate::utils::{
    HAMPEL_THRESHOLD, HAMPEL_WINDOW_SIZE, MAD_SCALE, NEW_YEARS_DAY_END_HOUR,
    NEW_YEARS_EVE_START_HOUR, ZSCORE_THRESHOLD,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Turns raw records into timestamp-indexed series.
///
/// Stateless apart from the policy, so records can be cleaned on any thread.
/// Cleaning replaces values and never adds, removes or reorders rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesCleaner {
    policy: CleaningPolicy,
}

impl SeriesCleaner {
    pub fn new(policy: CleaningPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CleaningPolicy {
        self.policy
    }

    /// Parse timestamps, drop the coordinate columns and apply the cleaning policy
    pub fn clean(&self, record: RawRecord) -> Result<Series> {
        let timestamps = record
            .rows
            .iter()
            .map(|row| {
                parse_timestamp(&row.timestamp).ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!(
                        "Unparsable timestamp '{}' in {}",
                        row.timestamp, record.meta.file_name
                    ))
                })
            })
            .collect::<Result<Vec<NaiveDateTime>>>()?;

        let columns = record
            .measurements
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut values: Vec<f64> = record
                    .rows
                    .iter()
                    .map(|row| row.values.get(i).copied().unwrap_or(f64::NAN))
                    .collect();
                self.clean_column(record.meta.date, &timestamps, &mut values);
                Column::measurement(name, values)
            })
            .collect();

        let table = SeriesTable::new(timestamps, columns)?;
        Ok(Series::new(SeriesMeta::from_record(&record.meta), table))
    }

    fn clean_column(&self, date: NaiveDate, timestamps: &[NaiveDateTime], values: &mut [f64]) {
        match self.policy {
            CleaningPolicy::None => {}
            CleaningPolicy::Zscore => {
                replace_new_years_eve(date, timestamps, values);
                replace_zscore_outliers(values);
            }
            CleaningPolicy::WindowedMedian => hampel_filter(values),
        }
    }
}

/// Parse an archive timestamp into a timezone-naive instant.
/// Offsets are dropped, keeping the local wall-clock time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Fireworks suppression: Dec 31 from 18:00 and Jan 1 until 12:00 take the
/// median of the rest of the same file.
fn replace_new_years_eve(date: NaiveDate, timestamps: &[NaiveDateTime], values: &mut [f64]) {
    let in_window: fn(&NaiveDateTime) -> bool = match (date.month(), date.day()) {
        (12, 31) => |t| t.hour() >= NEW_YEARS_EVE_START_HOUR,
        (1, 1) => |t| t.hour() < NEW_YEARS_DAY_END_HOUR,
        _ => return,
    };

    let outside: Vec<f64> = timestamps
        .iter()
        .zip(values.iter())
        .filter(|(t, _)| !in_window(*t))
        .map(|(_, v)| *v)
        .collect();

    let Some(replacement) = median(&outside) else {
        return;
    };

    for (t, value) in timestamps.iter().zip(values.iter_mut()) {
        if in_window(t) {
            *value = replacement;
        }
    }
}

/// Replace values more than three population standard deviations from the
/// mean with the column median
fn replace_zscore_outliers(values: &mut [f64]) {
    let (Some(center), Some(std), Some(replacement)) =
        (mean(values), std_dev(values, 0), median(values))
    else {
        return;
    };
    if std == 0.0 {
        return;
    }

    for value in values.iter_mut() {
        if value.is_finite() && ((*value - center) / std).abs() > ZSCORE_THRESHOLD {
            *value = replacement;
        }
    }
}

/// Sliding-window median filter. Windows are centred and truncated at the edges;
/// a point is replaced when it deviates from the window median by more than
/// `HAMPEL_THRESHOLD` scaled median absolute deviations.
fn hampel_filter(values: &mut [f64]) {
    let half = HAMPEL_WINDOW_SIZE / 2;
    let original = values.to_vec();

    for (i, value) in values.iter_mut().enumerate() {
        if !value.is_finite() {
            continue;
        }
        let window = &original[i.saturating_sub(half)..(i + half + 1).min(original.len())];
        let Some(window_median) = median(window) else {
            continue;
        };
        let Some(deviation) = mad(window, window_median) else {
            continue;
        };

        if (*value - window_median).abs() > HAMPEL_THRESHOLD * MAD_SCALE * deviation {
            *value = window_median;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRow, RecordMeta};
    use pretty_assertions::assert_eq;

    fn record(date: NaiveDate, rows: &[(&str, f64)]) -> RawRecord {
        let file_name = format!("{}_sds011_sensor_1.csv", date);
        RawRecord::new(
            RecordMeta::new("1", "sds011", date, &file_name),
            vec!["P1".to_string()],
            rows.iter()
                .map(|(timestamp, value)| RawRow {
                    timestamp: timestamp.to_string(),
                    lat: 48.78,
                    lon: 9.18,
                    location_id: "3710".to_string(),
                    values: vec![*value],
                })
                .collect(),
        )
    }

    fn hourly(date: NaiveDate, values: &[f64]) -> RawRecord {
        let stamps: Vec<String> = (0..values.len())
            .map(|h| format!("{}T{:02}:00:00", date, h))
            .collect();
        let rows: Vec<(&str, f64)> = stamps
            .iter()
            .map(String::as_str)
            .zip(values.iter().copied())
            .collect();
        record(date, &rows)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = day(2021, 1, 1).and_hms_opt(10, 5, 0).unwrap();
        assert_eq!(parse_timestamp("2021-01-01T10:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-01-01 10:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-01-01T10:05:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-01-01T10:05:00Z"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_no_policy_keeps_values() {
        let values = vec![10.0; 20].into_iter().chain([500.0]).collect::<Vec<_>>();
        let series = SeriesCleaner::new(CleaningPolicy::None)
            .clean(hourly(day(2021, 3, 1), &values))
            .unwrap();

        assert_eq!(series.table.column("P1").unwrap().values, values);
        assert_eq!(series.meta.file_stem, "2021-03-01_1_sds011");
        assert_eq!(series.table.column_names(), vec!["P1"]);
    }

    #[test]
    fn test_zscore_replaces_outlier_with_median() {
        let mut values = vec![10.0; 20];
        values.push(100.0);
        let series = SeriesCleaner::new(CleaningPolicy::Zscore)
            .clean(hourly(day(2021, 3, 1), &values))
            .unwrap();

        let cleaned = &series.table.column("P1").unwrap().values;
        assert_eq!(cleaned.len(), 21);
        assert_eq!(cleaned[20], 10.0);
    }

    #[test]
    fn test_zscore_constant_column_untouched() {
        let values = vec![7.0; 12];
        let series = SeriesCleaner::new(CleaningPolicy::Zscore)
            .clean(hourly(day(2021, 3, 1), &values))
            .unwrap();
        assert_eq!(series.table.column("P1").unwrap().values, values);
    }

    #[test]
    fn test_new_years_eve_evening_replaced() {
        let date = day(2020, 12, 31);
        let rec = record(
            date,
            &[
                ("2020-12-31T10:00:00", 5.0),
                ("2020-12-31T12:00:00", 7.0),
                ("2020-12-31T19:00:00", 300.0),
                ("2020-12-31T23:00:00", 400.0),
            ],
        );

        let series = SeriesCleaner::new(CleaningPolicy::Zscore).clean(rec).unwrap();
        assert_eq!(series.table.column("P1").unwrap().values, vec![5.0, 7.0, 6.0, 6.0]);
    }

    #[test]
    fn test_new_years_day_morning_replaced() {
        let date = day(2021, 1, 1);
        let rec = record(
            date,
            &[
                ("2021-01-01T00:00:00", 400.0),
                ("2021-01-01T03:00:00", 300.0),
                ("2021-01-01T13:00:00", 8.0),
                ("2021-01-01T15:00:00", 10.0),
            ],
        );

        let series = SeriesCleaner::new(CleaningPolicy::Zscore).clean(rec).unwrap();
        assert_eq!(series.table.column("P1").unwrap().values, vec![9.0, 9.0, 8.0, 10.0]);
    }

    #[test]
    fn test_new_years_without_complement_unchanged() {
        let date = day(2020, 12, 31);
        let rec = record(date, &[("2020-12-31T19:00:00", 300.0), ("2020-12-31T23:00:00", 400.0)]);

        let series = SeriesCleaner::new(CleaningPolicy::Zscore).clean(rec).unwrap();
        assert_eq!(series.table.column("P1").unwrap().values, vec![300.0, 400.0]);
    }

    #[test]
    fn test_hampel_replaces_spike() {
        let values = vec![10.0, 11.0, 9.0, 10.0, 12.0, 100.0, 11.0, 10.0, 9.0, 10.0];
        let series = SeriesCleaner::new(CleaningPolicy::WindowedMedian)
            .clean(hourly(day(2021, 3, 1), &values))
            .unwrap();

        let mut expected = values.clone();
        expected[5] = 10.0;
        assert_eq!(series.table.column("P1").unwrap().values, expected);
    }

    #[test]
    fn test_cleaning_preserves_rows_and_order() {
        let values: Vec<f64> = (0..24).map(|h| if h == 7 { 900.0 } else { (h % 5) as f64 }).collect();
        let raw = hourly(day(2021, 3, 1), &values);
        let expected_timestamps: Vec<NaiveDateTime> = raw
            .rows
            .iter()
            .map(|r| parse_timestamp(&r.timestamp).unwrap())
            .collect();

        for policy in [CleaningPolicy::None, CleaningPolicy::Zscore, CleaningPolicy::WindowedMedian] {
            let series = SeriesCleaner::new(policy).clean(raw.clone()).unwrap();
            assert_eq!(series.table.len(), 24);
            assert_eq!(series.table.timestamps(), expected_timestamps.as_slice());
        }
    }

    #[test]
    fn test_bad_timestamp_rejects_record() {
        let rec = record(day(2021, 3, 1), &[("2021-03-01T00:00:00", 1.0), ("not a time", 2.0)]);
        assert!(SeriesCleaner::default().clean(rec).is_err());
    }
}
