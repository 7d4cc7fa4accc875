use crate::error::Result;
use crate::models::{Column, ColumnKind, ResolvedLocation, Series, SeriesMeta, SeriesTable};
use crate::utils::stats::{median, round_to};
use crate::utils::{Interval, RESAMPLE_DECIMALS};
use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Merge all series of a location into one table ordered by timestamp.
/// Rows with equal timestamps keep their input order.
pub fn combine(location: &ResolvedLocation, series: Vec<Series>) -> Option<Series> {
    let meta = SeriesMeta::combined(location.as_str(), series.iter().map(|s| &s.meta))?;
    let mut table = SeriesTable::concat(series.into_iter().map(|s| s.table).collect());
    table.sort_by_timestamp();
    Some(Series::new(meta, table))
}

/// Interval-mean downsampling onto a fixed grid anchored at midnight of the
/// first timestamp's day
#[derive(Debug, Clone)]
pub struct Resampler {
    interval: Interval,
}

impl Resampler {
    pub fn new(interval: Interval) -> Self {
        Self { interval }
    }

    pub fn resample_series(&self, series: Series) -> Result<Series> {
        let table = self.resample(&series.table)?;
        Ok(Series::new(series.meta, table))
    }

    /// Bucket means per column. Buckets without a value take the median of the
    /// filled buckets; everything is rounded to two decimals and flag columns
    /// to whole numbers.
    pub fn resample(&self, table: &SeriesTable) -> Result<SeriesTable> {
        let (Some(first), Some(last)) = (
            table.timestamps().iter().min().copied(),
            table.timestamps().iter().max().copied(),
        ) else {
            return Ok(table.clone());
        };

        let step = self.interval.duration().num_milliseconds().max(1);
        let origin = first.date().and_time(NaiveTime::default());
        let bucket_of = |t: &NaiveDateTime| ((*t - origin).num_milliseconds() / step) as usize;

        let first_bucket = bucket_of(&first);
        let bucket_count = bucket_of(&last) - first_bucket + 1;
        let rows: Vec<usize> = table
            .timestamps()
            .iter()
            .map(|t| bucket_of(t) - first_bucket)
            .collect();

        let timestamps = (0..bucket_count)
            .map(|b| origin + Duration::milliseconds(((first_bucket + b) as i64) * step))
            .collect();

        let columns = table
            .columns()
            .iter()
            .map(|column| {
                let mut sums = vec![0.0; bucket_count];
                let mut counts = vec![0usize; bucket_count];
                for (&bucket, &value) in rows.iter().zip(&column.values) {
                    if value.is_finite() {
                        sums[bucket] += value;
                        counts[bucket] += 1;
                    }
                }

                let mut means: Vec<f64> = sums
                    .iter()
                    .zip(&counts)
                    .map(|(sum, &count)| if count == 0 { f64::NAN } else { sum / count as f64 })
                    .collect();

                if let Some(fill) = median(&means) {
                    for value in means.iter_mut().filter(|v| !v.is_finite()) {
                        *value = fill;
                    }
                }

                let values = means
                    .into_iter()
                    .map(|v| match column.kind {
                        ColumnKind::Flag => v.round(),
                        ColumnKind::Measurement => round_to(v, RESAMPLE_DECIMALS),
                    })
                    .collect();

                Column {
                    name: column.name.clone(),
                    kind: column.kind,
                    values,
                }
            })
            .collect();

        SeriesTable::new(timestamps, columns)
    }
}
