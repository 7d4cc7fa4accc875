use crate::cache::{LocationCache, LockdownCache};
use crate::error::Result;
use crate::geocoding::ReverseGeocoder;
use crate::lockdown::PolicySource;
use crate::models::{PipelineConfig, RawRecord, ResolvedLocation, Series};
use crate::processors::record_grouper::{group_by_location, group_by_sensor};
use crate::processors::resampler::{combine, Resampler};
use crate::processors::{LocationResolver, LockdownAnnotator, SeriesCleaner};
use crate::utils::progress::ProgressReporter;
use crate::writers::SeriesWriter;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};
use validator::Validate;

/// Counts reported by one [`Preprocessor::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub records: usize,
    pub sensors: usize,
    pub locations_written: usize,
    pub unresolved_records: usize,
    pub skipped_records: usize,
    pub rows_written: usize,
}

/// The preprocessing pipeline.
///
/// Grouping, location resolution and lockdown annotation run on the calling
/// thread; cleaning runs on a worker pool of `max_workers` threads. Both
/// caches live as long as the preprocessor and are flushed by
/// [`Preprocessor::finish`], so several runs (one per scraped day) share them.
pub struct Preprocessor<G, P> {
    config: PipelineConfig,
    resolver: LocationResolver<G>,
    annotator: LockdownAnnotator<P>,
    cleaner: SeriesCleaner,
    resampler: Option<Resampler>,
    writer: SeriesWriter,
    pool: rayon::ThreadPool,
}

impl<G: ReverseGeocoder, P: PolicySource> Preprocessor<G, P> {
    /// Validate the configuration, build the worker pool and write the settings manifest
    pub fn new(
        config: PipelineConfig,
        geocoder: G,
        location_cache: LocationCache,
        policy: P,
        lockdown_cache: LockdownCache,
    ) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_workers)
            .build()?;

        let writer = SeriesWriter::new(&config.output_dir);
        writer.write_settings(&config)?;

        Ok(Self {
            cleaner: SeriesCleaner::new(config.cleaning_policy),
            resampler: config.resample_interval.clone().map(Resampler::new),
            resolver: LocationResolver::new(geocoder, location_cache),
            annotator: LockdownAnnotator::new(policy, lockdown_cache),
            writer,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &LocationResolver<G> {
        &self.resolver
    }

    pub fn annotator(&self) -> &LockdownAnnotator<P> {
        &self.annotator
    }

    /// Process one batch of raw records and append the results to the output directory
    pub fn run(&mut self, records: Vec<RawRecord>, progress: Option<&ProgressReporter>) -> Result<RunSummary> {
        let mut summary = RunSummary {
            records: records.len(),
            ..RunSummary::default()
        };

        if let Some(p) = progress {
            p.set_message("Resolving sensor locations...");
        }

        // Location is resolved once per sensor
        let sensor_groups = group_by_sensor(records);
        summary.sensors = sensor_groups.len();
        let locations = self.resolver.resolve_sensors(&sensor_groups);

        let groups = group_by_location(sensor_groups, &locations);
        if !groups.unresolved.is_empty() {
            warn!(
                "Dropping {} records from sensors without a resolved location",
                groups.unresolved.len()
            );
        }
        summary.unresolved_records = groups.unresolved.len();

        if let Some(p) = progress {
            p.set_message(&format!("Cleaning {} records...", summary.records - summary.unresolved_records));
        }

        let skipped = AtomicUsize::new(0);
        let cleaner = self.cleaner;
        let cleaned: Vec<(ResolvedLocation, Vec<Series>)> = self.pool.install(|| {
            groups
                .located
                .into_iter()
                .map(|(location, records)| {
                    let series = records
                        .into_par_iter()
                        .filter_map(|record| {
                            let file_name = record.meta.file_name.clone();
                            match cleaner.clean(record) {
                                Ok(series) => Some(series),
                                Err(e) => {
                                    warn!("Skipping {}: {}", file_name, e);
                                    skipped.fetch_add(1, Ordering::Relaxed);
                                    None
                                }
                            }
                        })
                        .collect();
                    (location, series)
                })
                .collect()
        });
        summary.skipped_records = skipped.into_inner();

        for (location, series) in cleaned {
            if series.is_empty() {
                continue;
            }
            if let Some(p) = progress {
                p.set_message(&format!("Processing data from {}", location));
            }
            info!("Processing data from {}", location);

            let series = self.transform(&location, series)?;
            summary.rows_written += self.writer.write(&location, &series)?;
            summary.locations_written += 1;
        }

        info!(
            "Run complete: {} records from {} sensors, {} locations written, {} unresolved, {} skipped",
            summary.records,
            summary.sensors,
            summary.locations_written,
            summary.unresolved_records,
            summary.skipped_records
        );

        Ok(summary)
    }

    /// Annotate, combine and resample the series of one location
    fn transform(&mut self, location: &ResolvedLocation, mut series: Vec<Series>) -> Result<Vec<Series>> {
        if self.config.add_lockdown_info {
            self.annotator.annotate(location, &mut series);
        }

        if self.config.combine_by_location {
            series = combine(location, series).into_iter().collect();
        }

        match &self.resampler {
            Some(resampler) => series
                .into_iter()
                .map(|s| resampler.resample_series(s))
                .collect(),
            None => Ok(series),
        }
    }

    /// Flush both caches. Dropping the preprocessor flushes too, but only
    /// `finish` reports write failures.
    pub fn finish(mut self) -> Result<()> {
        self.resolver.cache_mut().flush()?;
        self.annotator.cache_mut().flush()?;
        info!(
            "Saved caches ({} locations, {} lockdown entries)",
            self.resolver.cache().len(),
            self.annotator.cache().len()
        );
        Ok(())
    }
}

