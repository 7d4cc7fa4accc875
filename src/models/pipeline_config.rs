use crate::utils::Interval;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Outlier replacement applied to each measurement column of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CleaningPolicy {
    #[default]
    None,
    /// Median replacement of |z| > 3 values plus New Year's Eve suppression
    Zscore,
    /// Sliding-window (Hampel) filter
    #[value(name = "hampel", alias = "windowed-median")]
    WindowedMedian,
}

/// Options recognised by the preprocessing pipeline; persisted as the run's `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,

    #[validate(length(min = 1))]
    pub measurements: Vec<String>,

    pub combine_by_location: bool,

    pub resample_interval: Option<Interval>,

    pub add_lockdown_info: bool,

    pub cleaning_policy: CleaningPolicy,

    #[serde(skip)]
    #[validate(range(min = 1))]
    pub max_workers: usize,
}

impl PipelineConfig {
    pub fn new(output_dir: &Path, measurements: Vec<String>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            measurements,
            combine_by_location: false,
            resample_interval: None,
            add_lockdown_info: false,
            cleaning_policy: CleaningPolicy::None,
            max_workers: num_cpus::get(),
        }
    }

    pub fn with_combine_by_location(mut self, combine: bool) -> Self {
        self.combine_by_location = combine;
        self
    }

    pub fn with_resample_interval(mut self, interval: Option<Interval>) -> Self {
        self.resample_interval = interval;
        self
    }

    pub fn with_lockdown_info(mut self, add_lockdown_info: bool) -> Self {
        self.add_lockdown_info = add_lockdown_info;
        self
    }

    pub fn with_cleaning_policy(mut self, policy: CleaningPolicy) -> Self {
        self.cleaning_policy = policy;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }
}
