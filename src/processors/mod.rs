pub mod location_resolver;
pub mod lockdown_annotator;
pub mod pipeline;
pub mod record_grouper;
pub mod resampler;
pub mod series_cleaner;

pub use location_resolver::LocationResolver;
pub use lockdown_annotator::LockdownAnnotator;
pub use pipeline::{Preprocessor, RunSummary};
pub use record_grouper::{group_by_location, group_by_sensor, LocationGroups, SensorGroups};
pub use resampler::{combine, Resampler};
pub use series_cleaner::{parse_timestamp, SeriesCleaner};
