pub mod constants;
pub mod coordinates;
pub mod countries;
pub mod filename;
pub mod interval;
pub mod progress;
pub mod stats;

pub use constants::*;
pub use coordinates::is_valid_coordinate;
pub use countries::country_alpha3;
pub use filename::{sanitize_path_segment, ArchiveFileName};
pub use interval::Interval;
pub use progress::ProgressReporter;
