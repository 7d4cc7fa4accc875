pub mod statistics;

pub use statistics::{ColumnStatistics, DataStatistics, GroupStatistics, LocationStatistics};
