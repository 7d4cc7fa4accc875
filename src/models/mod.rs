pub mod location;
pub mod pipeline_config;
pub mod raw_record;
pub mod series;

pub use location::ResolvedLocation;
pub use pipeline_config::{CleaningPolicy, PipelineConfig};
pub use raw_record::{RawRecord, RawRow, RecordMeta};
pub use series::{Column, ColumnKind, Series, SeriesMeta, SeriesTable};
