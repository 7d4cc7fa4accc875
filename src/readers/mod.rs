pub mod sensor_reader;
pub mod series_reader;

pub use sensor_reader::SensorReader;
pub use series_reader::SeriesReader;
