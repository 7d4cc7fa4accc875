/// Archive column names
pub const COL_SENSOR_ID: &str = "sensor_id";
pub const COL_SENSOR_TYPE: &str = "sensor_type";
pub const COL_LOCATION: &str = "location";
pub const COL_LAT: &str = "lat";
pub const COL_LON: &str = "lon";
pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_LOCKDOWN: &str = "lockdown";

/// Archive files are semicolon separated
pub const ARCHIVE_DELIMITER: u8 = b';';

/// File names
pub const SETTINGS_FILE: &str = "settings.json";
pub const STATISTICS_FILE: &str = "statistics.json";

/// Default endpoints
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive.sensor.community/";
pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_POLICY_URL: &str = "https://raw.githubusercontent.com/OxCGRT/covid-policy-tracker/master/data/timeseries/c6_stay_at_home_requirements.csv";

/// Default cache locations
pub const DEFAULT_LOCATION_CACHE: &str = "cache/location_cache.json";
pub const DEFAULT_LOCKDOWN_CACHE: &str = "cache/lockdown_cache.json";

/// First day of the policy dataset; no lockdown existed before it
pub const POLICY_START_DATE: (i32, u32, u32) = (2020, 1, 1);

/// Z-score cleaning
pub const ZSCORE_THRESHOLD: f64 = 3.0;

/// New Year's Eve anomaly window (local hours)
pub const NEW_YEARS_EVE_START_HOUR: u32 = 18;
pub const NEW_YEARS_DAY_END_HOUR: u32 = 12;

/// Windowed-median (Hampel) cleaning
pub const HAMPEL_WINDOW_SIZE: usize = 7;
pub const HAMPEL_THRESHOLD: f64 = 3.0;
/// Scales the median absolute deviation to a standard deviation under normality
pub const MAD_SCALE: f64 = 1.4826;

/// Decimal digits kept after resampling
pub const RESAMPLE_DECIMALS: i32 = 2;

/// Output timestamp format
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
