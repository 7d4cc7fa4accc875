use crate::error::{ProcessingError, Result};
use chrono::NaiveDate;

/// Characters that cannot appear in a single path segment on common filesystems
const PATH_UNSAFE: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace path-unsafe characters with a dash so the value can be used as a directory or file name
pub fn sanitize_path_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| if PATH_UNSAFE.contains(&c) { '-' } else { c })
        .collect()
}

/// Parts of an archive file name: `{date}_{sensorType}_sensor_{sensorId}[_indoor].csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFileName {
    pub date: NaiveDate,
    pub sensor_type: String,
    pub sensor_id: String,
    pub indoor: bool,
}

impl ArchiveFileName {
    pub fn parse(file_name: &str) -> Result<Self> {
        let invalid = || ProcessingError::InvalidFileName(file_name.to_string());

        let stem = file_name.strip_suffix(".csv").ok_or_else(invalid)?;
        let parts: Vec<&str> = stem.split('_').collect();

        if parts.len() < 4 || parts[2] != "sensor" {
            return Err(invalid());
        }

        let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").map_err(|_| invalid())?;
        let sensor_id = parts[3];
        if sensor_id.is_empty() || !sensor_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        Ok(Self {
            date,
            sensor_type: parts[1].to_string(),
            sensor_id: sensor_id.to_string(),
            indoor: parts[4..].contains(&"indoor"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_segment() {
        assert_eq!(sanitize_path_segment("Frankfurt/Main_Germany"), "Frankfurt-Main_Germany");
        assert_eq!(sanitize_path_segment("Stuttgart_Germany"), "Stuttgart_Germany");
    }

    #[test]
    fn test_parse_archive_file_name() {
        let name = ArchiveFileName::parse("2021-01-01_sds011_sensor_12345.csv").unwrap();
        assert_eq!(name.date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(name.sensor_type, "sds011");
        assert_eq!(name.sensor_id, "12345");
        assert!(!name.indoor);
    }

    #[test]
    fn test_parse_indoor_file_name() {
        let name = ArchiveFileName::parse("2021-01-01_sds011_sensor_999_indoor.csv").unwrap();
        assert!(name.indoor);
        assert_eq!(name.sensor_id, "999");
    }

    #[test]
    fn test_parse_invalid_file_names() {
        assert!(ArchiveFileName::parse("index.html").is_err());
        assert!(ArchiveFileName::parse("2021-01-01_sds011_12345.csv").is_err());
        assert!(ArchiveFileName::parse("yesterday_sds011_sensor_1.csv").is_err());
        assert!(ArchiveFileName::parse("2021-01-01_sds011_sensor_abc.csv").is_err());
    }
}
