use crate::cache::LocationCache;
use crate::utils::ArchiveFileName;
use std::collections::HashSet;

/// Selects which archive files of a day are downloaded
#[derive(Debug, Clone, Default)]
pub struct ArchiveFilter {
    sensor_type: Option<String>,
    sensor_ids: Option<HashSet<String>>,
    location_sensor_ids: Option<HashSet<String>>,
    remove_indoor: bool,
}

impl ArchiveFilter {
    pub fn new() -> Self {
        Self {
            remove_indoor: true,
            ..Self::default()
        }
    }

    /// Keep files whose sensor type contains `sensor_type` (case-insensitive)
    pub fn with_sensor_type(mut self, sensor_type: Option<&str>) -> Self {
        self.sensor_type = sensor_type
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        self
    }

    pub fn with_sensor_ids(mut self, sensor_ids: &[String]) -> Self {
        self.sensor_ids = if sensor_ids.is_empty() {
            None
        } else {
            Some(sensor_ids.iter().cloned().collect())
        };
        self
    }

    /// Keep sensors the location cache already places at `location`
    pub fn with_location(mut self, location: Option<&str>, cache: &LocationCache) -> Self {
        self.location_sensor_ids = location.map(|wanted| {
            cache
                .iter()
                .filter(|(_, value)| value.as_str() == wanted)
                .map(|(key, _)| key.to_string())
                .collect()
        });
        self
    }

    pub fn with_remove_indoor(mut self, remove_indoor: bool) -> Self {
        self.remove_indoor = remove_indoor;
        self
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        let Ok(name) = ArchiveFileName::parse(file_name) else {
            return false;
        };

        if self.remove_indoor && name.indoor {
            return false;
        }
        if let Some(sensor_type) = &self.sensor_type {
            if !name.sensor_type.to_lowercase().contains(sensor_type.as_str()) {
                return false;
            }
        }
        if let Some(ids) = &self.sensor_ids {
            if !ids.contains(&name.sensor_id) {
                return false;
            }
        }
        if let Some(ids) = &self.location_sensor_ids {
            if !ids.contains(&name.sensor_id) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SDS: &str = "2021-01-01_sds011_sensor_12345.csv";
    const BME: &str = "2021-01-01_bme280_sensor_678.csv";
    const INDOOR: &str = "2021-01-01_sds011_sensor_999_indoor.csv";

    #[test]
    fn test_default_removes_indoor_only() {
        let filter = ArchiveFilter::new();
        assert!(filter.accepts(SDS));
        assert!(filter.accepts(BME));
        assert!(!filter.accepts(INDOOR));
        assert!(!filter.accepts("README.csv"));
        assert!(ArchiveFilter::new().with_remove_indoor(false).accepts(INDOOR));
    }

    #[test]
    fn test_sensor_type_and_ids() {
        let filter = ArchiveFilter::new()
            .with_sensor_type(Some("SDS011"))
            .with_sensor_ids(&["12345".to_string()]);
        assert!(filter.accepts(SDS));
        assert!(!filter.accepts(BME));
        assert!(!filter.accepts("2021-01-01_sds011_sensor_1.csv"));
    }

    #[test]
    fn test_location_uses_cache() {
        let cache = LocationCache::with_entries(
            Path::new("unused.json"),
            [
                ("12345".to_string(), "Stuttgart_Germany".to_string()),
                ("678".to_string(), "Berlin_Germany".to_string()),
            ],
        );

        let filter = ArchiveFilter::new().with_location(Some("Stuttgart_Germany"), &cache);
        assert!(filter.accepts(SDS));
        assert!(!filter.accepts(BME));
    }
}
