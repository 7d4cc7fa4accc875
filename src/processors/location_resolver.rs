use crate::cache::LocationCache;
use crate::geocoding::{GeocodeError, ReverseGeocoder};
use crate::models::ResolvedLocation;
use crate::processors::record_grouper::SensorGroups;
use crate::utils::is_valid_coordinate;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Resolves sensors to `"{city}_{country}"` through a cached reverse geocoder.
///
/// Lookups take `&mut self`, so the cache is only ever touched by one caller
/// and each unseen key costs at most one geocoder call per run.
pub struct LocationResolver<G> {
    geocoder: G,
    cache: LocationCache,
    geocoder_calls: usize,
}

impl<G: ReverseGeocoder> LocationResolver<G> {
    pub fn new(geocoder: G, cache: LocationCache) -> Self {
        Self {
            geocoder,
            cache,
            geocoder_calls: 0,
        }
    }

    /// Resolve `key` (a sensor id) located at `(lat, lon)`.
    ///
    /// Cached values are returned without a call. A geocoder answer, including
    /// an empty one, is cached. Service failures are returned and not cached,
    /// so the sensor is retried on a later run.
    pub fn resolve(&mut self, key: &str, lat: f64, lon: f64) -> Result<ResolvedLocation, GeocodeError> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(ResolvedLocation::new(cached));
        }

        if !is_valid_coordinate(lat, lon) {
            debug!("Sensor {} has no usable coordinates ({}, {})", key, lat, lon);
            return Ok(ResolvedLocation::unresolved());
        }

        self.geocoder_calls += 1;
        let name = self
            .geocoder
            .reverse(lat, lon)?
            .map(|place| place.canonical_name())
            .unwrap_or_default();

        let stored = self.cache.insert(key, name);
        Ok(ResolvedLocation::new(stored))
    }

    /// Resolve every sensor once, from the first row of its first non-empty record
    pub fn resolve_sensors(&mut self, groups: &SensorGroups) -> HashMap<String, ResolvedLocation> {
        let mut locations = HashMap::with_capacity(groups.len());

        for (sensor_id, records) in groups {
            let (lat, lon) = records
                .iter()
                .find_map(|r| r.first_coordinates())
                .unwrap_or((f64::NAN, f64::NAN));

            let location = match self.resolve(sensor_id, lat, lon) {
                Ok(location) => location,
                Err(e) => {
                    warn!("Failed to resolve location of sensor {}: {}", sensor_id, e);
                    ResolvedLocation::unresolved()
                }
            };

            info!("Resolved sensor {} at {}, {} to {}", sensor_id, lat, lon, location);
            locations.insert(sensor_id.clone(), location);
        }

        locations
    }

    /// Number of geocoder requests issued so far
    pub fn geocoder_calls(&self) -> usize {
        self.geocoder_calls
    }

    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LocationCache {
        &mut self.cache
    }
}
