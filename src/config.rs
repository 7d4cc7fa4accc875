//! Runtime settings: endpoints, credentials and cache locations.
//!
//! Values come from built-in defaults, then an optional config file, then
//! `SENSOR_PREPROCESSOR_*` environment variables.

use crate::error::Result;
use crate::utils::{
    DEFAULT_ARCHIVE_URL, DEFAULT_GEOCODE_URL, DEFAULT_LOCATION_CACHE, DEFAULT_LOCKDOWN_CACHE,
    DEFAULT_POLICY_URL,
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

pub const ENV_PREFIX: &str = "SENSOR_PREPROCESSOR";

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct AppConfig {
    /// Key for the reverse-geocoding service; resolution fails without it
    pub maps_api_key: Option<String>,
    pub location_cache_path: PathBuf,
    pub lockdown_cache_path: PathBuf,
    #[validate(url)]
    pub archive_url: String,
    #[validate(url)]
    pub geocode_url: String,
    #[validate(url)]
    pub policy_url: String,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("location_cache_path", DEFAULT_LOCATION_CACHE)?
            .set_default("lockdown_cache_path", DEFAULT_LOCKDOWN_CACHE)?
            .set_default("archive_url", DEFAULT_ARCHIVE_URL)?
            .set_default("geocode_url", DEFAULT_GEOCODE_URL)?
            .set_default("policy_url", DEFAULT_POLICY_URL)?;

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            maps_api_key: None,
            location_cache_path: PathBuf::from(DEFAULT_LOCATION_CACHE),
            lockdown_cache_path: PathBuf::from(DEFAULT_LOCKDOWN_CACHE),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
            policy_url: DEFAULT_POLICY_URL.to_string(),
        }
    }
}
