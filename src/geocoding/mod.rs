//! Reverse geocoding of sensor coordinates.

pub mod google;

pub use google::GoogleGeocoder;

use thiserror::Error;

/// Errors that prevent a lookup from producing an answer.
///
/// A well-formed reply without a usable address is not an error; it is
/// reported as `Ok(None)`.
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No API key configured for the service.
    #[error("No geocoding API key configured")]
    MissingApiKey,

    /// The service refused or failed the request.
    #[error("Geocoding service returned status {status}")]
    Service { status: String },
}

/// City and country names of a coordinate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub city: String,
    pub country: String,
}

impl Place {
    /// `"{city}_{country}"`
    pub fn canonical_name(&self) -> String {
        format!("{}_{}", self.city, self.country)
    }
}

/// Maps a coordinate to the place containing it
pub trait ReverseGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<Place>, GeocodeError>;
}

impl<G: ReverseGeocoder + ?Sized> ReverseGeocoder for &G {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<Place>, GeocodeError> {
        (**self).reverse(latitude, longitude)
    }
}
