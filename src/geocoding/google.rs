//! Google Maps reverse geocoding client.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-reverse-geocoding>

use super::{GeocodeError, Place, ReverseGeocoder};
use crate::utils::coordinates::format_latlng;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const CITY_TYPES: [&str; 2] = ["locality", "political"];
const COUNTRY_TYPES: [&str; 2] = ["country", "political"];

pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleGeocoder {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key,
        })
    }
}

impl ReverseGeocoder for GoogleGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<Place>, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::MissingApiKey)?;
        let latlng = format_latlng(latitude, longitude);

        debug!("Reverse geocoding {}", latlng);

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latlng", latlng.as_str()),
                ("result_type", "locality|political"),
                ("key", api_key),
            ])
            .send()?;

        if !resp.status().is_success() {
            return Err(GeocodeError::Service {
                status: resp.status().to_string(),
            });
        }

        let text = resp.text()?;
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => parse_response(&body),
            Err(e) => {
                warn!("Unreadable geocoding response for {}: {}", latlng, e);
                Ok(None)
            }
        }
    }
}

/// Parses a Google geocoding JSON response.
///
/// `OK` and `ZERO_RESULTS` are answers; other statuses (quota, denied key)
/// are service errors.
fn parse_response(body: &Value) -> Result<Option<Place>, GeocodeError> {
    match body["status"].as_str() {
        None | Some("OK") | Some("ZERO_RESULTS") => {}
        Some(status) => {
            return Err(GeocodeError::Service {
                status: status.to_string(),
            })
        }
    }

    let Some(components) = body["results"]
        .as_array()
        .and_then(|results| results.first())
        .and_then(|first| first["address_components"].as_array())
    else {
        return Ok(None);
    };

    let city = find_component(components, &CITY_TYPES);
    let country = find_component(components, &COUNTRY_TYPES);

    Ok(match (city, country) {
        (Some(city), Some(country)) => Some(Place {
            city: city.to_string(),
            country: country.to_string(),
        }),
        _ => None,
    })
}

/// Long name of the first component whose `types` list equals `types` exactly
fn find_component<'a>(components: &'a [Value], types: &[&str]) -> Option<&'a str> {
    components
        .iter()
        .find(|component| {
            component["types"].as_array().is_some_and(|tags| {
                tags.len() == types.len()
                    && tags.iter().zip(types).all(|(tag, want)| tag.as_str() == Some(*want))
            })
        })
        .and_then(|component| component["long_name"].as_str())
}
