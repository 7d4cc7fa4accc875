/// Whether a latitude/longitude pair can be sent to a reverse geocoder
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Format a coordinate pair for a `latlng` query parameter
pub fn format_latlng(latitude: f64, longitude: f64) -> String {
    format!("{},{}", latitude, longitude)
}
