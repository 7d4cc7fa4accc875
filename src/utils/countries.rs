//! Country name to ISO 3166-1 alpha-3 lookup.
//!
//! ISO names and codes come from the `isocountry` registry. Reverse geocoding
//! services answer with common short names ("United States", "Czechia",
//! "Türkiye") that differ from the ISO names, so those are listed here.

use isocountry::CountryCode;

// (geocoder spelling, alpha-3)
const ALIASES: &[(&str, &str)] = &[
    ("Bolivia", "BOL"),
    ("Brunei", "BRN"),
    ("Cape Verde", "CPV"),
    ("Côte d'Ivoire", "CIV"),
    ("Ivory Coast", "CIV"),
    ("Czech Republic", "CZE"),
    ("Czechia", "CZE"),
    ("Democratic Republic of the Congo", "COD"),
    ("Republic of the Congo", "COG"),
    ("Congo", "COG"),
    ("Eswatini", "SWZ"),
    ("Falkland Islands", "FLK"),
    ("Hong Kong", "HKG"),
    ("Iran", "IRN"),
    ("Kosovo", "RKS"),
    ("Laos", "LAO"),
    ("Macau", "MAC"),
    ("Macao", "MAC"),
    ("Micronesia", "FSM"),
    ("Moldova", "MDA"),
    ("Myanmar (Burma)", "MMR"),
    ("Myanmar", "MMR"),
    ("Netherlands", "NLD"),
    ("The Netherlands", "NLD"),
    ("North Korea", "PRK"),
    ("North Macedonia", "MKD"),
    ("Macedonia", "MKD"),
    ("Palestine", "PSE"),
    ("Russia", "RUS"),
    ("South Korea", "KOR"),
    ("Syria", "SYR"),
    ("Taiwan", "TWN"),
    ("Tanzania", "TZA"),
    ("The Bahamas", "BHS"),
    ("The Gambia", "GMB"),
    ("Türkiye", "TUR"),
    ("Turkey", "TUR"),
    ("United Kingdom", "GBR"),
    ("UK", "GBR"),
    ("United States", "USA"),
    ("USA", "USA"),
    ("Vatican City", "VAT"),
    ("Venezuela", "VEN"),
    ("Vietnam", "VNM"),
];

/// Look up the ISO alpha-3 code for a country name or alpha-2/alpha-3 code.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn country_alpha3(country: &str) -> Option<&'static str> {
    let needle = country.trim();
    if needle.is_empty() {
        return None;
    }

    let lowered = needle.to_lowercase();
    if let Some((_, alpha3)) = ALIASES
        .iter()
        .find(|(alias, _)| alias.to_lowercase() == lowered)
    {
        return Some(*alpha3);
    }

    let upper = needle.to_uppercase();
    let by_code = match upper.len() {
        2 => CountryCode::for_alpha2(&upper).ok(),
        3 => CountryCode::for_alpha3(&upper).ok(),
        _ => None,
    };
    if let Some(code) = by_code {
        return Some(code.alpha3());
    }

    CountryCode::iter()
        .find(|code| code.name().to_lowercase() == lowered)
        .map(|code| code.alpha3())
}
