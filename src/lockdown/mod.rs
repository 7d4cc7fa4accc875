//! Stay-at-home policy data used for lockdown annotation.

pub mod oxcgrt;

pub use oxcgrt::{OxcgrtPolicySource, PolicyTable};

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unexpected policy data layout: {0}")]
    Format(String),

    #[error("Policy data unavailable")]
    Unavailable,
}

/// Source of the "stay-at-home requirements" indicator
pub trait PolicySource {
    /// Severity on `date` for the country with ISO alpha-3 code `alpha3`.
    /// `Ok(None)` when the dataset holds no value for that pair.
    fn stay_at_home_level(&self, date: NaiveDate, alpha3: &str) -> Result<Option<f64>, PolicyError>;
}

impl<P: PolicySource + ?Sized> PolicySource for &P {
    fn stay_at_home_level(&self, date: NaiveDate, alpha3: &str) -> Result<Option<f64>, PolicyError> {
        (**self).stay_at_home_level(date, alpha3)
    }
}
