use crate::utils::filename::sanitize_path_segment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical `"{city}_{country}"` name of a sensor's location.
///
/// An empty value means resolution failed. Path-unsafe characters are replaced
/// on construction since the value doubles as an output directory name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedLocation(String);

impl ResolvedLocation {
    pub fn new(value: &str) -> Self {
        Self(sanitize_path_segment(value))
    }

    pub fn from_parts(city: &str, country: &str) -> Self {
        Self::new(&format!("{}_{}", city, country))
    }

    pub fn unresolved() -> Self {
        Self(String::new())
    }

    pub fn is_resolved(&self) -> bool {
        !self.0.is_empty()
    }

    /// Country name, the trailing `_` segment
    pub fn country(&self) -> Option<&str> {
        if !self.is_resolved() {
            return None;
        }
        self.0.rsplit('_').next().filter(|c| !c.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_resolved() {
            f.write_str(&self.0)
        } else {
            f.write_str("<unresolved>")
        }
    }
}
