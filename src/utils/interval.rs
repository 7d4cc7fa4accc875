use crate::error::{ProcessingError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed-width resample interval written as an offset string such as `15min` or `1D`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    text: String,
    duration: Duration,
}

impl Interval {
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for Interval {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(split);

        // A bare unit means one of it, as in "D" or "H"
        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| ProcessingError::InvalidInterval(s.to_string()))?
        };

        if count <= 0 {
            return Err(ProcessingError::InvalidInterval(s.to_string()));
        }

        let duration = match unit {
            "s" | "S" | "sec" => Duration::try_seconds(count),
            "min" | "T" | "m" => Duration::try_minutes(count),
            "h" | "H" => Duration::try_hours(count),
            "d" | "D" => Duration::try_days(count),
            "w" | "W" => Duration::try_weeks(count),
            _ => None,
        }
        .ok_or_else(|| ProcessingError::InvalidInterval(s.to_string()))?;

        Ok(Self {
            text: trimmed.to_string(),
            duration,
        })
    }
}

impl TryFrom<String> for Interval {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.text
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_offsets() {
        assert_eq!("1D".parse::<Interval>().unwrap().duration(), Duration::days(1));
        assert_eq!("15min".parse::<Interval>().unwrap().duration(), Duration::minutes(15));
        assert_eq!("15T".parse::<Interval>().unwrap().duration(), Duration::minutes(15));
        assert_eq!("2h".parse::<Interval>().unwrap().duration(), Duration::hours(2));
        assert_eq!("H".parse::<Interval>().unwrap().duration(), Duration::hours(1));
        assert_eq!("30s".parse::<Interval>().unwrap().duration(), Duration::seconds(30));
    }

    #[test]
    fn test_rejects_bad_offsets() {
        assert!("0D".parse::<Interval>().is_err());
        assert!("1fortnight".parse::<Interval>().is_err());
        assert!("".parse::<Interval>().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_offsets() {
        let result = "99999999999999W".parse::<Interval>();
        assert!(matches!(result, Err(ProcessingError::InvalidInterval(_))));
        assert!("9999999999999999999D".parse::<Interval>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let interval: Interval = serde_json::from_str("\"1H\"").unwrap();
        assert_eq!(interval.duration(), Duration::hours(1));
        assert_eq!(serde_json::to_string(&interval).unwrap(), "\"1H\"");
    }
}
