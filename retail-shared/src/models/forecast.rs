use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One forecast period for a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Point estimate of units sold
    pub demand: u64,
    pub confidence_low: u64,
    pub confidence_high: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HorizonError {
    #[error("Horizon is empty")]
    Empty,
    #[error("Invalid horizon '{0}', expected forms like '8w', '60d' or '14'")]
    Invalid(String),
    #[error("Horizon must cover at least one day")]
    Zero,
    #[error("Horizon of {0} days exceeds the {max} day limit", max = Horizon::MAX_DAYS)]
    TooLong(u64),
}

/// Forecast span, stored in whole days.
///
/// Parsed from `"<n>w"` (weeks), `"<n>d"` (days) or a bare day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Horizon {
    days: u32,
}

impl Horizon {
    /// Three years, leap days included.
    pub const MAX_DAYS: u32 = 3 * 366;

    pub fn days(days: u32) -> Result<Self, HorizonError> {
        if days == 0 {
            return Err(HorizonError::Zero);
        }
        if days > Self::MAX_DAYS {
            return Err(HorizonError::TooLong(u64::from(days)));
        }
        Ok(Self { days })
    }

    /// Span of a single weekly period.
    pub fn one_week() -> Self {
        Self { days: 7 }
    }

    pub fn as_days(&self) -> u32 {
        self.days
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self { days: 56 }
    }
}

impl FromStr for Horizon {
    type Err = HorizonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(HorizonError::Empty);
        }

        let (digits, multiplier) = match s.as_bytes()[s.len() - 1] {
            b'w' => (&s[..s.len() - 1], 7u64),
            b'd' => (&s[..s.len() - 1], 1u64),
            _ => (s.as_str(), 1u64),
        };

        let n: u64 = digits
            .trim()
            .parse()
            .map_err(|_| HorizonError::Invalid(s.clone()))?;
        let days = n.saturating_mul(multiplier);
        let days = u32::try_from(days).map_err(|_| HorizonError::TooLong(days))?;
        Self::days(days)
    }
}

impl TryFrom<String> for Horizon {
    type Error = HorizonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Horizon> for String {
    fn from(h: Horizon) -> Self {
        h.to_string()
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.days % 7 == 0 {
            write!(f, "{}w", self.days / 7)
        } else {
            write!(f, "{}d", self.days)
        }
    }
}
