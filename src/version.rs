//! REST API version identifiers.
//!
//! Every REST call carries a `version=YYYY-MM-DD[~stability]` query
//! parameter. The v1 API is unversioned.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::SnykError;

/// Stability tag attached to a REST version date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Stability {
    /// No suffix.
    #[default]
    Ga,
    /// `~beta`
    Beta,
    /// `~experimental`
    Experimental,
}

impl Stability {
    fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Ga => None,
            Self::Beta => Some("beta"),
            Self::Experimental => Some("experimental"),
        }
    }
}

/// A REST API version such as `2024-10-15` or `2022-02-16~experimental`.
///
/// # Example
///
/// ```
/// use snykapi::{ApiVersion, Stability};
///
/// let version: ApiVersion = "2022-02-16~experimental".parse().unwrap();
/// assert_eq!(version.stability(), Stability::Experimental);
/// assert_eq!(version.to_string(), "2022-02-16~experimental");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiVersion {
    date: NaiveDate,
    stability: Stability,
}

impl ApiVersion {
    /// Create a version from its parts.
    #[must_use]
    pub const fn new(date: NaiveDate, stability: Stability) -> Self {
        Self { date, stability }
    }

    /// The version date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// The stability tag.
    #[must_use]
    pub const fn stability(&self) -> Stability {
        self.stability
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))?;
        if let Some(suffix) = self.stability.suffix() {
            write!(f, "~{suffix}")?;
        }
        Ok(())
    }
}

impl FromStr for ApiVersion {
    type Err = SnykError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date_part, stability) = match s.split_once('~') {
            None => (s, Stability::Ga),
            Some((date, "beta")) => (date, Stability::Beta),
            Some((date, "experimental")) => (date, Stability::Experimental),
            Some((_, other)) => {
                return Err(SnykError::config(format!(
                    "unknown API version stability '{other}' in '{s}'"
                )))
            }
        };

        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
            SnykError::config(format!("invalid API version '{s}': {e}"))
        })?;

        Ok(Self { date, stability })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ga() {
        let v: ApiVersion = "2024-10-15".parse().unwrap();
        assert_eq!(v.stability(), Stability::Ga);
        assert_eq!(v.to_string(), "2024-10-15");
    }

    #[test]
    fn test_parse_beta_and_experimental() {
        let beta: ApiVersion = "2023-09-11~beta".parse().unwrap();
        assert_eq!(beta.stability(), Stability::Beta);
        assert_eq!(beta.to_string(), "2023-09-11~beta");

        let exp: ApiVersion = "2022-02-16~experimental".parse().unwrap();
        assert_eq!(exp.stability(), Stability::Experimental);
    }

    #[test]
    fn test_rejects_bad_versions() {
        assert!("2024-13-01".parse::<ApiVersion>().is_err());
        assert!("2024-10-15~wip".parse::<ApiVersion>().is_err());
        assert!("latest".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_ordering_by_date() {
        let older: ApiVersion = "2023-01-01".parse().unwrap();
        let newer: ApiVersion = "2024-01-01~beta".parse().unwrap();
        assert!(older < newer);
    }
}
