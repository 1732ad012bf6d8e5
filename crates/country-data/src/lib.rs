//! Country Data Resolution Engine
//!
//! Joins three independently shaped feeds on a single three-letter country key
//! and turns a (passport, destination) pair into a display-ready view.
//!
//! # Feeds
//!
//! | Feed | Shape | Keyed structure |
//! |------|-------|-----------------|
//! | Border polygons | GeoJSON FeatureCollection | [`borders::BorderSet`] |
//! | Visa requirements | `{passport: {destination: requirement}}` | [`matrix::VisaMatrix`] |
//! | Country facts | REST Countries v3.1 array | [`facts::FactsTable`] |
//!
//! # Flow
//!
//! ```text
//! feeds ──► loader ──► Session slots ──► resolve(session, key) ──► ResolvedView
//!                          ▲
//!  location hint ──► PassportResolver (user selection always wins)
//! ```
//!
//! Every lookup is total: missing keys, pending feeds and unknown vocabulary
//! degrade to the `unknown` category and "N/A" facts instead of failing.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod borders;
pub mod classify;
pub mod codes;
pub mod facts;
pub mod loader;
pub mod matrix;
pub mod passport;
pub mod resolve;
pub mod session;

pub use classify::{RawRequirement, RequirementCategory};
pub use codes::CountryCodeTable;
pub use facts::{CountryFacts, FactsTable};
pub use matrix::{Destination, VisaMatrix};
pub use passport::{LocationHint, PassportGuess, PassportResolver};
pub use resolve::{resolve, FlightLink, Resolution, ResolvedView};
pub use session::{LoadState, PassportSource, Session};

/// Passport used until geolocation or the user says otherwise
pub const DEFAULT_PASSPORT: &str = "USA";

/// Origin city paired with [`DEFAULT_PASSPORT`]
pub const DEFAULT_CITY: &str = "New York";

/// Budget for a single geolocation attempt
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder for facts the provider did not supply
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("Unexpected feed shape: {0}")]
    UnexpectedShape(&'static str),
    #[error("Invalid country key: {0:?}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, DataError>;

/// Canonical three-letter country code (ISO 3166-1 alpha-3 style)
///
/// The only join key between the border, matrix and facts feeds, and the
/// feature identifier handed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryKey(String);

impl CountryKey {
    /// Parse a key from provider text. Exactly three ASCII letters, any case.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 3 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            Some(Self(trimmed.to_ascii_uppercase()))
        } else {
            None
        }
    }

    /// The [`DEFAULT_PASSPORT`] key
    pub fn default_passport() -> Self {
        Self(DEFAULT_PASSPORT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CountryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CountryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryKey {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value).ok_or(DataError::InvalidKey(value))
    }
}

impl From<CountryKey> for String {
    fn from(key: CountryKey) -> Self {
        key.0
    }
}

impl std::str::FromStr for CountryKey {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| DataError::InvalidKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_key_parse() {
        assert_eq!(CountryKey::parse("usa").unwrap().as_str(), "USA");
        assert_eq!(CountryKey::parse(" Fra ").unwrap().as_str(), "FRA");
        assert!(CountryKey::parse("US").is_none());
        assert!(CountryKey::parse("USAA").is_none());
        assert!(CountryKey::parse("U5A").is_none());
        assert!(CountryKey::parse("").is_none());
        // GeoJSON feeds use "-99" for disputed areas
        assert!(CountryKey::parse("-99").is_none());
        assert_eq!(CountryKey::parse(DEFAULT_PASSPORT), Some(CountryKey::default_passport()));
    }

    #[test]
    fn test_country_key_serde() {
        let key: CountryKey = serde_json::from_str("\"deu\"").unwrap();
        assert_eq!(key.as_str(), "DEU");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"DEU\"");
        assert!(serde_json::from_str::<CountryKey>("\"DE\"").is_err());
    }

    #[test]
    fn test_country_key_borrow_lookup() {
        let mut map = std::collections::HashMap::new();
        map.insert(CountryKey::parse("EGY").unwrap(), 1);
        assert_eq!(map.get("EGY"), Some(&1));
    }
}
