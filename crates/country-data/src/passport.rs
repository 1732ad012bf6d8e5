//! Default passport resolution
//!
//! Turns whatever the location subsystem produced into a passport guess.
//! Every failure is soft: the caller keeps the session's current passport.

use crate::codes::CountryCodeTable;
use crate::CountryKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Reverse-geocoded location from the location subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationHint {
    /// Two-letter country code as the provider reported it
    pub code: String,
    pub city: Option<String>,
}

/// Best-effort passport and origin city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportGuess {
    pub passport: CountryKey,
    pub city: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PassportResolver {
    codes: CountryCodeTable,
}

impl Default for PassportResolver {
    fn default() -> Self {
        Self::new(CountryCodeTable::iso3166().clone())
    }
}

impl PassportResolver {
    pub fn new(codes: CountryCodeTable) -> Self {
        Self { codes }
    }

    pub fn codes(&self) -> &CountryCodeTable {
        &self.codes
    }

    /// Guess a passport from a hint. `None` leaves the session untouched.
    pub fn resolve(&self, hint: &LocationHint) -> Option<PassportGuess> {
        let LocationHint { code, city } = hint;
        match self.codes.alpha3(code) {
            Some(passport) => {
                debug!("Located country {} -> passport {}", code, passport);
                Some(PassportGuess {
                    passport,
                    city: city.clone().filter(|c| !c.trim().is_empty()),
                })
            }
            None => {
                warn!("No passport mapping for country code {:?}; keeping current passport", code);
                None
            }
        }
    }
}
