//! Session context
//!
//! One explicit state object owned by the composition point (the gateway or
//! the CLI). Each field has a single writer:
//!
//! | Field | Writer |
//! |-------|--------|
//! | facts slot | facts feed load |
//! | matrix slot | matrix feed load |
//! | borders slot | border feed load |
//! | passport / city | locator or user selection (user wins) |
//!
//! Slots move `Pending → Loaded` or `Pending → Failed` once; a loaded slot is
//! never replaced.

use crate::borders::BorderSet;
use crate::facts::FactsTable;
use crate::matrix::{Destination, VisaMatrix};
use crate::passport::PassportGuess;
use crate::{CountryKey, DEFAULT_CITY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// The three feeds the engine joins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Borders,
    Matrix,
    Facts,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dataset::Borders => "borders",
            Dataset::Matrix => "visa matrix",
            Dataset::Facts => "country facts",
        })
    }
}

/// Load progress of one dataset slot
#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Pending,
    Loaded {
        data: T,
        loaded_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
    },
}

impl<T> LoadState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Loaded { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }

    pub fn status(&self) -> LoadStatus {
        match self {
            LoadState::Pending => LoadStatus {
                state: LoadPhase::Pending,
                loaded_at: None,
                reason: None,
            },
            LoadState::Loaded { loaded_at, .. } => LoadStatus {
                state: LoadPhase::Loaded,
                loaded_at: Some(*loaded_at),
                reason: None,
            },
            LoadState::Failed { reason } => LoadStatus {
                state: LoadPhase::Failed,
                loaded_at: None,
                reason: Some(reason.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Pending,
    Loaded,
    Failed,
}

/// Serializable view of a slot, without the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStatus {
    pub state: LoadPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Who set the current passport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassportSource {
    Default,
    Located,
    UserSelected,
}

/// Summary for status endpoints and logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub passport: CountryKey,
    pub city: Option<String>,
    pub passport_source: PassportSource,
    pub ready: bool,
    /// No feed is still pending
    pub settled: bool,
    pub borders: LoadStatus,
    pub matrix: LoadStatus,
    pub facts: LoadStatus,
}

#[derive(Debug, Clone)]
pub struct Session {
    passport: CountryKey,
    city: Option<String>,
    passport_source: PassportSource,
    borders: LoadState<BorderSet>,
    matrix: LoadState<VisaMatrix>,
    facts: LoadState<FactsTable>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session starting at the hard-coded default passport and city
    pub fn new() -> Self {
        Self::with_default(CountryKey::default_passport(), Some(DEFAULT_CITY.to_string()))
    }

    /// Session starting at a configured default
    pub fn with_default(passport: CountryKey, city: Option<String>) -> Self {
        Self {
            passport,
            city,
            passport_source: PassportSource::Default,
            borders: LoadState::Pending,
            matrix: LoadState::Pending,
            facts: LoadState::Pending,
        }
    }

    pub fn passport(&self) -> &CountryKey {
        &self.passport
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn passport_source(&self) -> PassportSource {
        self.passport_source
    }

    pub fn borders(&self) -> Option<&BorderSet> {
        self.borders.data()
    }

    pub fn matrix(&self) -> Option<&VisaMatrix> {
        self.matrix.data()
    }

    pub fn facts(&self) -> Option<&FactsTable> {
        self.facts.data()
    }

    pub fn load_state(&self, dataset: Dataset) -> LoadStatus {
        match dataset {
            Dataset::Borders => self.borders.status(),
            Dataset::Matrix => self.matrix.status(),
            Dataset::Facts => self.facts.status(),
        }
    }

    /// True once all three feeds are loaded
    pub fn is_ready(&self) -> bool {
        self.borders.is_loaded() && self.matrix.is_loaded() && self.facts.is_loaded()
    }

    /// True once no feed is still pending, whether it loaded or failed
    pub fn is_settled(&self) -> bool {
        !self.borders.is_pending() && !self.matrix.is_pending() && !self.facts.is_pending()
    }

    pub fn install_borders(&mut self, borders: BorderSet) -> bool {
        install(&mut self.borders, borders, Dataset::Borders)
    }

    pub fn install_matrix(&mut self, matrix: VisaMatrix) -> bool {
        install(&mut self.matrix, matrix, Dataset::Matrix)
    }

    pub fn install_facts(&mut self, facts: FactsTable) -> bool {
        install(&mut self.facts, facts, Dataset::Facts)
    }

    /// Record a failed load. The slot stays empty for the rest of the session.
    pub fn mark_failed(&mut self, dataset: Dataset, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        warn!("{} feed unavailable: {}", dataset, reason);
        match dataset {
            Dataset::Borders => fail(&mut self.borders, reason),
            Dataset::Matrix => fail(&mut self.matrix, reason),
            Dataset::Facts => fail(&mut self.facts, reason),
        }
    }

    /// Explicit choice from the passport picker. Always applied and final.
    pub fn select_passport(&mut self, passport: CountryKey) {
        info!("Passport selected by user: {}", passport);
        self.passport = passport;
        self.passport_source = PassportSource::UserSelected;
    }

    /// Adopt an automatic guess. Location applies at most once per session and
    /// never after the user has chosen.
    pub fn apply_location(&mut self, guess: PassportGuess) -> bool {
        match self.passport_source {
            PassportSource::UserSelected => {
                info!(
                    "Ignoring located passport {}: user already selected {}",
                    guess.passport, self.passport
                );
                return false;
            }
            PassportSource::Located => {
                debug!("Ignoring located passport {}: already located", guess.passport);
                return false;
            }
            PassportSource::Default => {}
        }
        info!("Passport located: {} ({:?})", guess.passport, guess.city);
        self.passport = guess.passport;
        if guess.city.is_some() {
            self.city = guess.city;
        }
        self.passport_source = PassportSource::Located;
        true
    }

    /// Whether an automatic location attempt could still change the passport
    pub fn accepts_location(&self) -> bool {
        self.passport_source == PassportSource::Default
    }

    /// Passport picker options, named with whatever facts are loaded
    pub fn available_destinations(&self) -> Vec<Destination> {
        self.matrix()
            .map(|m| m.available_destinations(self.facts()))
            .unwrap_or_default()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            passport: self.passport.clone(),
            city: self.city.clone(),
            passport_source: self.passport_source,
            ready: self.is_ready(),
            settled: self.is_settled(),
            borders: self.borders.status(),
            matrix: self.matrix.status(),
            facts: self.facts.status(),
        }
    }
}

fn install<T>(slot: &mut LoadState<T>, data: T, dataset: Dataset) -> bool {
    if slot.is_loaded() {
        warn!("Ignoring second {} load: slot already loaded", dataset);
        return false;
    }
    info!("{} feed loaded", dataset);
    *slot = LoadState::Loaded {
        data,
        loaded_at: Utc::now(),
    };
    true
}

fn fail<T>(slot: &mut LoadState<T>, reason: String) -> bool {
    if !slot.is_pending() {
        return false;
    }
    *slot = LoadState::Failed { reason };
    true
}
