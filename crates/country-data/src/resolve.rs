//! Resolution facade
//!
//! Joins the session's current passport with a destination key across the
//! loaded feeds. Pure given a session snapshot: the same inputs always give
//! the same view, so nothing is cached.

use crate::classify::{self, RequirementCategory, UNKNOWN_COLOR, UNKNOWN_LABEL};
use crate::facts::CountryFacts;
use crate::session::Session;
use crate::CountryKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Fill for the user's own passport country on the map
pub const HOME_COLOR: &str = "#1e90ff";
pub const HOME_LABEL: &str = "Your Passport";

const FLIGHT_SEARCH_URL: &str = "https://www.google.com/travel/flights";

/// Flight search from the user's city to the destination capital
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLink {
    pub origin: String,
    pub destination: String,
    pub url: String,
}

/// Display-ready join of one passport/destination pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedView {
    pub destination: CountryKey,
    pub passport: CountryKey,
    pub facts: CountryFacts,
    pub category: RequirementCategory,
    pub color: String,
    /// Label as stored ("visa free" for day counts)
    pub label: String,
    /// Title-cased label for the details card
    pub display_label: String,
    /// Visa-free day count when the feed gave one. Never affects the category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_days: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight: Option<FlightLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "selection", rename_all = "snake_case")]
pub enum Resolution {
    NoSelection,
    Selected(ResolvedView),
}

impl Resolution {
    pub fn view(&self) -> Option<&ResolvedView> {
        match self {
            Resolution::NoSelection => None,
            Resolution::Selected(view) => Some(view),
        }
    }
}

/// Fill color and tooltip for one map feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStyle {
    pub color: String,
    pub label: String,
}

/// Resolve a destination for the session's current passport.
///
/// While any feed is still pending the verdict is forced to unknown so a
/// partially loaded session never shows a premature requirement. A feed that
/// failed for good no longer holds verdicts back.
pub fn resolve(session: &Session, destination: Option<&CountryKey>) -> Resolution {
    let Some(destination) = destination else {
        return Resolution::NoSelection;
    };
    let passport = session.passport();

    let raw = if session.is_settled() {
        session
            .matrix()
            .and_then(|m| m.requirement(passport.as_str(), destination.as_str()))
    } else {
        None
    };

    let category = classify::classify(raw);
    let facts = session
        .facts()
        .and_then(|f| f.get(destination.as_str()))
        .cloned()
        .unwrap_or_else(CountryFacts::empty);
    let flight = flight_link(session.city(), facts.capital_city());

    Resolution::Selected(ResolvedView {
        destination: destination.clone(),
        passport: passport.clone(),
        category,
        color: classify::color_of(category).to_string(),
        label: classify::label_of(raw),
        display_label: classify::display_label(raw),
        free_days: raw.and_then(|r| r.free_days()),
        flight,
        facts,
    })
}

/// Google Flights search, omitted when either city is missing
pub fn flight_link(origin: Option<&str>, destination: Option<&str>) -> Option<FlightLink> {
    let origin = origin.map(str::trim).filter(|s| !s.is_empty())?;
    let destination = destination.map(str::trim).filter(|s| !s.is_empty())?;
    let query = format!("Flights from {} to {}", origin, destination);
    let url = Url::parse_with_params(FLIGHT_SEARCH_URL, &[("q", query.as_str())]).ok()?;

    Some(FlightLink {
        origin: origin.to_string(),
        destination: destination.to_string(),
        url: url.into(),
    })
}

/// Color callback for the rendering surface
pub fn feature_style(session: &Session, key: Option<&CountryKey>) -> FeatureStyle {
    match key {
        Some(key) if session.is_settled() && key == session.passport() => FeatureStyle {
            color: HOME_COLOR.to_string(),
            label: HOME_LABEL.to_string(),
        },
        Some(key) => match resolve(session, Some(key)) {
            Resolution::Selected(view) => FeatureStyle {
                color: view.color,
                label: format!("{}: {}", view.facts.name, view.display_label),
            },
            Resolution::NoSelection => unknown_style(),
        },
        None => unknown_style(),
    }
}

/// Styles for every keyed border feature currently loaded
pub fn feature_styles(session: &Session) -> BTreeMap<CountryKey, FeatureStyle> {
    session
        .borders()
        .map(|borders| {
            borders
                .keys()
                .map(|key| (key.clone(), feature_style(session, Some(key))))
                .collect()
        })
        .unwrap_or_default()
}

fn unknown_style() -> FeatureStyle {
    FeatureStyle {
        color: UNKNOWN_COLOR.to_string(),
        label: UNKNOWN_LABEL.to_string(),
    }
}
