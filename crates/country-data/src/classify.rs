//! Visa requirement classification
//!
//! The requirement feed mixes two encodings in the same cell position:
//! a category phrase (`"e-visa"`) or a bare number of visa-free days (`90`).
//! Both collapse into [`RequirementCategory`], which drives color and label.
//!
//! | Category | Color |
//! |----------|-------|
//! | visa free | `#00ff00` |
//! | visa on arrival | `#ffff00` |
//! | eta | `#ffa500` |
//! | e-visa | `#ff8c00` |
//! | visa required | `#ff0000` |
//! | no admission | `#800000` |
//! | covid ban | `#4b0000` |
//! | unknown | `#cccccc` |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Neutral color for unknown or not-yet-loaded requirements
pub const UNKNOWN_COLOR: &str = "#cccccc";

/// Label for a missing requirement
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A requirement cell exactly as the feed stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRequirement {
    /// Number of visa-free days. Informational only; always means visa free.
    FreeDays(u64),
    /// Category phrase, ideally one of the canonical lowercase names
    Category(String),
}

impl RawRequirement {
    /// Read a matrix cell. Any non-negative integer is a day count, including
    /// integral floats such as `90.0`; values past `u64::MAX` saturate.
    /// Negative, fractional and non-scalar cells are rejected.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                        .map(|f| f as u64)
                })
                .map(Self::FreeDays),
            serde_json::Value::String(s) => Some(Self::Category(s.clone())),
            _ => None,
        }
    }

    pub fn free_days(&self) -> Option<u64> {
        match self {
            Self::FreeDays(days) => Some(*days),
            Self::Category(_) => None,
        }
    }
}

/// Normalized visa requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementCategory {
    #[serde(rename = "visa free")]
    VisaFree,
    #[serde(rename = "visa on arrival")]
    VisaOnArrival,
    #[serde(rename = "eta")]
    Eta,
    #[serde(rename = "e-visa")]
    EVisa,
    #[serde(rename = "visa required")]
    VisaRequired,
    #[serde(rename = "no admission")]
    NoAdmission,
    #[serde(rename = "covid ban")]
    CovidBan,
    #[serde(rename = "unknown")]
    Unknown,
}

impl RequirementCategory {
    /// Every category a feed can name explicitly
    pub const KNOWN: [RequirementCategory; 7] = [
        Self::VisaFree,
        Self::VisaOnArrival,
        Self::Eta,
        Self::EVisa,
        Self::VisaRequired,
        Self::NoAdmission,
        Self::CovidBan,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisaFree => "visa free",
            Self::VisaOnArrival => "visa on arrival",
            Self::Eta => "eta",
            Self::EVisa => "e-visa",
            Self::VisaRequired => "visa required",
            Self::NoAdmission => "no admission",
            Self::CovidBan => "covid ban",
            Self::Unknown => "unknown",
        }
    }

    /// Case-sensitive match against the canonical names
    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|c| c.as_str() == name)
    }

    pub fn color(&self) -> &'static str {
        color_of(*self)
    }
}

impl fmt::Display for RequirementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse a raw cell (or its absence) into a category. Never fails.
pub fn classify(raw: Option<&RawRequirement>) -> RequirementCategory {
    match raw {
        None => RequirementCategory::Unknown,
        Some(RawRequirement::FreeDays(_)) => RequirementCategory::VisaFree,
        Some(RawRequirement::Category(name)) => {
            RequirementCategory::from_name(name).unwrap_or(RequirementCategory::Unknown)
        }
    }
}

/// Fixed display color per category
pub fn color_of(category: RequirementCategory) -> &'static str {
    match category {
        RequirementCategory::VisaFree => "#00ff00",
        RequirementCategory::VisaOnArrival => "#ffff00",
        RequirementCategory::Eta => "#ffa500",
        RequirementCategory::EVisa => "#ff8c00",
        RequirementCategory::VisaRequired => "#ff0000",
        RequirementCategory::NoAdmission => "#800000",
        RequirementCategory::CovidBan => "#4b0000",
        RequirementCategory::Unknown => UNKNOWN_COLOR,
    }
}

/// Color for a category given by name; unrecognized names get the unknown color
pub fn color_of_name(name: &str) -> &'static str {
    RequirementCategory::from_name(name)
        .map(color_of)
        .unwrap_or(UNKNOWN_COLOR)
}

/// Label as stored: "visa free" for day counts, the phrase verbatim otherwise
pub fn label_of(raw: Option<&RawRequirement>) -> String {
    match raw {
        Some(RawRequirement::FreeDays(_)) => RequirementCategory::VisaFree.as_str().to_string(),
        Some(RawRequirement::Category(name)) => name.clone(),
        None => UNKNOWN_LABEL.to_string(),
    }
}

/// Title-cased label for display, independent of how the feed cased it
pub fn display_label(raw: Option<&RawRequirement>) -> String {
    title_case(&label_of(raw))
}

/// Capitalize each space- or hyphen-separated word, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch == ' ' || ch == '-' {
            out.push(ch);
            at_word_start = true;
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn category(s: &str) -> RawRequirement {
        RawRequirement::Category(s.to_string())
    }

    #[test]
    fn test_classify_absent() {
        assert_eq!(classify(None), RequirementCategory::Unknown);
        assert_eq!(label_of(None), "Unknown");
        assert_eq!(display_label(None), "Unknown");
    }

    #[test]
    fn test_canonical_names_classify_to_themselves() {
        for known in RequirementCategory::KNOWN {
            let raw = category(known.as_str());
            assert_eq!(classify(Some(&raw)), known);
            assert_ne!(color_of(known), UNKNOWN_COLOR, "{known} shares the unknown color");
            assert_eq!(color_of_name(known.as_str()), color_of(known));
        }
    }

    #[test]
    fn test_known_colors_are_distinct() {
        let mut colors: Vec<_> = RequirementCategory::KNOWN.iter().map(|c| c.color()).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), RequirementCategory::KNOWN.len());
    }

    #[test]
    fn test_documented_colors() {
        assert_eq!(color_of(RequirementCategory::VisaFree), "#00ff00");
        assert_eq!(color_of(RequirementCategory::EVisa), "#ff8c00");
        assert_eq!(color_of(RequirementCategory::CovidBan), "#4b0000");
        assert_eq!(color_of(RequirementCategory::Unknown), "#cccccc");
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(classify(Some(&category("Visa Free"))), RequirementCategory::Unknown);
        assert_eq!(classify(Some(&category("E-VISA"))), RequirementCategory::Unknown);
        assert_eq!(classify(Some(&category("visa free "))), RequirementCategory::Unknown);
    }

    #[test]
    fn test_unrecognized_vocabulary() {
        let raw = category("tourist card");
        assert_eq!(classify(Some(&raw)), RequirementCategory::Unknown);
        assert_eq!(color_of_name("tourist card"), UNKNOWN_COLOR);
        assert_eq!(label_of(Some(&raw)), "tourist card");
        assert_eq!(display_label(Some(&raw)), "Tourist Card");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("visa on arrival"), "Visa On Arrival");
        assert_eq!(title_case("e-visa"), "E-Visa");
        assert_eq!(title_case("VISA REQUIRED"), "Visa Required");
        assert_eq!(title_case("eta"), "Eta");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_raw_from_value() {
        use serde_json::json;
        assert_eq!(RawRequirement::from_value(&json!(90)), Some(RawRequirement::FreeDays(90)));
        assert_eq!(RawRequirement::from_value(&json!("eta")), Some(category("eta")));
        assert_eq!(RawRequirement::from_value(&json!(-1)), None);
        assert_eq!(RawRequirement::from_value(&json!(7.5)), None);
        assert_eq!(RawRequirement::from_value(&json!(-3.0)), None);
        assert_eq!(RawRequirement::from_value(&json!(90.0)), Some(RawRequirement::FreeDays(90)));
        assert_eq!(
            RawRequirement::from_value(&json!(5_000_000_000u64)),
            Some(RawRequirement::FreeDays(5_000_000_000))
        );
        assert_eq!(
            RawRequirement::from_value(&json!(1e20)),
            Some(RawRequirement::FreeDays(u64::MAX))
        );
        assert_eq!(RawRequirement::from_value(&json!(null)), None);
        assert_eq!(RawRequirement::from_value(&json!(["eta"])), None);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&RequirementCategory::VisaOnArrival).unwrap();
        assert_eq!(json, "\"visa on arrival\"");
        let parsed: RequirementCategory = serde_json::from_str("\"covid ban\"").unwrap();
        assert_eq!(parsed, RequirementCategory::CovidBan);
    }

    proptest! {
        #[test]
        fn fuzz_free_days_always_visa_free(days in any::<u64>()) {
            let raw = RawRequirement::FreeDays(days);
            prop_assert_eq!(classify(Some(&raw)), RequirementCategory::VisaFree);
            prop_assert_eq!(label_of(Some(&raw)), "visa free");
            prop_assert_eq!(display_label(Some(&raw)), "Visa Free");
            prop_assert_eq!(raw.free_days(), Some(days));
        }

        #[test]
        fn fuzz_any_string_is_total(name in ".*") {
            let raw = RawRequirement::Category(name.clone());
            let category = classify(Some(&raw));
            let known = RequirementCategory::from_name(&name).is_some();
            prop_assert_eq!(category == RequirementCategory::Unknown, !known);
            prop_assert_eq!(color_of_name(&name), color_of(category));
            prop_assert_eq!(label_of(Some(&raw)), name);
        }
    }
}
