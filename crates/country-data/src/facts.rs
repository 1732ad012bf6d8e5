//! Country facts table
//!
//! Normalizes REST Countries v3.1 records into [`CountryFacts`] keyed by
//! [`CountryKey`]. Provider shapes vary per field (capital is a list,
//! currencies an object keyed by code, languages an object of names), so
//! records are read field by field from JSON values and anything malformed
//! falls back to "N/A" instead of rejecting the record.

use crate::{CountryKey, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Display facts for one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryFacts {
    pub name: String,
    pub population: Option<u64>,
    pub capital: String,
    pub currency: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// ISO 3166-1 alpha-2 code as reported by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso2: Option<String>,
}

impl CountryFacts {
    /// Facts for a destination the provider does not know
    pub fn empty() -> Self {
        Self {
            name: "Unknown".to_string(),
            population: None,
            capital: NOT_AVAILABLE.to_string(),
            currency: NOT_AVAILABLE.to_string(),
            language: NOT_AVAILABLE.to_string(),
            flag_url: None,
            region: None,
            iso2: None,
        }
    }

    /// Capital city, if the provider named one
    pub fn capital_city(&self) -> Option<&str> {
        let capital = self.capital.trim();
        (!capital.is_empty() && capital != NOT_AVAILABLE).then_some(capital)
    }

    /// Population with thousands separators, or "N/A"
    pub fn population_display(&self) -> String {
        match self.population {
            Some(population) => group_thousands(population),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    pub fn region_display(&self) -> &str {
        self.region.as_deref().unwrap_or("Unknown")
    }
}

/// Immutable `CountryKey -> CountryFacts` snapshot for a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactsTable {
    countries: HashMap<CountryKey, CountryFacts>,
}

impl FactsTable {
    /// Build from raw provider records. Records without a usable key are skipped.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut countries = HashMap::new();
        let mut skipped = 0usize;
        let mut duplicates = 0usize;

        for record in records {
            let Some((key, facts)) = parse_record(record) else {
                skipped += 1;
                continue;
            };
            if countries.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            countries.insert(key, facts);
        }

        debug!(
            "Built facts table: {} countries ({} skipped without key, {} duplicates)",
            countries.len(),
            skipped,
            duplicates
        );

        Self { countries }
    }

    pub fn get(&self, key: &str) -> Option<&CountryFacts> {
        self.countries.get(key)
    }

    /// Provider's common name for a key
    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.get(key).map(|f| f.name.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.countries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CountryKey> {
        self.countries.keys()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

fn parse_record(record: &Value) -> Option<(CountryKey, CountryFacts)> {
    let key = record.get("cca3").and_then(Value::as_str).and_then(CountryKey::parse)?;

    let name = record
        .get("name")
        .and_then(|n| n.get("common").and_then(Value::as_str).or_else(|| n.as_str()))
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| key.to_string());

    let capital = match record.get("capital") {
        Some(Value::Array(list)) => list.first().and_then(Value::as_str),
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    };

    let currency = record
        .get("currencies")
        .and_then(Value::as_object)
        .and_then(|m| m.keys().next())
        .map(String::as_str);

    let language = record
        .get("languages")
        .and_then(Value::as_object)
        .and_then(|m| m.values().next())
        .and_then(Value::as_str);

    let flag_url = record.get("flags").and_then(|flags| {
        flags
            .get("png")
            .and_then(Value::as_str)
            .or_else(|| flags.get("svg").and_then(Value::as_str))
            .map(str::to_string)
    });

    let facts = CountryFacts {
        name,
        population: record.get("population").and_then(Value::as_u64),
        capital: or_not_available(capital),
        currency: or_not_available(currency),
        language: or_not_available(language),
        flag_url,
        region: record.get("region").and_then(Value::as_str).map(str::to_string),
        iso2: record.get("cca2").and_then(Value::as_str).map(str::to_string),
    };

    Some((key, facts))
}

fn or_not_available(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
