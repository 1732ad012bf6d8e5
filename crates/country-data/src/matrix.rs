//! Passport → destination visa requirement matrix

use crate::classify::RawRequirement;
use crate::facts::FactsTable;
use crate::{CountryKey, DataError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Requirement rows keyed by passport, then destination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisaMatrix {
    rows: HashMap<CountryKey, HashMap<CountryKey, RawRequirement>>,
}

/// Passport option for the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub key: CountryKey,
    pub name: String,
}

impl VisaMatrix {
    /// Load `{passport: {destination: requirement}}`.
    ///
    /// Keys that are not three letters and cells that are neither a string nor
    /// a non-negative integer are dropped; the affected pairs resolve to unknown.
    pub fn load(raw: &Value) -> Result<Self> {
        let passports = raw
            .as_object()
            .ok_or(DataError::UnexpectedShape("visa matrix must be a JSON object"))?;

        let mut rows = HashMap::with_capacity(passports.len());
        let mut dropped = 0usize;

        for (passport, row) in passports {
            let Some(passport) = CountryKey::parse(passport) else {
                dropped += 1;
                continue;
            };
            let Some(cells) = row.as_object() else {
                dropped += 1;
                continue;
            };

            let mut destinations = HashMap::with_capacity(cells.len());
            for (destination, cell) in cells {
                match (CountryKey::parse(destination), RawRequirement::from_value(cell)) {
                    (Some(destination), Some(requirement)) => {
                        destinations.insert(destination, requirement);
                    }
                    _ => dropped += 1,
                }
            }
            rows.insert(passport, destinations);
        }

        debug!("Loaded visa matrix: {} passports ({} entries dropped)", rows.len(), dropped);

        Ok(Self { rows })
    }

    /// Raw cell for a pair, if the feed has one
    pub fn requirement(&self, passport: &str, destination: &str) -> Option<&RawRequirement> {
        self.rows.get(passport)?.get(destination)
    }

    pub fn has_passport(&self, passport: &str) -> bool {
        self.rows.contains_key(passport)
    }

    pub fn passports(&self) -> impl Iterator<Item = &CountryKey> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keys covered by the matrix, named from the facts table when possible,
    /// in locale-aware display-name order.
    pub fn available_destinations(&self, facts: Option<&FactsTable>) -> Vec<Destination> {
        let mut destinations: Vec<Destination> = self
            .rows
            .keys()
            .map(|key| Destination {
                key: key.clone(),
                name: facts
                    .and_then(|f| f.display_name(key.as_str()))
                    .unwrap_or(key.as_str())
                    .to_string(),
            })
            .collect();

        destinations.sort_by(|a, b| collate(&a.name, &b.name).then_with(|| a.key.cmp(&b.key)));
        destinations
    }
}

/// Compare display names the way a reader expects: accents and case are
/// secondary to the base letters.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = a.chars().flat_map(fold).cmp(b.chars().flat_map(fold));
    primary.then_with(|| a.cmp(b))
}

/// Base letters for one character, lowercased with diacritics removed
fn fold(ch: char) -> impl Iterator<Item = char> {
    // Latin-1, Latin Extended-A and the Vietnamese horn letters; anything
    // else sorts by its lowercase form.
    let base: &'static str = match ch {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' | 'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā'
        | 'ă' | 'ą' => "a",
        'Æ' | 'æ' => "ae",
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' | 'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'Ď' | 'Đ' | 'ď' | 'đ' | 'Ð' | 'ð' => "d",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' | 'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė'
        | 'ę' | 'ě' => "e",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' | 'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ĥ' | 'Ħ' | 'ĥ' | 'ħ' => "h",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' | 'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ'
        | 'į' | 'ı' => "i",
        'Ĳ' | 'ĳ' => "ij",
        'Ĵ' | 'ĵ' => "j",
        'Ķ' | 'ķ' | 'ĸ' => "k",
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ŀ' | 'Ł' | 'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' | 'ñ' | 'ń' | 'ņ' | 'ň' | 'ŉ' => "n",
        'Ŋ' | 'ŋ' => "ng",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' | 'Ơ' | 'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø'
        | 'ō' | 'ŏ' | 'ő' | 'ơ' => "o",
        'Œ' | 'œ' => "oe",
        'Ŕ' | 'Ŗ' | 'Ř' | 'ŕ' | 'ŗ' | 'ř' => "r",
        'Ś' | 'Ŝ' | 'Ş' | 'Š' | 'ś' | 'ŝ' | 'ş' | 'š' | 'Ș' | 'ș' => "s",
        'ß' => "ss",
        'Ţ' | 'Ť' | 'Ŧ' | 'ţ' | 'ť' | 'ŧ' | 'Ț' | 'ț' => "t",
        'Þ' | 'þ' => "th",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' | 'Ư' | 'ù' | 'ú' | 'û' | 'ü' | 'ũ'
        | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' | 'ư' => "u",
        'Ŵ' | 'ŵ' => "w",
        'Ý' | 'Ÿ' | 'Ŷ' | 'ý' | 'ÿ' | 'ŷ' => "y",
        'Ź' | 'Ż' | 'Ž' | 'ź' | 'ż' | 'ž' => "z",
        _ => "",
    };
    let mut folded: Vec<char> = base.chars().collect();
    if folded.is_empty() {
        folded.extend(ch.to_lowercase());
    }
    folded.into_iter()
}
