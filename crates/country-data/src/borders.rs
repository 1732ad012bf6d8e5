//! Border polygon feed
//!
//! The engine never looks at geometry. It only reads each feature's country
//! key so the rendering surface can ask for a color per feature.

use crate::{CountryKey, DataError, Result};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson};
use serde_json::Value;
use tracing::debug;

/// Property names checked for the key, in order
const KEY_PROPERTIES: [&str; 4] = ["ISO_A3", "iso_a3", "ADM0_A3", "ISO3"];

/// Loaded border features plus the key extracted from each one
#[derive(Debug, Clone)]
pub struct BorderSet {
    collection: FeatureCollection,
    keys: Vec<Option<CountryKey>>,
}

impl BorderSet {
    pub fn from_geojson(geojson: GeoJson) -> Result<Self> {
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(DataError::UnexpectedShape(
                    "border feed must be a GeoJSON FeatureCollection",
                ))
            }
        };

        let keys: Vec<Option<CountryKey>> = collection.features.iter().map(feature_key).collect();
        let unkeyed = keys.iter().filter(|k| k.is_none()).count();
        debug!(
            "Loaded {} border features ({} without a country key)",
            keys.len(),
            unkeyed
        );

        Ok(Self { collection, keys })
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Self::from_geojson(GeoJson::from_json_value(value)?)
    }

    /// The feature collection as received, for the rendering surface
    pub fn collection(&self) -> &FeatureCollection {
        &self.collection
    }

    /// Key of each feature, in feature order
    pub fn feature_keys(&self) -> &[Option<CountryKey>] {
        &self.keys
    }

    /// Distinct keys present in the feed
    pub fn keys(&self) -> impl Iterator<Item = &CountryKey> {
        self.keys.iter().flatten()
    }

    pub fn feature_count(&self) -> usize {
        self.keys.len()
    }
}

/// Country key of a single feature, from its properties or its id
pub fn feature_key(feature: &Feature) -> Option<CountryKey> {
    KEY_PROPERTIES
        .iter()
        .find_map(|name| feature.property(name).and_then(Value::as_str).and_then(CountryKey::parse))
        .or_else(|| match &feature.id {
            Some(Id::String(id)) => CountryKey::parse(id),
            _ => None,
        })
}
