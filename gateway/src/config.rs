//! Gateway configuration from environment variables

use crate::feeds::FeedSource;
use crate::geocode::GeocoderProvider;
use country_data::{CountryKey, DEFAULT_CITY};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 18700;

pub const DEFAULT_BORDERS_URL: &str =
    "https://raw.githubusercontent.com/holtzy/D3-graph-gallery/master/DATA/world.geojson";

pub const DEFAULT_FACTS_URL: &str = "https://restcountries.com/v3.1/all?fields=cca3,cca2,name,population,capital,currencies,languages,flags,region";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub borders: FeedSource,
    pub matrix: FeedSource,
    pub facts: FeedSource,
    pub geocoder: GeocoderProvider,
    /// Per-request budget for feed downloads
    pub feed_timeout_secs: u64,
    pub default_passport: CountryKey,
    pub default_city: Option<String>,
    /// Web UI build served at `/` when the directory exists
    pub static_dir: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            borders: FeedSource::parse(DEFAULT_BORDERS_URL),
            matrix: FeedSource::bundled_matrix(),
            facts: FeedSource::parse(DEFAULT_FACTS_URL),
            geocoder: GeocoderProvider::BigDataCloud,
            feed_timeout_secs: 30,
            default_passport: CountryKey::default_passport(),
            default_city: Some(DEFAULT_CITY.to_string()),
            static_dir: PathBuf::from("ui/dist"),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; unparseable values fall back to defaults
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = var("VISA_GATEWAY_PORT").or_else(|| var("PORT")) {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!("Ignoring invalid port {:?}", port),
            }
        }
        if let Some(url) = var("VISA_BORDERS_URL") {
            config.borders = FeedSource::parse(&url);
        }
        if let Some(url) = var("VISA_MATRIX_URL") {
            config.matrix = match url.trim() {
                "bundled" => FeedSource::bundled_matrix(),
                url => FeedSource::parse(url),
            };
        }
        if let Some(url) = var("VISA_FACTS_URL") {
            config.facts = FeedSource::parse(&url);
        }
        if let Some(name) = var("VISA_GEOCODER") {
            match name.parse() {
                Ok(provider) => config.geocoder = provider,
                Err(e) => warn!("{}; using {:?}", e, config.geocoder),
            }
        }
        if let Some(secs) = var("VISA_FEED_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) if secs > 0 => config.feed_timeout_secs = secs,
                _ => warn!("Ignoring invalid feed timeout {:?}", secs),
            }
        }
        if let Some(code) = var("VISA_DEFAULT_PASSPORT") {
            match CountryKey::parse(&code) {
                Some(key) => config.default_passport = key,
                None => warn!("Ignoring invalid default passport {:?}", code),
            }
        }
        if let Some(city) = var("VISA_DEFAULT_CITY") {
            config.default_city = Some(city).filter(|c| !c.trim().is_empty());
        }
        if let Some(dir) = var("VISA_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[]));
        assert_eq!(config.port, 18700);
        assert_eq!(config.default_passport.as_str(), "USA");
        assert_eq!(config.default_city.as_deref(), Some("New York"));
        assert_eq!(config.geocoder, GeocoderProvider::BigDataCloud);
        assert!(matches!(config.borders, FeedSource::Http(_)));
        assert_eq!(config.matrix, FeedSource::bundled_matrix());
    }

    #[test]
    fn test_matrix_source_forms() {
        let config = GatewayConfig::from_lookup(lookup(&[("VISA_MATRIX_URL", "data/matrix.json")]));
        assert_eq!(config.matrix, FeedSource::File(PathBuf::from("data/matrix.json")));
        let config = GatewayConfig::from_lookup(lookup(&[("VISA_MATRIX_URL", " bundled ")]));
        assert_eq!(config.matrix, FeedSource::bundled_matrix());
    }

    #[test]
    fn test_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("VISA_GEOCODER", "disabled"),
            ("VISA_DEFAULT_PASSPORT", "egy"),
            ("VISA_DEFAULT_CITY", "Cairo"),
            ("VISA_MATRIX_URL", "https://example.org/matrix.json"),
            ("VISA_FEED_TIMEOUT_SECS", "12"),
        ]));
        assert_eq!(config.port, 9000);
        assert_eq!(config.geocoder, GeocoderProvider::Disabled);
        assert_eq!(config.default_passport.as_str(), "EGY");
        assert_eq!(config.default_city.as_deref(), Some("Cairo"));
        assert!(matches!(config.matrix, FeedSource::Http(_)));
        assert_eq!(config.feed_timeout_secs, 12);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_gateway_port_wins_over_port() {
        let config =
            GatewayConfig::from_lookup(lookup(&[("PORT", "9000"), ("VISA_GATEWAY_PORT", "9100")]));
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("VISA_GEOCODER", "carrier-pigeon"),
            ("VISA_DEFAULT_PASSPORT", "USAX"),
            ("VISA_FEED_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.geocoder, GeocoderProvider::BigDataCloud);
        assert_eq!(config.default_passport.as_str(), "USA");
        assert_eq!(config.feed_timeout_secs, 30);
    }
}
