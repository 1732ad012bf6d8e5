//! Reverse geocoding for the default passport
//!
//! Uses BigDataCloud's client-side endpoint (free, no API key). Any failure
//! yields no hint and the session keeps its passport.

use crate::error::{GatewayError, Result};
use country_data::{LocationHint, GEOLOCATION_TIMEOUT};
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, warn};

pub const BIGDATACLOUD_URL: &str = "https://api.bigdatacloud.net/data/reverse-geocode-client";

/// Supported geocoding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocoderProvider {
    /// BigDataCloud (free, no API key)
    BigDataCloud,
    /// Never geocode; location requests leave the passport alone
    Disabled,
}

impl FromStr for GeocoderProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bigdatacloud" => Ok(Self::BigDataCloud),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(format!("Unknown geocoder {:?}", other)),
        }
    }
}

/// BigDataCloud reverse-geocode-client response (fields we use)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BigDataCloudResponse {
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    locality: String,
}

impl BigDataCloudResponse {
    fn into_hint(self) -> Option<LocationHint> {
        if self.country_code.trim().is_empty() {
            return None;
        }
        // Rural coordinates often have only a locality
        let city = [self.city, self.locality]
            .into_iter()
            .find(|c| !c.trim().is_empty());
        Some(LocationHint {
            code: self.country_code,
            city,
        })
    }
}

pub struct Geocoder {
    provider: GeocoderProvider,
    client: reqwest::Client,
    endpoint: String,
}

impl Geocoder {
    pub fn new(provider: GeocoderProvider) -> Result<Self> {
        Self::with_endpoint(provider, BIGDATACLOUD_URL)
    }

    pub fn with_endpoint(provider: GeocoderProvider, endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            provider,
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn provider(&self) -> GeocoderProvider {
        self.provider
    }

    /// Reverse-geocode within the geolocation budget. Failures are logged
    /// and yield `None`.
    pub async fn locate(&self, latitude: f64, longitude: f64) -> Option<LocationHint> {
        match self.try_locate(latitude, longitude).await {
            Ok(Some(hint)) => Some(hint),
            Ok(None) => {
                debug!("No country for ({:.4}, {:.4})", latitude, longitude);
                None
            }
            Err(e) => {
                warn!("Reverse geocoding failed: {}; keeping current passport", e);
                None
            }
        }
    }

    pub async fn try_locate(&self, latitude: f64, longitude: f64) -> Result<Option<LocationHint>> {
        match self.provider {
            GeocoderProvider::Disabled => Ok(None),
            GeocoderProvider::BigDataCloud => {
                let lookup = self.fetch_bigdatacloud(latitude, longitude);
                tokio::time::timeout(GEOLOCATION_TIMEOUT, lookup)
                    .await
                    .map_err(|_| {
                        GatewayError::Timeout(format!(
                            "reverse geocoding after {} seconds",
                            GEOLOCATION_TIMEOUT.as_secs()
                        ))
                    })?
            }
        }
    }

    async fn fetch_bigdatacloud(&self, latitude: f64, longitude: f64) -> Result<Option<LocationHint>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("localityLanguage", "en".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::ApiError(format!(
                "BigDataCloud returned status: {}",
                response.status()
            )));
        }

        let data: BigDataCloudResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(e.to_string()))?;

        Ok(data.into_hint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{geocode_server, silent_server};
    use serde_json::json;

    fn hint(code: &str, city: &str) -> LocationHint {
        LocationHint {
            code: code.into(),
            city: Some(city.into()),
        }
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("BigDataCloud".parse(), Ok(GeocoderProvider::BigDataCloud));
        assert_eq!(" disabled ".parse(), Ok(GeocoderProvider::Disabled));
        assert!("offline".parse::<GeocoderProvider>().is_err());
        assert!("nominatim".parse::<GeocoderProvider>().is_err());
    }

    #[test]
    fn test_response_into_hint() {
        let data: BigDataCloudResponse = serde_json::from_str(
            r#"{"countryCode": "EG", "city": "Cairo", "locality": "Zamalek", "countryName": "Egypt"}"#,
        )
        .unwrap();
        assert_eq!(data.into_hint(), Some(hint("EG", "Cairo")));
    }

    #[test]
    fn test_response_locality_fallback() {
        let data: BigDataCloudResponse =
            serde_json::from_str(r#"{"countryCode": "NO", "city": "", "locality": "Svalbard"}"#).unwrap();
        assert_eq!(data.into_hint(), Some(hint("NO", "Svalbard")));
    }

    #[test]
    fn test_open_ocean_has_no_hint() {
        let data: BigDataCloudResponse =
            serde_json::from_str(r#"{"countryCode": "", "locality": "Pacific Ocean"}"#).unwrap();
        assert_eq!(data.into_hint(), None);
    }

    #[tokio::test]
    async fn test_locate_from_provider() {
        let (endpoint, _server) = geocode_server(json!({"countryCode": "EG", "city": "Cairo"})).await;
        let geocoder = Geocoder::with_endpoint(GeocoderProvider::BigDataCloud, endpoint).unwrap();
        assert_eq!(geocoder.locate(30.0444, 31.2357).await, Some(hint("EG", "Cairo")));
    }

    #[tokio::test]
    async fn test_empty_country_code_is_no_hint() {
        let (endpoint, _server) =
            geocode_server(json!({"countryCode": "", "locality": "Atlantic Ocean"})).await;
        let geocoder = Geocoder::with_endpoint(GeocoderProvider::BigDataCloud, endpoint).unwrap();
        assert_eq!(geocoder.locate(0.0, -30.0).await, None);
    }

    #[tokio::test]
    async fn test_disabled_never_locates() {
        let geocoder = Geocoder::new(GeocoderProvider::Disabled).unwrap();
        assert_eq!(geocoder.locate(30.0444, 31.2357).await, None);
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_no_hint() {
        // Nothing listens on the discard port locally
        let geocoder =
            Geocoder::with_endpoint(GeocoderProvider::BigDataCloud, "http://127.0.0.1:9/reverse").unwrap();
        assert_eq!(geocoder.locate(30.0444, 31.2357).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_provider_times_out_at_budget() {
        let (addr, _server) = silent_server().await;
        let geocoder =
            Geocoder::with_endpoint(GeocoderProvider::BigDataCloud, format!("http://{}/reverse", addr))
                .unwrap();

        let started = tokio::time::Instant::now();
        let err = geocoder.try_locate(30.0444, 31.2357).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
        assert!(started.elapsed() >= GEOLOCATION_TIMEOUT);

        let started = tokio::time::Instant::now();
        assert_eq!(geocoder.locate(30.0444, 31.2357).await, None);
        assert!(started.elapsed() >= GEOLOCATION_TIMEOUT);
    }
}
