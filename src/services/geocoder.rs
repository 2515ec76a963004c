use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{GeocoderConfig, GeocoderProvider};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    Status(u16),

    #[error("Unexpected geocoder response: {0}")]
    Malformed(String),
}

/// Resolved point plus the address parts stored alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub longitude: f64,
    pub latitude: f64,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when nothing matches the address
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError>;
}

/// Used when no provider is configured; every address is unknown
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        debug!("Geocoder disabled; leaving '{}' unresolved", address);
        Ok(None)
    }
}

pub struct MapQuestGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// First location of the first result, if it carries coordinates
    pub fn parse_response(body: &Value) -> Result<Option<GeoLocation>, GeocodeError> {
        let results = body
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| GeocodeError::Malformed("missing results".to_string()))?;

        let Some(loc) = results
            .first()
            .and_then(|r| r.get("locations"))
            .and_then(Value::as_array)
            .and_then(|l| l.first())
        else {
            return Ok(None);
        };

        let lat_lng = loc.get("latLng");
        let (Some(latitude), Some(longitude)) = (
            lat_lng.and_then(|l| l.get("lat")).and_then(Value::as_f64),
            lat_lng.and_then(|l| l.get("lng")).and_then(Value::as_f64),
        ) else {
            return Ok(None);
        };

        let text = |key: &str| {
            loc.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let street = text("street");
        let city = text("adminArea5");
        let state = text("adminArea3");
        let zipcode = text("postalCode");
        let country = text("adminArea1");

        let state_zip = [state.as_deref(), zipcode.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let parts: Vec<&str> = [street.as_deref(), city.as_deref(), Some(state_zip.as_str()), country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        let formatted_address = (!parts.is_empty()).then(|| parts.join(", "));

        Ok(Some(GeoLocation {
            longitude,
            latitude,
            formatted_address,
            street,
            city,
            state,
            zipcode,
            country,
        }))
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        Self::parse_response(&body)
    }
}

pub fn build_geocoder(config: &GeocoderConfig) -> Arc<dyn Geocoder> {
    match (config.provider, config.api_key.as_deref()) {
        (GeocoderProvider::MapQuest, Some(key)) if !key.is_empty() => {
            Arc::new(MapQuestGeocoder::new(config.base_url.clone(), key))
        }
        (GeocoderProvider::MapQuest, _) => {
            warn!("GEOCODER_PROVIDER is mapquest but GEOCODER_API_KEY is not set; geocoding disabled");
            Arc::new(DisabledGeocoder)
        }
        (GeocoderProvider::Disabled, _) => Arc::new(DisabledGeocoder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_first_location() {
        let body = json!({
            "results": [{
                "locations": [{
                    "street": "233 Bay State Rd",
                    "adminArea5": "Boston",
                    "adminArea3": "MA",
                    "adminArea1": "US",
                    "postalCode": "02215",
                    "latLng": { "lat": 42.350933, "lng": -71.103538 }
                }]
            }]
        });
        let loc = MapQuestGeocoder::parse_response(&body).unwrap().unwrap();
        assert_eq!(loc.latitude, 42.350933);
        assert_eq!(loc.longitude, -71.103538);
        assert_eq!(loc.city.as_deref(), Some("Boston"));
        assert_eq!(
            loc.formatted_address.as_deref(),
            Some("233 Bay State Rd, Boston, MA 02215, US")
        );
    }

    #[test]
    fn no_locations_is_not_an_error() {
        let body = json!({ "results": [{ "locations": [] }] });
        assert_eq!(MapQuestGeocoder::parse_response(&body).unwrap(), None);
    }

    #[test]
    fn missing_results_is_malformed() {
        assert!(matches!(
            MapQuestGeocoder::parse_response(&json!({ "info": {} })),
            Err(GeocodeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn disabled_geocoder_resolves_nothing() {
        assert_eq!(DisabledGeocoder.geocode("02118").await.unwrap(), None);
    }
}
