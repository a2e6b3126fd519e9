use crate::config::toml_config::GeocoderConfig;
use crate::domain::model::GeoPoint;
use crate::domain::ports::Geocoder;
use crate::utils::error::{FinderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeoPoint> {
        let failed = |reason: String| FinderError::GeocodingFailed {
            query: query.to_string(),
            reason,
        };

        let query_trimmed = query.trim();
        if query_trimmed.is_empty() {
            return Err(failed("empty location".to_string()));
        }

        tracing::debug!("Geocoding '{}'", query_trimmed);
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query_trimmed), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| failed(format!("geocoding error: {}", e)))?;

        if !response.status().is_success() {
            return Err(failed(format!(
                "geocoding service returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable geocoding response: {}", e)))?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| failed("location not found".to_string()))?;

        let latitude: f64 = place
            .lat
            .parse()
            .map_err(|_| failed(format!("invalid latitude '{}'", place.lat)))?;
        let longitude: f64 = place
            .lon
            .parse()
            .map_err(|_| failed(format!("invalid longitude '{}'", place.lon)))?;

        Ok(GeoPoint {
            latitude,
            longitude,
        })
    }
}
