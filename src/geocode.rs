//! Location helpers: great-circle distance and reverse geocoding
//!
//! Reverse geocoding uses a Nominatim compatible endpoint. A failing lookup
//! never fails a poll; it just produces no address.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

use crate::config::GeocodingConfig;
use crate::error::{MirrorError, Result};
use crate::logging::get_logger;

/// Mean earth radius in km (IUGG)
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance in km between two lat/lon pairs in degrees
pub fn distance_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Round a distance in km to whole meters
pub fn round_to_meters(km: f64) -> f64 {
    (km * 1000.0).round() / 1000.0
}

/// Reverse geocoding seam
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Postal address for a position, `None` when unknown or on failure
    async fn reverse(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// Nominatim reverse geocoding client
pub struct NominatimGeocoder {
    http: Client,
    base_url: String,
    user_agent: String,
    language: String,
    logger: crate::logging::StructuredLogger,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig, language: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MirrorError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            language: language.to_string(),
            logger: get_logger("geocode"),
        })
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>> {
        let url = format!("{}/reverse", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", "18".to_string()),
            ])
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, &self.language)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(MirrorError::geocoding(format!(
                "Reverse lookup returned {}",
                resp.status()
            )));
        }
        let body: ReverseResponse = resp.json().await?;
        if let Some(err) = body.error {
            return Err(MirrorError::geocoding(err));
        }
        Ok(body.display_name.filter(|s| !s.trim().is_empty()))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Option<String> {
        match self.lookup(latitude, longitude).await {
            Ok(address) => address,
            Err(e) => {
                self.logger.error(&format!("Address lookup failed: {}", e));
                None
            }
        }
    }
}
