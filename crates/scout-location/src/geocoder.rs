//! Reverse geocoding against a Nominatim-compatible service.
//!
//! `GET {geocode_url}/reverse?format=jsonv2&lat={lat}&lon={lon}`
//!
//! Only `address.city` and `address.road` are consumed. A missing field falls
//! back to the "Unknown" placeholder; a failed request is an error so the
//! caller can keep its previous address.

use async_trait::async_trait;
use scout_core::config::ReporterConfig;
use scout_core::error::{ScoutError, ScoutResult};
use scout_core::{Position, ResolvedAddress, UNKNOWN_CITY, UNKNOWN_STREET};
use serde::Deserialize;
use tracing::debug;

use crate::Geocoder;

/// Nominatim reverse-geocoding client.
pub struct NominatimGeocoder {
    /// Shared HTTP client (carries the `User-Agent` Nominatim requires).
    http: reqwest::Client,
    /// Service base URL, e.g. `https://nominatim.openstreetmap.org`.
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &ReporterConfig) -> ScoutResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ScoutError::Geocode(format!("http client: {e}")))?;
        Ok(Self { http, base_url: config.geocode_url.trim_end_matches('/').to_string() })
    }

    fn reverse_url(&self, position: Position) -> String {
        format!(
            "{}/reverse?format=jsonv2&lat={}&lon={}",
            self.base_url, position.latitude, position.longitude
        )
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, position: Position) -> ScoutResult<ResolvedAddress> {
        let url = self.reverse_url(position);
        debug!("[geocode] GET {url}");

        let resp = self.http.get(&url).send().await.map_err(|e| ScoutError::Geocode(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ScoutError::Geocode(e.to_string()))?;

        if !status.is_success() {
            return Err(ScoutError::Geocode(format!("HTTP {status}: {body}")));
        }
        parse_reverse_response(&body)
    }
}

#[derive(Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    address: Option<NominatimAddress>,
    /// Set instead of `address` when nothing was found (still HTTP 200).
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    road: Option<String>,
}

/// Decode a `format=jsonv2` reverse response into an address.
pub fn parse_reverse_response(body: &str) -> ScoutResult<ResolvedAddress> {
    let parsed: NominatimReverse =
        serde_json::from_str(body).map_err(|e| ScoutError::Geocode(format!("bad response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(ScoutError::Geocode(err));
    }

    let (city, street) = match parsed.address {
        Some(a) => (a.city, a.road),
        None => (None, None),
    };
    Ok(ResolvedAddress::new(
        city.unwrap_or_else(|| UNKNOWN_CITY.to_string()),
        street.unwrap_or_else(|| UNKNOWN_STREET.to_string()),
    ))
}
