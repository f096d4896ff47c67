//! OpenStreetMap Nominatim reverse geocoder.
//!
//! Calls `GET {base_url}/reverse?format=jsonv2&lat=…&lon=…&addressdetails=1`.
//! Nominatim answers with a single place (or an `error` object when nothing
//! is mapped at that point), so the candidate list holds zero or one entry.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GeocoderConfig;
use crate::geocode::{GeocodeError, Geocoder, Placemark};
use crate::location::Position;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    house_number: Option<String>,
    road: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    quarter: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl From<Address> for Placemark {
    fn from(a: Address) -> Self {
        Placemark {
            sub_thoroughfare: a.house_number,
            thoroughfare: a.road,
            sub_locality: a.neighbourhood.or(a.suburb).or(a.quarter),
            locality: a.city.or(a.town).or(a.village).or(a.hamlet),
            administrative_area: a.state,
            country: a.country,
        }
    }
}

// ---------------------------------------------------------------------------
// NominatimGeocoder
// ---------------------------------------------------------------------------

pub struct NominatimGeocoder {
    client: reqwest::Client,
    config: GeocoderConfig,
}

impl NominatimGeocoder {
    /// Build a geocoder from config.  The HTTP client carries the configured
    /// timeout and `User-Agent`.
    pub fn from_config(config: &GeocoderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, position: &Position) -> Result<Vec<Placemark>, GeocodeError> {
        let url = format!("{}/reverse", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", position.latitude.to_string()),
                ("lon", position.longitude.to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.config.language)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        if let Some(err) = body.error {
            log::debug!("geocode: nominatim has no place here ({err})");
            return Ok(Vec::new());
        }

        Ok(body.address.map(Placemark::from).into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
