//! Reverse geocoding: coordinates → structured place context.
//!
//! * [`Geocoder`]: async trait over any reverse-geocoding backend.
//! * [`NominatimGeocoder`]: OpenStreetMap Nominatim over HTTP.
//! * [`PlaceResolver`]: wraps a geocoder and never fails: outages degrade
//!   to a coordinates-only [`PlaceContext`].

pub mod nominatim;
pub mod resolver;

pub use nominatim::NominatimGeocoder;
pub use resolver::{PlaceContext, PlaceResolver};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::Position;

// ---------------------------------------------------------------------------
// Placemark
// ---------------------------------------------------------------------------

/// One candidate returned by a reverse geocoder.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placemark {
    /// House number.
    pub sub_thoroughfare: Option<String>,
    /// Street name.
    pub thoroughfare: Option<String>,
    /// Neighbourhood / district.
    pub sub_locality: Option<String>,
    /// City / town.
    pub locality: Option<String>,
    /// State / region / province.
    pub administrative_area: Option<String>,
    pub country: Option<String>,
}

// ---------------------------------------------------------------------------
// GeocodeError
// ---------------------------------------------------------------------------

/// Failures of a geocoding backend.  Never leaves [`PlaceResolver`].
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Request(String),

    #[error("geocoder returned HTTP {0}")]
    Status(u16),

    #[error("cannot parse geocoder response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GeocodeError::Parse(e.to_string())
        } else {
            GeocodeError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Geocoder trait
// ---------------------------------------------------------------------------

/// Async reverse-geocoding backend.
///
/// Implementors must be `Send + Sync` so they can be shared behind an
/// `Arc<dyn Geocoder>`.  An empty list is a valid answer ("nothing here").
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(&self, position: &Position) -> Result<Vec<Placemark>, GeocodeError>;
}

// ---------------------------------------------------------------------------
// ScriptedGeocoder (tests)
// ---------------------------------------------------------------------------

/// Deterministic geocoder returning a fixed answer.
#[cfg(test)]
pub struct ScriptedGeocoder {
    placemarks: Vec<Placemark>,
    fail: bool,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedGeocoder {
    pub fn returning(placemarks: Vec<Placemark>) -> Self {
        Self {
            placemarks,
            fail: false,
            calls: Default::default(),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            placemarks: Vec::new(),
            fail: true,
            calls: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Geocoder for ScriptedGeocoder {
    async fn reverse_geocode(&self, _position: &Position) -> Result<Vec<Placemark>, GeocodeError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            Err(GeocodeError::Request("scripted outage".into()))
        } else {
            Ok(self.placemarks.clone())
        }
    }
}
