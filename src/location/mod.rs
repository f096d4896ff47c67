//! Position values, geodesic distance and the significant-movement filter.
//!
//! * [`Position`]: one fix from the external location source.
//! * [`haversine_distance`]: great-circle distance in metres.
//! * [`MovementDetector`]: suppresses fixes until the user has moved far
//!   enough to deserve a new narration.
//! * [`LocationTracker`] / [`AuthorizationStatus`]: the control surface of
//!   the external location source that the tour orchestrator drives.

pub mod geo;
pub mod movement;

pub use geo::{haversine_distance, EARTH_RADIUS_METERS};
pub use movement::{MovementDetector, SignificantChange, DEFAULT_THRESHOLD_METERS};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A single device position fix.  Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in decimal degrees (WGS84).
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84).
    pub longitude: f64,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// A fix taken at `timestamp`.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// A fix stamped with the current time.
    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, Utc::now())
    }

    /// Great-circle distance to `other` in metres.
    pub fn distance_to(&self, other: &Position) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

// ---------------------------------------------------------------------------
// AuthorizationStatus
// ---------------------------------------------------------------------------

/// Location permission state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// Location access is blocked by policy (parental controls, MDM …).
    Restricted,
    /// The user refused access.
    Denied,
    /// Access granted while the app is in use.
    AuthorizedWhenInUse,
    /// Access granted at all times.
    AuthorizedAlways,
}

impl AuthorizationStatus {
    /// `true` for either of the authorized states.
    pub fn is_authorized(&self) -> bool {
        matches!(
            self,
            AuthorizationStatus::AuthorizedWhenInUse | AuthorizationStatus::AuthorizedAlways
        )
    }
}

// ---------------------------------------------------------------------------
// LocationTracker
// ---------------------------------------------------------------------------

/// Control surface of the external position source.
///
/// The source itself pushes [`Position`] values into the orchestrator's
/// command channel; this trait only covers the permission and tracking
/// switches the orchestrator flips in response to authorization changes.
pub trait LocationTracker: Send {
    fn request_permission(&mut self);
    fn start_tracking(&mut self);
    fn stop_tracking(&mut self);
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Counts calls so tests can assert on the orchestrator's reactions.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingTracker {
    pub calls: std::sync::Arc<std::sync::Mutex<TrackerCalls>>,
}

#[cfg(test)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackerCalls {
    pub request_permission: usize,
    pub start_tracking: usize,
    pub stop_tracking: usize,
}

#[cfg(test)]
impl LocationTracker for RecordingTracker {
    fn request_permission(&mut self) {
        self.calls.lock().unwrap().request_permission += 1;
    }

    fn start_tracking(&mut self) {
        self.calls.lock().unwrap().start_tracking += 1;
    }

    fn stop_tracking(&mut self) {
        self.calls.lock().unwrap().stop_tracking += 1;
    }
}
