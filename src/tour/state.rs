//! Observable tour state.
//!
//! [`TourSnapshot`] is everything a front end renders: loading indicator,
//! narration text, error banner, map region and playback flags.
//! [`TourStore`] owns the `tokio::sync::watch` sender; every mutation goes
//! through [`TourStore::update`] so subscribers are notified each time.

use tokio::sync::watch;

use crate::config::MapConfig;
use crate::location::{AuthorizationStatus, Position};
use crate::speech::PlaybackState;

// ---------------------------------------------------------------------------
// MapRegion
// ---------------------------------------------------------------------------

/// Center and span (degrees) of the visible map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl MapRegion {
    pub fn from_config(config: &MapConfig) -> Self {
        Self {
            center_latitude: config.default_latitude,
            center_longitude: config.default_longitude,
            latitude_delta: config.latitude_delta,
            longitude_delta: config.longitude_delta,
        }
    }

    /// Same span, centered on `position`.
    pub fn recentered(&self, position: &Position) -> Self {
        Self {
            center_latitude: position.latitude,
            center_longitude: position.longitude,
            ..*self
        }
    }
}

impl Default for MapRegion {
    fn default() -> Self {
        Self::from_config(&MapConfig::default())
    }
}

// ---------------------------------------------------------------------------
// TourSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TourSnapshot {
    /// A narration fetch is in flight.
    pub is_loading: bool,
    /// Latest narration text; empty until one succeeds or after a failure.
    pub current_narration: String,
    pub error_message: Option<String>,
    pub map_region: MapRegion,
    pub has_api_key: bool,
    pub authorization: AuthorizationStatus,
    pub playback: PlaybackState,
    pub is_speaking: bool,
    pub is_paused: bool,
}

impl TourSnapshot {
    pub fn new(map_region: MapRegion) -> Self {
        Self {
            map_region,
            ..Self::default()
        }
    }

    /// Whether play/pause and stop controls should be active.
    ///
    /// ```
    /// use past_port::tour::TourSnapshot;
    ///
    /// let mut s = TourSnapshot::default();
    /// assert!(!s.playback_controls_enabled());
    /// s.current_narration = "Once upon a time".into();
    /// assert!(s.playback_controls_enabled());
    /// ```
    pub fn playback_controls_enabled(&self) -> bool {
        !self.current_narration.is_empty() || self.is_speaking
    }
}

// ---------------------------------------------------------------------------
// TourStore
// ---------------------------------------------------------------------------

/// Single writer of the [`TourSnapshot`] watch channel.
pub struct TourStore {
    tx: watch::Sender<TourSnapshot>,
}

impl TourStore {
    pub fn new(initial: TourSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<TourSnapshot> {
        self.tx.subscribe()
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> TourSnapshot {
        self.tx.borrow().clone()
    }

    /// Mutate in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut TourSnapshot)) {
        self.tx.send_modify(f);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
