//! Significant-movement detector.
//!
//! The first fix ever observed is always reported.  After that a fix is
//! reported only when it lies at least `threshold_meters` from the last
//! *reported* fix; suppressed fixes never move the reference point, so slow
//! drift still adds up to a report eventually.

use super::Position;

/// Default distance that counts as "the user moved".
pub const DEFAULT_THRESHOLD_METERS: f64 = 100.0;

/// Emitted by [`MovementDetector::observe`] when a fix qualifies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificantChange(pub Position);

/// Synchronous filter over the raw position stream.
#[derive(Debug, Clone)]
pub struct MovementDetector {
    threshold_meters: f64,
    last_reported: Option<Position>,
}

impl MovementDetector {
    /// Detector with the default 100 m threshold.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD_METERS)
    }

    /// Detector with a custom threshold in metres.
    pub fn with_threshold(threshold_meters: f64) -> Self {
        Self {
            threshold_meters,
            last_reported: None,
        }
    }

    pub fn threshold_meters(&self) -> f64 {
        self.threshold_meters
    }

    /// The last fix that produced a [`SignificantChange`].
    pub fn last_reported(&self) -> Option<&Position> {
        self.last_reported.as_ref()
    }

    /// Feed one fix.  Returns `Some` when it is a significant change.
    pub fn observe(&mut self, position: Position) -> Option<SignificantChange> {
        match self.last_reported {
            None => {
                log::debug!(
                    "movement: first fix ({:.5}, {:.5}) reported",
                    position.latitude,
                    position.longitude
                );
                self.last_reported = Some(position);
                Some(SignificantChange(position))
            }
            Some(last) => {
                let distance = position.distance_to(&last);
                if distance >= self.threshold_meters {
                    log::debug!("movement: moved {distance:.1} m, reporting");
                    self.last_reported = Some(position);
                    Some(SignificantChange(position))
                } else {
                    log::trace!("movement: moved {distance:.1} m, suppressed");
                    None
                }
            }
        }
    }
}

impl Default for MovementDetector {
    fn default() -> Self {
        Self::new()
    }
}
