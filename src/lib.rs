//! Past Port: location-aware historical narration.
//!
//! Position fixes flow through a movement filter, a reverse geocoder and a
//! language-model narrator; the resulting text is spoken through a
//! pausable speech engine.  See [`tour::TourOrchestrator`] for the wiring.

pub mod config;
pub mod geocode;
pub mod location;
pub mod narration;
pub mod poi;
pub mod speech;
pub mod tour;

#[cfg(test)]
mod test_support;
