//! Seed point-of-interest data.
//!
//! [`PointOfInterest`] records are read from a JSON array (by default
//! `<data dir>/past-port/seed_data.json`, see
//! [`AppPaths`](crate::config::AppPaths)).  A missing or malformed file is
//! never fatal: the catalog is simply empty.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::location::{haversine_distance, Position};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiContent {
    pub title: String,
    pub summary: String,
    pub full_story: String,
    pub image_url: String,
}

/// One annotated place, as stored in the seed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub poi_id: String,
    pub name: String,
    pub location: Coordinates,
    pub categories: Vec<String>,
    pub radius_meters: u32,
    pub content: PoiContent,
}

impl PointOfInterest {
    /// Great-circle distance from `position` to this point, in metres.
    pub fn distance_from(&self, position: &Position) -> f64 {
        haversine_distance(
            position.latitude,
            position.longitude,
            self.location.latitude,
            self.location.longitude,
        )
    }

    /// Whether `position` lies within this point's radius.
    pub fn contains(&self, position: &Position) -> bool {
        self.distance_from(position) <= f64::from(self.radius_meters)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read the seed dataset at `path`.
///
/// Returns an empty list (and logs a warning) when the file is absent or
/// does not decode.
pub fn load_seed_data(path: &Path) -> Vec<PointOfInterest> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("poi: seed data {} unavailable: {e}", path.display());
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<PointOfInterest>>(&data) {
        Ok(pois) => {
            log::info!("poi: loaded {} points of interest", pois.len());
            pois
        }
        Err(e) => {
            log::warn!("poi: cannot decode {}: {e}", path.display());
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// PoiCatalog
// ---------------------------------------------------------------------------

/// In-memory set of points of interest with a radius lookup.
#[derive(Debug, Clone, Default)]
pub struct PoiCatalog {
    pois: Vec<PointOfInterest>,
}

impl PoiCatalog {
    pub fn new(pois: Vec<PointOfInterest>) -> Self {
        Self { pois }
    }

    /// Load from `path`; see [`load_seed_data`].
    pub fn load(path: &Path) -> Self {
        Self::new(load_seed_data(path))
    }

    pub fn all(&self) -> &[PointOfInterest] {
        &self.pois
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    /// Entries whose radius contains `position`, nearest first.
    pub fn nearby(&self, position: &Position) -> Vec<&PointOfInterest> {
        let mut hits: Vec<(f64, &PointOfInterest)> = self
            .pois
            .iter()
            .map(|poi| (poi.distance_from(position), poi))
            .filter(|(d, poi)| *d <= f64::from(poi.radius_meters))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, poi)| poi).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
