//! Place resolver: turns a raw coordinate into a [`PlaceContext`].
//!
//! Resolution never fails outward.  When the geocoder errors or has nothing
//! to say, the context carries only the coordinates and narration proceeds
//! with those as its anchor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geocode::{Geocoder, Placemark};
use crate::location::Position;

// ---------------------------------------------------------------------------
// PlaceContext
// ---------------------------------------------------------------------------

/// Hierarchical, partially populated description of a coordinate.
///
/// `None` means "the geocoder had no data at this granularity".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceContext {
    pub street_address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub coordinates: Position,
}

impl PlaceContext {
    /// Context with nothing but the coordinates.
    pub fn coordinates_only(coordinates: Position) -> Self {
        Self {
            street_address: None,
            neighborhood: None,
            city: None,
            state: None,
            country: None,
            coordinates,
        }
    }

    /// Build from the first geocoder candidate.
    ///
    /// The street line joins house number and street name with a space,
    /// skipping whichever is missing; it is an empty string when both are.
    pub fn from_placemark(placemark: &Placemark, coordinates: Position) -> Self {
        let street = [
            placemark.sub_thoroughfare.as_deref(),
            placemark.thoroughfare.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        Self {
            street_address: Some(street),
            neighborhood: placemark.sub_locality.clone(),
            city: placemark.locality.clone(),
            state: placemark.administrative_area.clone(),
            country: placemark.country.clone(),
            coordinates,
        }
    }

    /// `true` when no field beyond the coordinates carries text.
    pub fn is_coordinates_only(&self) -> bool {
        [
            &self.street_address,
            &self.neighborhood,
            &self.city,
            &self.state,
            &self.country,
        ]
        .iter()
        .all(|f| f.as_deref().map_or(true, str::is_empty))
    }
}

// ---------------------------------------------------------------------------
// PlaceResolver
// ---------------------------------------------------------------------------

/// Wraps a [`Geocoder`] and swallows its failures.
#[derive(Clone)]
pub struct PlaceResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl PlaceResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve `position`.  Always returns a context.
    pub async fn resolve(&self, position: &Position) -> PlaceContext {
        match self.geocoder.reverse_geocode(position).await {
            Ok(placemarks) => match placemarks.first() {
                Some(first) => PlaceContext::from_placemark(first, *position),
                None => {
                    log::debug!("resolver: no candidates, using coordinates only");
                    PlaceContext::coordinates_only(*position)
                }
            },
            Err(e) => {
                log::warn!("resolver: geocoding failed ({e}); using coordinates only");
                PlaceContext::coordinates_only(*position)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
