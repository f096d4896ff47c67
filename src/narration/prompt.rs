//! Tour-guide prompt builder.
//!
//! The prompt asks for history at the finest granularity the place context
//! supports and spells out the fallback ladder: exact address, then
//! neighbourhood, then city / region, then the nearest interesting local
//! fact.  The known place fields follow, one labelled line each, with the
//! raw coordinates last as the anchor of last resort.

use std::fmt::Write as _;

use crate::geocode::PlaceContext;

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const GUIDE_INSTRUCTION: &str = "\
You are a friendly, knowledgeable local tour guide speaking to a visitor who \
is standing at the place described below.

Rules:
1. Start by naming the place you are describing so the listener knows where you mean.
2. Try the exact street address first: what happened at this building or on this block?
3. If the address has no notable history, talk about the neighborhood.
4. If the neighborhood has none either, talk about the city or region.
5. If all else fails, share the nearest interesting local fact or story.
6. Never say that there is nothing interesting here.
7. Keep it to 2-3 short paragraphs that can be spoken aloud in 30-45 seconds \
(roughly 75-110 words).
8. Write for the ear: conversational, no lists, no markdown, no headings.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds the single user message sent to the narration backend.
///
/// # Example
/// ```rust
/// use past_port::geocode::PlaceContext;
/// use past_port::location::Position;
/// use past_port::narration::PromptBuilder;
///
/// let mut place = PlaceContext::coordinates_only(Position::now(40.758, -73.9855));
/// place.city = Some("New York".into());
///
/// let prompt = PromptBuilder::new().build(&place);
/// assert!(prompt.contains("City: New York"));
/// assert!(prompt.contains("Coordinates: 40.758, -73.9855"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the prompt for `place`.
    ///
    /// Structure (in order):
    /// 1. Guide instructions
    /// 2. Location block: Street, Neighborhood, City, State/Region, Country
    ///    (each only when present and non-empty), then Coordinates
    pub fn build(&self, place: &PlaceContext) -> String {
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(GUIDE_INSTRUCTION);
        prompt.push_str("\n\nThe visitor's location:\n");
        prompt.push_str(&Self::location_block(place));
        prompt
    }

    /// The labelled location lines alone.
    pub fn location_block(place: &PlaceContext) -> String {
        let fields = [
            ("Street", &place.street_address),
            ("Neighborhood", &place.neighborhood),
            ("City", &place.city),
            ("State/Region", &place.state),
            ("Country", &place.country),
        ];

        let mut block = String::new();
        for (label, value) in fields {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                let _ = writeln!(block, "{label}: {v}");
            }
        }
        let _ = writeln!(
            block,
            "Coordinates: {}, {}",
            place.coordinates.latitude, place.coordinates.longitude
        );
        block
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
