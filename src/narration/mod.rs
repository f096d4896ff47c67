//! Narration module: place context → prompt → language-model text.
//!
//! This module provides:
//! * [`Narrator`]: async trait implemented by all narration backends.
//! * [`NarrationClient`]: messages-API client (resolve, prompt, one request).
//! * [`NarratorFactory`] / [`HttpNarratorFactory`]: build a client per key.
//! * [`PromptBuilder`]: the tour-guide prompt with its location block.
//! * [`NarrationError`]: error variants, user-facing via `Display`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use past_port::config::AppConfig;
//! use past_port::geocode::{NominatimGeocoder, PlaceResolver};
//! use past_port::location::Position;
//! use past_port::narration::{NarrationClient, Narrator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let resolver = PlaceResolver::new(Arc::new(NominatimGeocoder::from_config(&config.geocoder)));
//!     let client = NarrationClient::new("sk-ant-…", &config.narration, resolver);
//!
//!     let text = client.narrate(&Position::now(40.7580, -73.9855)).await.unwrap();
//!     println!("{text}");
//! }
//! ```

pub mod client;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{
    interpret_response, ContentBlock, HttpNarratorFactory, MessagesResponse, NarrationClient,
    NarrationError, Narrator, NarratorFactory,
};
pub use prompt::PromptBuilder;

#[cfg(test)]
pub use client::{ScriptedNarrator, ScriptedNarratorFactory, ScriptedReply};
