//! Core `Narrator` trait and the HTTP `NarrationClient`.
//!
//! `NarrationClient` resolves the position to a place context, builds the
//! tour-guide prompt and issues exactly one request to the messages API.
//! It never retries and never caches: every call is a full round trip.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NarrationConfig;
use crate::geocode::PlaceResolver;
use crate::location::Position;
use crate::narration::prompt::PromptBuilder;

// ---------------------------------------------------------------------------
// NarrationError
// ---------------------------------------------------------------------------

/// Errors that can occur while fetching a narration.
///
/// `Display` is the user-facing message shown by the tour UI.
#[derive(Debug, Error)]
pub enum NarrationError {
    /// The endpoint URL could not be built.
    #[error("Invalid API URL")]
    InvalidEndpoint,

    /// The server answered with something that is not a messages response.
    #[error("Invalid response from server")]
    InvalidResponse,

    /// Non-200 status; `message` is the raw response body.
    #[error("API error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    /// 200 but no usable text block.
    #[error("No content in response")]
    NoContent,

    /// DNS, connection, TLS or timeout failure.
    #[error("Network error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NarrationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            NarrationError::InvalidEndpoint
        } else if e.is_decode() {
            log::warn!("narration: undecodable response: {e}");
            NarrationError::InvalidResponse
        } else if e.is_timeout() {
            NarrationError::Transport("request timed out".into())
        } else {
            NarrationError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Narrator trait
// ---------------------------------------------------------------------------

/// Async source of narration text for a position.
///
/// Implementors must be `Send + Sync` so they can be held behind an
/// `Arc<dyn Narrator>` and moved into spawned tasks.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, position: &Position) -> Result<String, NarrationError>;
}

/// Builds a [`Narrator`] for an API key.
///
/// A client's credential never changes; a new key means a new client.
pub trait NarratorFactory: Send + Sync {
    fn build(&self, api_key: &str) -> Arc<dyn Narrator>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Body of a successful messages response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Map a status code and raw body to the narration text or a typed error.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<String, NarrationError> {
    if status != StatusCode::OK.as_u16() {
        let message = std::str::from_utf8(body)
            .map(str::to_string)
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(NarrationError::Api {
            status_code: status,
            message,
        });
    }

    let parsed: MessagesResponse = serde_json::from_slice(body).map_err(|e| {
        log::warn!("narration: cannot decode messages response: {e}");
        NarrationError::InvalidResponse
    })?;

    parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or(NarrationError::NoContent)
}

// ---------------------------------------------------------------------------
// NarrationClient
// ---------------------------------------------------------------------------

/// Calls the messages endpoint at `{base_url}/v1/messages`.
///
/// The API key is fixed for the lifetime of the client.
pub struct NarrationClient {
    client: reqwest::Client,
    config: NarrationConfig,
    api_key: String,
    resolver: PlaceResolver,
    prompt_builder: PromptBuilder,
}

impl NarrationClient {
    /// Build a client from config.
    ///
    /// The HTTP client carries the configured timeout.  A default client is
    /// used if the builder fails.
    pub fn new(api_key: &str, config: &NarrationConfig, resolver: PlaceResolver) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            api_key: api_key.to_string(),
            resolver,
            prompt_builder: PromptBuilder::new(),
        }
    }

    fn endpoint(&self) -> Result<reqwest::Url, NarrationError> {
        let raw = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        reqwest::Url::parse(&raw).map_err(|e| {
            log::error!("narration: bad endpoint {raw:?}: {e}");
            NarrationError::InvalidEndpoint
        })
    }
}

#[async_trait]
impl Narrator for NarrationClient {
    async fn narrate(&self, position: &Position) -> Result<String, NarrationError> {
        let place = self.resolver.resolve(position).await;
        let prompt = self.prompt_builder.build(&place);
        let url = self.endpoint()?;

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: [RequestMessage {
                role: "user",
                content: &prompt,
            }],
        };

        log::debug!(
            "narration: requesting {} for ({:.5}, {:.5})",
            self.config.model,
            position.latitude,
            position.longitude
        );

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        interpret_response(status, &bytes)
    }
}

/// Factory producing [`NarrationClient`]s that share one resolver.
pub struct HttpNarratorFactory {
    config: NarrationConfig,
    resolver: PlaceResolver,
}

impl HttpNarratorFactory {
    pub fn new(config: &NarrationConfig, resolver: PlaceResolver) -> Self {
        Self {
            config: config.clone(),
            resolver,
        }
    }
}

impl NarratorFactory for HttpNarratorFactory {
    fn build(&self, api_key: &str) -> Arc<dyn Narrator> {
        Arc::new(NarrationClient::new(
            api_key,
            &self.config,
            self.resolver.clone(),
        ))
    }
}

// ---------------------------------------------------------------------------
// ScriptedNarrator (tests)
// ---------------------------------------------------------------------------

/// One scripted answer: optional delay, then the result.
#[cfg(test)]
pub struct ScriptedReply {
    pub delay: std::time::Duration,
    pub result: Result<String, NarrationError>,
}

#[cfg(test)]
impl ScriptedReply {
    pub fn ok(text: &str) -> Self {
        Self {
            delay: std::time::Duration::ZERO,
            result: Ok(text.to_string()),
        }
    }

    pub fn err(error: NarrationError) -> Self {
        Self {
            delay: std::time::Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Deterministic narrator that pops replies in order and records the
/// positions it was asked about.  Runs out → `NoContent`.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedNarrator {
    replies: std::sync::Mutex<std::collections::VecDeque<ScriptedReply>>,
    pub requested: std::sync::Mutex<Vec<Position>>,
}

#[cfg(test)]
impl ScriptedNarrator {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            requested: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn narrate(&self, position: &Position) -> Result<String, NarrationError> {
        self.requested.lock().unwrap().push(*position);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(reply) => {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                reply.result
            }
            None => Err(NarrationError::NoContent),
        }
    }
}

/// Factory handing out one shared [`ScriptedNarrator`] and recording keys.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedNarratorFactory {
    pub narrator: Arc<ScriptedNarrator>,
    pub keys: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedNarratorFactory {
    pub fn new(narrator: ScriptedNarrator) -> Self {
        Self {
            narrator: Arc::new(narrator),
            keys: Default::default(),
        }
    }
}

#[cfg(test)]
impl NarratorFactory for ScriptedNarratorFactory {
    fn build(&self, api_key: &str) -> Arc<dyn Narrator> {
        self.keys.lock().unwrap().push(api_key.to_string());
        self.narrator.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
