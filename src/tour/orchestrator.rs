//! Tour orchestrator: positions in, spoken narration out.
//!
//! [`TourOrchestrator`] is the single serialized context that owns every
//! piece of mutable tour state.  Front ends talk to it through
//! [`TourCommand`]s on a `tokio::sync::mpsc` channel and watch the result
//! through [`TourSnapshot`]s.
//!
//! # Flow
//!
//! ```text
//! TourCommand::Position(p)
//!   └─▶ recenter map, remember p
//!         └─▶ MovementDetector::observe(p) ──SignificantChange──▶ begin cycle N
//!               └─▶ spawn narrator.narrate(p) (bounded by timeout)   [is_loading]
//!                     ├─ cycle N still current, Ok  → narration, speak
//!                     ├─ cycle N still current, Err → error message, clear narration
//!                     └─ superseded                 → discarded
//!
//! engine events ──▶ PlaybackController ──▶ snapshot playback flags
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{Id, JoinError, JoinSet};

use crate::config::{AppConfig, CredentialStore};
use crate::location::{AuthorizationStatus, LocationTracker, MovementDetector, Position};
use crate::narration::{NarrationError, Narrator, NarratorFactory};
use crate::speech::PlaybackController;

use super::state::{MapRegion, TourSnapshot, TourStore};

/// Error shown when narration is requested before a key is configured.
pub const CONFIGURE_API_KEY_MESSAGE: &str = "Please set your Claude API key";

// ---------------------------------------------------------------------------
// TourCommand
// ---------------------------------------------------------------------------

/// Everything the outside world can ask of the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum TourCommand {
    /// Ask the position source for permission.
    Start,
    /// A raw fix from the position source.
    Position(Position),
    /// The position source's permission state changed.
    Authorization(AuthorizationStatus),
    /// The position source failed to produce a fix.
    LocationError(String),
    ToggleSpeech,
    StopSpeech,
    /// Speak the current narration again.
    Replay,
    /// Narrate the last known position regardless of movement.
    RefreshCurrentLocation,
    /// Persist a new API key and rebuild the narrator.
    SetApiKey(String),
}

/// A finished narration fetch, tagged with the cycle that started it.
struct FetchOutcome {
    cycle: u64,
    result: Result<String, NarrationError>,
}

// ---------------------------------------------------------------------------
// TourOrchestrator
// ---------------------------------------------------------------------------

pub struct TourOrchestrator {
    store: TourStore,
    detector: MovementDetector,
    playback: PlaybackController,
    factory: Arc<dyn NarratorFactory>,
    narrator: Option<Arc<dyn Narrator>>,
    credentials: Box<dyn CredentialStore>,
    tracker: Box<dyn LocationTracker>,
    last_position: Option<Position>,
    cycle: u64,
    fetches: JoinSet<FetchOutcome>,
    /// Cycle of each in-flight fetch task, for tasks that die without an outcome.
    fetch_cycles: HashMap<Id, u64>,
    /// Location failure currently shown as the error message.
    location_error: Option<String>,
    fetch_timeout: Duration,
}

impl TourOrchestrator {
    /// Build the orchestrator.  A stored API key, if any, is loaded here.
    pub fn new(
        config: &AppConfig,
        playback: PlaybackController,
        factory: Arc<dyn NarratorFactory>,
        credentials: Box<dyn CredentialStore>,
        tracker: Box<dyn LocationTracker>,
    ) -> Self {
        let narrator = match credentials.load_api_key() {
            Some(key) => {
                log::info!("tour: API key found, narration enabled");
                Some(factory.build(&key))
            }
            None => {
                log::info!("tour: no API key configured");
                None
            }
        };

        let mut snapshot = TourSnapshot::new(MapRegion::from_config(&config.map));
        snapshot.has_api_key = narrator.is_some();

        Self {
            store: TourStore::new(snapshot),
            detector: MovementDetector::with_threshold(config.movement.threshold_meters),
            playback,
            factory,
            narrator,
            credentials,
            tracker,
            last_position: None,
            cycle: 0,
            fetches: JoinSet::new(),
            fetch_cycles: HashMap::new(),
            location_error: None,
            fetch_timeout: Duration::from_secs(config.narration.timeout_secs),
        }
    }

    /// Receiver for state changes.  Stays readable after `run` returns.
    pub fn subscribe(&self) -> watch::Receiver<TourSnapshot> {
        self.store.subscribe()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Serve commands until `commands` is closed, then finish outstanding
    /// fetches and engine events before returning.
    pub async fn run(mut self, mut commands: mpsc::Receiver<TourCommand>) {
        log::info!("tour: orchestrator running");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(joined) = self.fetches.join_next_with_id(), if !self.fetches.is_empty() => {
                    self.handle_joined(joined);
                }
                Some(event) = self.playback.next_event() => {
                    self.playback.apply_event(event);
                    self.sync_playback();
                }
            }
        }

        while let Some(joined) = self.fetches.join_next_with_id().await {
            self.handle_joined(joined);
        }
        self.sync_playback();

        log::info!("tour: command channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    fn handle_command(&mut self, command: TourCommand) {
        match command {
            TourCommand::Start => self.tracker.request_permission(),
            TourCommand::Position(position) => self.handle_position(position),
            TourCommand::Authorization(status) => self.handle_authorization(status),
            TourCommand::LocationError(message) => self.handle_location_error(message),
            TourCommand::ToggleSpeech => self.playback.toggle_pause(),
            TourCommand::StopSpeech => self.playback.stop(),
            TourCommand::Replay => self.replay(),
            TourCommand::RefreshCurrentLocation => self.refresh_current_location(),
            TourCommand::SetApiKey(key) => self.set_api_key(&key),
        }
        self.sync_playback();
    }

    fn handle_position(&mut self, position: Position) {
        self.last_position = Some(position);
        let recovered = self.location_error.take();
        self.store.update(|s| {
            s.map_region = s.map_region.recentered(&position);
            if recovered.is_some() && s.error_message == recovered {
                s.error_message = None;
            }
        });

        if let Some(change) = self.detector.observe(position) {
            self.begin_cycle(change.0);
        }
    }

    fn handle_authorization(&mut self, status: AuthorizationStatus) {
        log::info!("tour: location authorization is now {status:?}");
        self.store.update(|s| s.authorization = status);

        match status {
            AuthorizationStatus::AuthorizedWhenInUse | AuthorizationStatus::AuthorizedAlways => {
                self.tracker.start_tracking()
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                self.tracker.stop_tracking()
            }
            AuthorizationStatus::NotDetermined => {}
        }
    }

    fn handle_location_error(&mut self, message: String) {
        log::warn!("tour: location source failed: {message}");
        self.store.update(|s| s.error_message = Some(message.clone()));
        self.location_error = Some(message);
    }

    fn replay(&mut self) {
        let text = self.store.snapshot().current_narration;
        if text.is_empty() {
            log::debug!("tour: nothing to replay");
            return;
        }
        self.playback.speak(&text);
    }

    fn refresh_current_location(&mut self) {
        match self.last_position {
            Some(position) => self.begin_cycle(position),
            None => log::debug!("tour: refresh requested before any position fix"),
        }
    }

    fn set_api_key(&mut self, key: &str) {
        let key = key.trim();
        if key.is_empty() {
            log::warn!("tour: ignoring empty API key");
            return;
        }

        if let Err(e) = self.credentials.save_api_key(key) {
            log::warn!("tour: could not persist API key: {e}");
        }
        self.narrator = Some(self.factory.build(key));
        log::info!("tour: API key updated, narration enabled");

        self.store.update(|s| {
            s.has_api_key = true;
            if s.error_message.as_deref() == Some(CONFIGURE_API_KEY_MESSAGE) {
                s.error_message = None;
            }
        });
    }

    // -----------------------------------------------------------------------
    // Narration cycles
    // -----------------------------------------------------------------------

    fn begin_cycle(&mut self, position: Position) {
        let Some(narrator) = self.narrator.clone() else {
            log::warn!("tour: narration requested without an API key");
            self.store
                .update(|s| s.error_message = Some(CONFIGURE_API_KEY_MESSAGE.to_string()));
            return;
        };

        self.cycle += 1;
        let cycle = self.cycle;
        log::debug!(
            "tour: cycle {cycle} for ({:.5}, {:.5})",
            position.latitude,
            position.longitude
        );

        self.store.update(|s| {
            s.is_loading = true;
            s.error_message = None;
        });

        let limit = self.fetch_timeout;
        let handle = self.fetches.spawn(async move {
            let result = match tokio::time::timeout(limit, narrator.narrate(&position)).await {
                Ok(result) => result,
                Err(_) => Err(NarrationError::Transport(format!(
                    "request timed out after {}s",
                    limit.as_secs()
                ))),
            };
            FetchOutcome { cycle, result }
        });
        self.fetch_cycles.insert(handle.id(), cycle);
    }

    fn handle_joined(&mut self, joined: Result<(Id, FetchOutcome), JoinError>) {
        match joined {
            Ok((id, outcome)) => {
                self.fetch_cycles.remove(&id);
                self.apply_outcome(outcome);
            }
            Err(e) => {
                log::error!("tour: narration task failed: {e}");
                if let Some(cycle) = self.fetch_cycles.remove(&e.id()) {
                    self.apply_outcome(FetchOutcome {
                        cycle,
                        result: Err(NarrationError::InvalidResponse),
                    });
                }
            }
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        if outcome.cycle != self.cycle {
            log::debug!(
                "tour: discarding result of cycle {} (current is {})",
                outcome.cycle,
                self.cycle
            );
            return;
        }

        match outcome.result {
            Ok(text) => {
                log::info!("tour: narration ready ({} chars)", text.len());
                self.store.update(|s| {
                    s.current_narration = text.clone();
                    s.is_loading = false;
                });
                self.playback.speak(&text);
                self.sync_playback();
            }
            Err(e) => {
                log::error!("tour: narration failed: {e}");
                self.store.update(|s| {
                    s.error_message = Some(e.to_string());
                    s.current_narration.clear();
                    s.is_loading = false;
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Apply queued engine events and mirror the controller into the snapshot.
    fn sync_playback(&mut self) {
        self.playback.pump_events();

        let playback = self.playback.state();
        let is_speaking = self.playback.is_speaking();
        let is_paused = self.playback.is_paused();

        let current = self.store.snapshot();
        if current.playback != playback
            || current.is_speaking != is_speaking
            || current.is_paused != is_paused
        {
            self.store.update(|s| {
                s.playback = playback;
                s.is_speaking = is_speaking;
                s.is_paused = is_paused;
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
