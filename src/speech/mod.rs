//! Speech playback: engine abstraction and the playback state machine.
//!
//! # Architecture
//!
//! ```text
//!   TourOrchestrator
//!        │ speak / pause / resume / stop
//!        ▼
//!   PlaybackController ──commands──▶ SpeechEngine (exclusively owned)
//!        ▲                                │
//!        └──────── EngineEvent (mpsc) ◀────┘
//!                  started / finished / paused / continued / cancelled / failed
//! ```
//!
//! The controller's `is_speaking` / `is_paused` flags change only when an
//! engine event arrives; commands never assert their own outcome.

pub mod command;
pub mod controller;

pub use command::{split_sentences, CommandSpeechEngine};
pub use controller::{PlaybackController, PlaybackState};

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Engine events
// ---------------------------------------------------------------------------

/// Identifies one utterance handed to an engine.
pub type UtteranceId = u64;

/// What happened to an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    Started,
    Finished,
    Paused,
    Continued,
    Cancelled,
    /// The engine could not speak; handled like a cancel.
    Failed(String),
}

/// Asynchronous notification from a [`SpeechEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub utterance: UtteranceId,
    pub kind: EngineEventKind,
}

impl EngineEvent {
    pub fn new(utterance: UtteranceId, kind: EngineEventKind) -> Self {
        Self { utterance, kind }
    }
}

/// Sending half the engine reports through.
pub type EngineEventSink = mpsc::UnboundedSender<EngineEvent>;

// ---------------------------------------------------------------------------
// SpeechEngine trait
// ---------------------------------------------------------------------------

/// An external text-to-speech engine.
///
/// Commands return immediately; outcomes arrive later as [`EngineEvent`]s on
/// the sink installed with [`subscribe`](SpeechEngine::subscribe).
/// `is_speaking` / `is_paused` report the engine's own live status and are
/// what the controller's guards consult.
pub trait SpeechEngine: Send {
    /// Install the event sink.  Called once, by the controller.
    fn subscribe(&mut self, sink: EngineEventSink);

    /// Begin a new utterance and return its id.
    fn speak(&mut self, text: &str) -> UtteranceId;

    /// Pause the current utterance at the next word boundary.
    fn pause_at_word_boundary(&mut self);

    /// Continue a paused utterance.
    fn continue_speaking(&mut self);

    /// Cancel the current utterance at once.
    fn stop_immediately(&mut self);

    fn is_speaking(&self) -> bool;

    fn is_paused(&self) -> bool;
}

// Compile-time assertion: Box<dyn SpeechEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechEngine>) {}
};

// ---------------------------------------------------------------------------
// ScriptedSpeechEngine (tests)
// ---------------------------------------------------------------------------

/// Deterministic engine that emits the matching event synchronously for
/// every command and logs what it was asked to do.
///
/// Natural completion is triggered explicitly with [`finish`](Self::finish)
/// and engine faults with [`fail`](Self::fail).
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct ScriptedSpeechEngine {
    inner: std::sync::Arc<std::sync::Mutex<ScriptedEngineState>>,
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedEngineState {
    sink: Option<EngineEventSink>,
    next_id: UtteranceId,
    current: Option<UtteranceId>,
    speaking: bool,
    paused: bool,
    /// Every command in order, e.g. `speak:hello`, `pause`, `stop`.
    pub log: Vec<String>,
}

#[cfg(test)]
impl ScriptedSpeechEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|l| l.strip_prefix("speak:").map(str::to_string))
            .collect()
    }

    /// Simulate the current utterance ending naturally.
    pub fn finish(&self) {
        let mut st = self.inner.lock().unwrap();
        if let Some(id) = st.current.take() {
            st.speaking = false;
            st.paused = false;
            st.emit(id, EngineEventKind::Finished);
        }
    }

    /// Simulate an engine fault on the current utterance.
    pub fn fail(&self, reason: &str) {
        let mut st = self.inner.lock().unwrap();
        if let Some(id) = st.current.take() {
            st.speaking = false;
            st.paused = false;
            st.emit(id, EngineEventKind::Failed(reason.to_string()));
        }
    }
}

#[cfg(test)]
impl ScriptedEngineState {
    fn emit(&self, id: UtteranceId, kind: EngineEventKind) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(EngineEvent::new(id, kind));
        }
    }
}

#[cfg(test)]
impl SpeechEngine for ScriptedSpeechEngine {
    fn subscribe(&mut self, sink: EngineEventSink) {
        self.inner.lock().unwrap().sink = Some(sink);
    }

    fn speak(&mut self, text: &str) -> UtteranceId {
        let mut st = self.inner.lock().unwrap();
        st.log.push(format!("speak:{text}"));
        st.next_id += 1;
        let id = st.next_id;
        st.current = Some(id);
        st.speaking = true;
        st.paused = false;
        st.emit(id, EngineEventKind::Started);
        id
    }

    fn pause_at_word_boundary(&mut self) {
        let mut st = self.inner.lock().unwrap();
        st.log.push("pause".into());
        if let Some(id) = st.current {
            st.paused = true;
            st.emit(id, EngineEventKind::Paused);
        }
    }

    fn continue_speaking(&mut self) {
        let mut st = self.inner.lock().unwrap();
        st.log.push("continue".into());
        if let Some(id) = st.current {
            st.paused = false;
            st.emit(id, EngineEventKind::Continued);
        }
    }

    fn stop_immediately(&mut self) {
        let mut st = self.inner.lock().unwrap();
        st.log.push("stop".into());
        if let Some(id) = st.current.take() {
            st.speaking = false;
            st.paused = false;
            st.emit(id, EngineEventKind::Cancelled);
        }
    }

    fn is_speaking(&self) -> bool {
        self.inner.lock().unwrap().speaking
    }

    fn is_paused(&self) -> bool {
        self.inner.lock().unwrap().paused
    }
}
