//! Playback controller: the four-state speech state machine.
//!
//! ```text
//! any ──speak──▶ Speaking
//! Speaking ──pause──▶ Paused ──resume──▶ Speaking
//! any ──stop──▶ Stopped
//! Speaking / Paused ──finished──▶ Idle
//! ```
//!
//! Guards consult the engine's live status; the observable flags follow the
//! engine's events.  Events for any utterance other than the most recent one
//! are ignored, so a replaced utterance can never clobber the flags of its
//! successor.

use tokio::sync::mpsc;

use super::{EngineEvent, EngineEventKind, SpeechEngine, UtteranceId};

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
    Paused,
    /// Like `Idle`, but reached by an explicit stop.
    Stopped,
}

impl PlaybackState {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Speaking => "Speaking",
            PlaybackState::Paused => "Paused",
            PlaybackState::Stopped => "Stopped",
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// Owns the speech engine and tracks playback state from its events.
pub struct PlaybackController {
    engine: Box<dyn SpeechEngine>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    current: Option<UtteranceId>,
    is_speaking: bool,
    is_paused: bool,
    stopped: bool,
}

impl PlaybackController {
    /// Take ownership of `engine` and subscribe to its events.
    pub fn new(mut engine: Box<dyn SpeechEngine>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        engine.subscribe(tx);
        Self {
            engine,
            events: rx,
            current: None,
            is_speaking: false,
            is_paused: false,
            stopped: false,
        }
    }

    // -----------------------------------------------------------------------
    // Observable state
    // -----------------------------------------------------------------------

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn state(&self) -> PlaybackState {
        match (self.is_speaking, self.is_paused) {
            (true, true) => PlaybackState::Paused,
            (true, false) => PlaybackState::Speaking,
            _ if self.stopped => PlaybackState::Stopped,
            _ => PlaybackState::Idle,
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Cancel whatever is playing and start `text`.
    pub fn speak(&mut self, text: &str) {
        if self.engine.is_speaking() {
            self.engine.stop_immediately();
        }
        self.stopped = false;
        let id = self.engine.speak(text);
        log::debug!("playback: utterance {id} queued ({} chars)", text.len());
        self.current = Some(id);
    }

    /// Pause at the next word boundary.  No-op unless speaking.
    pub fn pause(&mut self) {
        if self.engine.is_speaking() && !self.engine.is_paused() {
            self.engine.pause_at_word_boundary();
        }
    }

    /// Continue a paused utterance.  No-op unless paused.
    pub fn resume(&mut self) {
        if self.engine.is_paused() {
            self.engine.continue_speaking();
        }
    }

    /// Cancel immediately.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.engine.stop_immediately();
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    // -----------------------------------------------------------------------
    // Engine events
    // -----------------------------------------------------------------------

    /// Wait for the next engine event.  Cancel-safe; use inside `select!`.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    /// Apply every event already queued.  Returns `true` if any was applied.
    pub fn pump_events(&mut self) -> bool {
        let mut applied = false;
        while let Ok(event) = self.events.try_recv() {
            applied |= self.apply_event(event);
        }
        applied
    }

    /// Update the flags from one engine event.  Returns `false` when the
    /// event belonged to a superseded utterance and was ignored.
    pub fn apply_event(&mut self, event: EngineEvent) -> bool {
        if self.current != Some(event.utterance) {
            log::trace!("playback: ignoring {:?} for stale utterance", event.kind);
            return false;
        }

        match event.kind {
            EngineEventKind::Started => {
                self.is_speaking = true;
                self.is_paused = false;
            }
            EngineEventKind::Finished => {
                self.is_speaking = false;
                self.is_paused = false;
                self.stopped = false;
            }
            EngineEventKind::Paused => self.is_paused = true,
            EngineEventKind::Continued => self.is_paused = false,
            EngineEventKind::Cancelled => {
                self.is_speaking = false;
                self.is_paused = false;
            }
            EngineEventKind::Failed(reason) => {
                log::warn!("playback: speech engine failed: {reason}");
                self.is_speaking = false;
                self.is_paused = false;
            }
        }
        log::debug!("playback: now {}", self.state().label());
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::ScriptedSpeechEngine;

    fn controller() -> (PlaybackController, ScriptedSpeechEngine) {
        let engine = ScriptedSpeechEngine::new();
        let ctl = PlaybackController::new(Box::new(engine.clone()));
        (ctl, engine)
    }

    #[test]
    fn starts_idle() {
        let (ctl, _) = controller();
        assert_eq!(ctl.state(), PlaybackState::Idle);
        assert!(!ctl.is_speaking());
        assert!(!ctl.is_paused());
    }

    #[test]
    fn speak_becomes_speaking_once_engine_confirms() {
        let (mut ctl, engine) = controller();
        ctl.speak("hello");
        // Flags wait for the engine's event.
        assert_eq!(ctl.state(), PlaybackState::Idle);

        assert!(ctl.pump_events());
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(engine.spoken(), vec!["hello"]);
    }

    #[test]
    fn pause_while_idle_is_noop() {
        let (mut ctl, engine) = controller();
        ctl.pause();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Idle);
        assert!(!ctl.is_paused());
        assert!(engine.log().is_empty());
    }

    #[test]
    fn resume_while_not_paused_is_noop() {
        let (mut ctl, engine) = controller();
        ctl.speak("x");
        ctl.pump_events();
        ctl.resume();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(engine.log(), vec!["speak:x"]);
    }

    #[test]
    fn pause_and_resume_cycle() {
        let (mut ctl, _) = controller();
        ctl.speak("a long story");
        ctl.pump_events();

        ctl.pause();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Paused);
        assert!(ctl.is_speaking());
        assert!(ctl.is_paused());

        ctl.resume();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert!(!ctl.is_paused());
    }

    #[test]
    fn toggle_pause_alternates() {
        let (mut ctl, engine) = controller();
        ctl.speak("story");
        ctl.pump_events();

        ctl.toggle_pause();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Paused);

        ctl.toggle_pause();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Speaking);

        assert_eq!(engine.log(), vec!["speak:story", "pause", "continue"]);
    }

    #[test]
    fn toggle_while_idle_does_nothing() {
        let (mut ctl, engine) = controller();
        ctl.toggle_pause();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Idle);
        assert!(engine.log().is_empty());
    }

    #[test]
    fn stop_reaches_stopped() {
        let (mut ctl, _) = controller();
        ctl.speak("story");
        ctl.pump_events();

        ctl.stop();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Stopped);
        assert!(!ctl.is_speaking());
        assert!(!ctl.is_paused());
    }

    #[test]
    fn stop_while_paused_clears_both_flags() {
        let (mut ctl, _) = controller();
        ctl.speak("story");
        ctl.pause();
        ctl.pump_events();
        ctl.stop();
        ctl.pump_events();
        assert!(!ctl.is_speaking());
        assert!(!ctl.is_paused());
    }

    #[test]
    fn natural_finish_returns_to_idle() {
        let (mut ctl, engine) = controller();
        ctl.speak("short");
        ctl.pump_events();
        engine.finish();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Idle);
    }

    #[test]
    fn speak_after_stop_clears_stopped() {
        let (mut ctl, _) = controller();
        ctl.speak("one");
        ctl.stop();
        ctl.speak("two");
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Speaking);
    }

    #[test]
    fn second_speak_replaces_first() {
        let (mut ctl, engine) = controller();
        ctl.speak("x");
        ctl.speak("y");
        ctl.pump_events();

        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(engine.log(), vec!["speak:x", "stop", "speak:y"]);

        // Only "y" is live: finishing it ends playback entirely.
        engine.finish();
        ctl.pump_events();
        assert_eq!(ctl.state(), PlaybackState::Idle);
    }

    #[test]
    fn stale_events_are_ignored() {
        let (mut ctl, _) = controller();
        ctl.speak("x");
        ctl.speak("y");
        ctl.pump_events();

        // A late cancel for the first utterance must not silence the second.
        assert!(!ctl.apply_event(EngineEvent::new(1, EngineEventKind::Cancelled)));
        assert!(ctl.is_speaking());
    }

    #[test]
    fn engine_failure_is_treated_as_cancel() {
        let (mut ctl, engine) = controller();
        ctl.speak("x");
        ctl.pump_events();
        engine.fail("audio device vanished");
        ctl.pump_events();
        assert!(!ctl.is_speaking());
        assert!(!ctl.is_paused());
        assert_eq!(ctl.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn next_event_delivers_queued_events() {
        let (mut ctl, _) = controller();
        ctl.speak("x");
        let event = ctl.next_event().await.unwrap();
        assert_eq!(event.kind, EngineEventKind::Started);
        assert!(ctl.apply_event(event));
        assert!(ctl.is_speaking());
    }

    #[test]
    fn labels() {
        assert_eq!(PlaybackState::Idle.label(), "Idle");
        assert_eq!(PlaybackState::Speaking.label(), "Speaking");
        assert_eq!(PlaybackState::Paused.label(), "Paused");
        assert_eq!(PlaybackState::Stopped.label(), "Stopped");
    }
}
