//! Process-backed speech engine.
//!
//! [`CommandSpeechEngine`] speaks through an external text-to-speech program
//! such as `espeak-ng` or `say`, one child process per sentence.  Each
//! utterance runs in its own tokio task that owns the child and listens for
//! control messages:
//!
//! * pause → kill the current sentence, report `Paused`, wait
//! * continue → report `Continued`, speak that sentence again from its start
//! * stop → kill, report `Cancelled`, end the task
//!
//! Sentence starts are the finest boundary a one-shot TTS process offers, so
//! that is where a resumed utterance picks up.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::SpeechConfig;

use super::{EngineEvent, EngineEventKind, EngineEventSink, SpeechEngine, UtteranceId};

// ---------------------------------------------------------------------------
// split_sentences
// ---------------------------------------------------------------------------

/// Split narration text into sentences on `.`, `!` or `?` followed by
/// whitespace (or the end of the text).  Empty pieces are dropped.
///
/// ```
/// use past_port::speech::split_sentences;
///
/// assert_eq!(
///     split_sentences("Hello there. How are you? Fine!"),
///     vec!["Hello there.", "How are you?", "Fine!"]
/// );
/// ```
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_break = chars
            .get(i + 1)
            .map_or(true, |&(_, next)| next.is_whitespace());
        if at_break {
            let end = pos + c.len_utf8();
            let piece = text[start..end].trim();
            if !piece.is_empty() {
                sentences.push(piece.to_string());
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

// ---------------------------------------------------------------------------
// Per-utterance plumbing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Continue,
    Stop,
}

#[derive(Debug, Default)]
struct UtteranceStatus {
    speaking: AtomicBool,
    paused: AtomicBool,
}

impl UtteranceStatus {
    fn clear(&self) {
        self.speaking.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }
}

struct Active {
    control: mpsc::UnboundedSender<Control>,
    status: Arc<UtteranceStatus>,
}

enum Step {
    Exited(std::io::Result<std::process::ExitStatus>),
    Pause,
    Stop,
}

struct Utterance {
    id: UtteranceId,
    program: String,
    args: Vec<String>,
    sentences: Vec<String>,
    control: mpsc::UnboundedReceiver<Control>,
    status: Arc<UtteranceStatus>,
    sink: Option<EngineEventSink>,
}

impl Utterance {
    fn emit(&self, kind: EngineEventKind) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(EngineEvent::new(self.id, kind));
        }
    }

    fn fail(&self, reason: String) {
        self.status.clear();
        self.emit(EngineEventKind::Failed(reason));
    }

    async fn run(mut self) {
        self.emit(EngineEventKind::Started);

        let mut index = 0;
        while index < self.sentences.len() {
            let spawned = Command::new(&self.program)
                .args(&self.args)
                .arg(&self.sentences[index])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn();

            let mut child = match spawned {
                Ok(child) => child,
                Err(e) => {
                    self.fail(format!("cannot start {}: {e}", self.program));
                    return;
                }
            };

            let step = loop {
                tokio::select! {
                    exit = child.wait() => break Step::Exited(exit),
                    control = self.control.recv() => match control {
                        Some(Control::Continue) => continue,
                        Some(Control::Pause) => break Step::Pause,
                        Some(Control::Stop) | None => break Step::Stop,
                    },
                }
            };

            match step {
                Step::Exited(Ok(status)) if status.success() => index += 1,
                Step::Exited(Ok(status)) => {
                    self.fail(format!("{} exited with {status}", self.program));
                    return;
                }
                Step::Exited(Err(e)) => {
                    self.fail(format!("waiting for {} failed: {e}", self.program));
                    return;
                }
                Step::Stop => {
                    let _ = child.kill().await;
                    self.status.clear();
                    self.emit(EngineEventKind::Cancelled);
                    return;
                }
                Step::Pause => {
                    let _ = child.kill().await;
                    self.emit(EngineEventKind::Paused);
                    if !self.wait_for_continue().await {
                        self.status.clear();
                        self.emit(EngineEventKind::Cancelled);
                        return;
                    }
                    self.emit(EngineEventKind::Continued);
                    // Same index: the interrupted sentence is spoken again.
                }
            }
        }

        self.status.clear();
        self.emit(EngineEventKind::Finished);
    }

    /// `true` on continue, `false` on stop or a dropped engine.
    async fn wait_for_continue(&mut self) -> bool {
        loop {
            match self.control.recv().await {
                Some(Control::Continue) => return true,
                Some(Control::Pause) => continue,
                Some(Control::Stop) | None => return false,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommandSpeechEngine
// ---------------------------------------------------------------------------

/// Speech engine that shells out to a TTS program.
///
/// Must be driven from inside a tokio runtime; outside one every utterance
/// fails immediately.
pub struct CommandSpeechEngine {
    program: String,
    args: Vec<String>,
    sink: Option<EngineEventSink>,
    next_id: UtteranceId,
    active: Option<Active>,
}

impl CommandSpeechEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            sink: None,
            next_id: 0,
            active: None,
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }

    fn send(&self, control: Control) {
        if let Some(active) = &self.active {
            let _ = active.control.send(control);
        }
    }
}

impl SpeechEngine for CommandSpeechEngine {
    fn subscribe(&mut self, sink: EngineEventSink) {
        self.sink = Some(sink);
    }

    fn speak(&mut self, text: &str) -> UtteranceId {
        if let Some(previous) = self.active.take() {
            let _ = previous.control.send(Control::Stop);
            previous.status.clear();
        }

        self.next_id += 1;
        let id = self.next_id;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let status = Arc::new(UtteranceStatus::default());
        status.speaking.store(true, Ordering::SeqCst);

        let utterance = Utterance {
            id,
            program: self.program.clone(),
            args: self.args.clone(),
            sentences: split_sentences(text),
            control: control_rx,
            status: Arc::clone(&status),
            sink: self.sink.clone(),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(utterance.run());
            }
            Err(e) => {
                utterance.fail(format!("no async runtime: {e}"));
            }
        }

        self.active = Some(Active {
            control: control_tx,
            status,
        });
        id
    }

    fn pause_at_word_boundary(&mut self) {
        if let Some(active) = &self.active {
            active.status.paused.store(true, Ordering::SeqCst);
        }
        self.send(Control::Pause);
    }

    fn continue_speaking(&mut self) {
        if let Some(active) = &self.active {
            active.status.paused.store(false, Ordering::SeqCst);
        }
        self.send(Control::Continue);
    }

    fn stop_immediately(&mut self) {
        if let Some(active) = self.active.take() {
            active.status.clear();
            let _ = active.control.send(Control::Stop);
        }
    }

    fn is_speaking(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.status.speaking.load(Ordering::SeqCst))
    }

    fn is_paused(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.status.paused.load(Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn splits_on_terminal_punctuation() {
        assert_eq!(
            split_sentences("It opened in 1904. Crowds gathered! Why? Nobody knows"),
            vec!["It opened in 1904.", "Crowds gathered!", "Why?", "Nobody knows"]
        );
    }

    #[test]
    fn keeps_decimal_points_inside_sentences() {
        assert_eq!(
            split_sentences("The tower is 324.5 metres tall. Impressive."),
            vec!["The tower is 324.5 metres tall.", "Impressive."]
        );
    }

    #[test]
    fn paragraph_breaks_count_as_whitespace() {
        assert_eq!(
            split_sentences("First paragraph.\n\nSecond one."),
            vec!["First paragraph.", "Second one."]
        );
    }

    #[test]
    fn empty_text_has_no_sentences() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n ").is_empty());
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> EngineEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("engine event timed out")
            .expect("engine event channel closed")
    }

    fn engine(program: &str, args: &[&str]) -> (CommandSpeechEngine, mpsc::UnboundedReceiver<EngineEvent>) {
        let mut engine = CommandSpeechEngine::new(program, args.iter().map(|s| s.to_string()).collect());
        let (tx, rx) = mpsc::unbounded_channel();
        engine.subscribe(tx);
        (engine, rx)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_program_finishes() {
        let (mut engine, mut rx) = engine("true", &[]);
        let id = engine.speak("One. Two.");

        assert_eq!(next(&mut rx).await, EngineEvent::new(id, EngineEventKind::Started));
        assert_eq!(next(&mut rx).await, EngineEvent::new(id, EngineEventKind::Finished));
        assert!(!engine.is_speaking());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_program_reports_failure() {
        let (mut engine, mut rx) = engine("false", &[]);
        let id = engine.speak("Hello.");

        assert_eq!(next(&mut rx).await.kind, EngineEventKind::Started);
        let ev = next(&mut rx).await;
        assert_eq!(ev.utterance, id);
        assert!(matches!(ev.kind, EngineEventKind::Failed(_)));
        assert!(!engine.is_speaking());
    }

    #[tokio::test]
    async fn missing_program_reports_failure() {
        let (mut engine, mut rx) = engine("past-port-no-such-tts-binary", &[]);
        engine.speak("Hello.");

        assert_eq!(next(&mut rx).await.kind, EngineEventKind::Started);
        assert!(matches!(next(&mut rx).await.kind, EngineEventKind::Failed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pause_continue_stop_cycle() {
        // `sh -c 'sleep 5' tts <sentence>`: a slow "speaker".
        let (mut engine, mut rx) = engine("sh", &["-c", "sleep 5", "tts"]);
        let id = engine.speak("A long sentence.");
        assert_eq!(next(&mut rx).await, EngineEvent::new(id, EngineEventKind::Started));
        assert!(engine.is_speaking());

        engine.pause_at_word_boundary();
        assert!(engine.is_paused());
        assert_eq!(next(&mut rx).await, EngineEvent::new(id, EngineEventKind::Paused));

        engine.continue_speaking();
        assert!(!engine.is_paused());
        assert_eq!(next(&mut rx).await, EngineEvent::new(id, EngineEventKind::Continued));

        engine.stop_immediately();
        assert!(!engine.is_speaking());
        assert_eq!(next(&mut rx).await, EngineEvent::new(id, EngineEventKind::Cancelled));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn new_utterance_cancels_previous() {
        let (mut engine, mut rx) = engine("sh", &["-c", "sleep 5", "tts"]);
        let first = engine.speak("First.");
        assert_eq!(next(&mut rx).await, EngineEvent::new(first, EngineEventKind::Started));

        let second = engine.speak("Second.");
        assert_ne!(first, second);

        let mut seen = vec![next(&mut rx).await, next(&mut rx).await];
        seen.sort_by_key(|e| e.utterance);
        assert_eq!(
            seen,
            vec![
                EngineEvent::new(first, EngineEventKind::Cancelled),
                EngineEvent::new(second, EngineEventKind::Started),
            ]
        );
        assert!(engine.is_speaking());
        engine.stop_immediately();
    }

    #[test]
    fn speak_outside_runtime_fails_fast() {
        let (mut engine, mut rx) = engine("true", &[]);
        let id = engine.speak("Hello.");
        let ev = rx.try_recv().expect("failure reported synchronously");
        assert_eq!(ev.utterance, id);
        assert!(matches!(ev.kind, EngineEventKind::Failed(_)));
        assert!(!engine.is_speaking());
    }
}
