//! Runs a [`Conversation`] against the recorder and the two ports.
//!
//! One driver thread owns the machine. The recorder listener and the port
//! sinks only push [`Inbox`] messages into an unbounded channel; the driver
//! `select!`s over that channel, the wake ticker, the probe-restart deadline
//! and the turn-retry deadline, so every state change happens on the driver
//! thread.

use super::machine::{Action, Conversation, ConversationState, Event, RecordingKind};
use super::ConversationConfig;
use crate::audio::{
    CaptureError, Recorder, RecorderEvent, SessionId, StartOutcome, MSG_RECORDING,
    MSG_RECORDING_DONE,
};
use crate::intent::Corpus;
use crate::lock_or_recover;
use crate::log_debug;
use crate::ports::{
    EventSink, RequestId, SpeechEvent, SpeechOutputPort, TranscriptionEvent, TranscriptionPort,
    TranscriptionRequest,
};
use anyhow::{Context, Result};
use crossbeam_channel::{after, never, select, tick, unbounded, Receiver, RecvError, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// What the host gets to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationUpdate {
    Status(String),
    StateChanged(ConversationState),
    Exchange { heard: String, reply: String },
}

enum Inbox {
    Recorder(RecorderEvent),
    Transcription(TranscriptionEvent),
    Speech(SpeechEvent),
    Shutdown,
}

pub struct ConversationController {
    config: ConversationConfig,
    corpus: Arc<Corpus>,
    recorder: Arc<Recorder>,
    transcriber: Arc<dyn TranscriptionPort>,
    speaker: Arc<dyn SpeechOutputPort>,
    rng_seed: Option<u64>,
}

impl ConversationController {
    pub fn new(
        config: ConversationConfig,
        corpus: Arc<Corpus>,
        recorder: Arc<Recorder>,
        transcriber: Arc<dyn TranscriptionPort>,
        speaker: Arc<dyn SpeechOutputPort>,
    ) -> Self {
        Self {
            config,
            corpus,
            recorder,
            transcriber,
            speaker,
            rng_seed: None,
        }
    }

    /// Pick replies from a seeded RNG instead of OS entropy.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Take over the recorder's listener and start the driver thread. The
    /// conversation begins probing for the wake word immediately.
    pub fn spawn(self, updates: EventSink<ConversationUpdate>) -> Result<ControllerHandle> {
        let (inbox_tx, inbox_rx) = unbounded::<Inbox>();
        let listener_tx = inbox_tx.clone();
        self.recorder
            .set_listener(Arc::new(move |event: RecorderEvent| {
                let _ = listener_tx.send(Inbox::Recorder(event));
            }));

        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let machine = Conversation::with_rng(
            &self.config.wake_word,
            &self.config.fallback_response,
            Arc::clone(&self.corpus),
            rng,
        );
        let state = Arc::new(Mutex::new(machine.state()));
        let driver = Driver {
            machine,
            config: self.config,
            recorder: Arc::clone(&self.recorder),
            transcriber: self.transcriber,
            speaker: self.speaker,
            updates,
            shared_state: Arc::clone(&state),
            inbox_tx: inbox_tx.clone(),
            sessions: HashMap::new(),
            requests: HashMap::new(),
            next_request: 0,
            wake_ticker: None,
            probe_restart: None,
            turn_retry: None,
            last_status: None,
            deferred: VecDeque::new(),
            timing: TurnTiming::default(),
        };
        let handle = thread::Builder::new()
            .name("voicechat-conversation".to_string())
            .spawn(move || driver.run(inbox_rx))
            .context("failed to spawn conversation thread")?;
        Ok(ControllerHandle {
            inbox: inbox_tx,
            thread: Some(handle),
            state,
        })
    }
}

/// Owner's side of a running controller. Dropping it shuts the loop down.
pub struct ControllerHandle {
    inbox: Sender<Inbox>,
    thread: Option<JoinHandle<()>>,
    state: Arc<Mutex<ConversationState>>,
}

impl ControllerHandle {
    pub fn state(&self) -> ConversationState {
        *lock_or_recover(&self.state, "conversation state")
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the recorder and wait for the driver thread to exit. Speech or
    /// transcription already in progress is left to finish on its own
    /// thread; its events are discarded.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        let _ = self.inbox.send(Inbox::Shutdown);
        if handle.join().is_err() {
            log_debug("conversation driver panicked");
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Default)]
struct TurnTiming {
    turn_recorded_at: Option<Instant>,
    transcribed_ms: Option<u128>,
    speech_started_at: Option<Instant>,
}

struct Driver {
    machine: Conversation,
    config: ConversationConfig,
    recorder: Arc<Recorder>,
    transcriber: Arc<dyn TranscriptionPort>,
    speaker: Arc<dyn SpeechOutputPort>,
    updates: EventSink<ConversationUpdate>,
    shared_state: Arc<Mutex<ConversationState>>,
    inbox_tx: Sender<Inbox>,
    sessions: HashMap<SessionId, RecordingKind>,
    requests: HashMap<RequestId, RecordingKind>,
    next_request: u64,
    wake_ticker: Option<Receiver<Instant>>,
    probe_restart: Option<Receiver<Instant>>,
    turn_retry: Option<Receiver<Instant>>,
    last_status: Option<String>,
    deferred: VecDeque<Event>,
    timing: TurnTiming,
}

impl Driver {
    fn run(mut self, inbox: Receiver<Inbox>) {
        log_debug("conversation driver started");
        (self.updates)(ConversationUpdate::StateChanged(self.machine.state()));
        self.dispatch(Event::Begin);
        let idle = never::<Instant>();
        let mut running = true;
        while running {
            let wake_ticker = self.wake_ticker.clone().unwrap_or_else(|| idle.clone());
            let probe_restart = self.probe_restart.clone().unwrap_or_else(|| idle.clone());
            let turn_retry = self.turn_retry.clone().unwrap_or_else(|| idle.clone());
            select! {
                recv(inbox) -> message => running = self.receive(message),
                recv(wake_ticker) -> _ => self.dispatch(Event::WakeTick),
                recv(probe_restart) -> _ => {
                    self.probe_restart = None;
                    // The stopped probe was joined before this deadline was
                    // armed, so its result is already queued. It goes to
                    // transcription before the next probe starts.
                    running = self.drain(&inbox);
                    if running {
                        self.dispatch(Event::ProbeRestartDue);
                    }
                }
                recv(turn_retry) -> _ => {
                    self.turn_retry = None;
                    self.dispatch(Event::TurnRetryDue);
                }
            }
        }
        self.recorder.stop();
        log_debug("conversation driver stopped");
    }

    /// Handle one inbox message. Returns false once the driver should exit.
    fn receive(&mut self, message: Result<Inbox, RecvError>) -> bool {
        match message {
            Ok(Inbox::Recorder(event)) => self.on_recorder(event),
            Ok(Inbox::Transcription(event)) => self.on_transcription(event),
            Ok(Inbox::Speech(event)) => self.on_speech(event),
            Ok(Inbox::Shutdown) | Err(_) => return false,
        }
        true
    }

    fn drain(&mut self, inbox: &Receiver<Inbox>) -> bool {
        while let Ok(message) = inbox.try_recv() {
            if !self.receive(Ok(message)) {
                return false;
            }
        }
        true
    }

    fn on_recorder(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Status { session, message } => {
                // Probes start and stop every few seconds; only their
                // failures are worth showing.
                let routine = message == MSG_RECORDING || message == MSG_RECORDING_DONE;
                if self.sessions.get(&session) == Some(&RecordingKind::Turn) || !routine {
                    self.status(message);
                }
            }
            RecorderEvent::Done(done) => {
                let Some(kind) = self.sessions.remove(&done.session) else {
                    log_debug(&format!("dropping result of unknown session {}", done.session));
                    return;
                };
                log_debug(&format!(
                    "{} session {} done: {} samples, {}",
                    kind.label(),
                    done.session,
                    done.samples,
                    done.stop_reason.label()
                ));
                if kind == RecordingKind::Turn {
                    self.timing.turn_recorded_at = Some(Instant::now());
                }
                self.dispatch(Event::RecordingDone {
                    kind,
                    path: done.path,
                });
            }
            RecorderEvent::Error { session, error } => {
                let Some(kind) = self.sessions.remove(&session) else {
                    return;
                };
                log_debug(&format!(
                    "{} session {session} failed: {}",
                    kind.label(),
                    error.label()
                ));
                self.dispatch(Event::RecordingFailed { kind, error });
            }
        }
    }

    fn on_transcription(&mut self, event: TranscriptionEvent) {
        match event {
            TranscriptionEvent::Progress { id, message } => {
                if self.requests.get(&id) == Some(&RecordingKind::Turn) {
                    self.status(message);
                }
            }
            TranscriptionEvent::Result { id, text } => {
                let Some(kind) = self.requests.remove(&id) else {
                    return;
                };
                if kind == RecordingKind::Turn {
                    self.timing.transcribed_ms = self
                        .timing
                        .turn_recorded_at
                        .map(|at| at.elapsed().as_millis());
                }
                self.dispatch(Event::Transcript { kind, text });
            }
            TranscriptionEvent::Failed { id, reason } => {
                let Some(kind) = self.requests.remove(&id) else {
                    return;
                };
                self.dispatch(Event::TranscriptionFailed { kind, reason });
            }
        }
    }

    fn on_speech(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Started { utterance_id } => {
                self.timing.speech_started_at = Some(Instant::now());
                self.dispatch(Event::SpeechStarted { utterance_id });
            }
            SpeechEvent::Done { utterance_id } => {
                self.finish_turn(&utterance_id, false);
                self.dispatch(Event::SpeechFinished {
                    utterance_id,
                    failed: false,
                });
            }
            SpeechEvent::Error {
                utterance_id,
                reason,
            } => {
                log_debug(&format!("speech {utterance_id} error: {reason}"));
                self.finish_turn(&utterance_id, true);
                self.dispatch(Event::SpeechFinished {
                    utterance_id,
                    failed: true,
                });
            }
        }
    }

    fn finish_turn(&mut self, utterance_id: &str, failed: bool) {
        if self.machine.pending_reply() != Some(utterance_id) {
            return;
        }
        let timing = std::mem::take(&mut self.timing);
        tracing::info!(
            target: "voicechat",
            event = "turn_timing",
            utterance_id,
            stt_ms = timing.transcribed_ms.map(|ms| ms as u64),
            speech_ms = timing
                .speech_started_at
                .map(|at| at.elapsed().as_millis() as u64),
            speech_failed = failed,
            "turn finished"
        );
    }

    fn dispatch(&mut self, event: Event) {
        let before = self.machine.state();
        self.deferred.push_back(event);
        while let Some(event) = self.deferred.pop_front() {
            for action in self.machine.handle(event) {
                self.execute(action);
            }
        }
        let after = self.machine.state();
        if after != before {
            *lock_or_recover(&self.shared_state, "conversation state") = after;
            log_debug(&format!(
                "conversation: {} -> {}",
                before.label(),
                after.label()
            ));
            (self.updates)(ConversationUpdate::StateChanged(after));
        }
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::Status(message) => self.status(message),
            Action::StartRecording { kind } => self.start_recording(kind),
            Action::StopRecording => self.recorder.stop(),
            Action::Transcribe { kind, path } => {
                self.next_request += 1;
                let id = RequestId(self.next_request);
                self.requests.insert(id, kind);
                let tx = self.inbox_tx.clone();
                self.transcriber.transcribe(
                    TranscriptionRequest {
                        id,
                        audio_path: path,
                    },
                    Arc::new(move |event: TranscriptionEvent| {
                        let _ = tx.send(Inbox::Transcription(event));
                    }),
                );
            }
            Action::Speak { text, utterance_id } => {
                let tx = self.inbox_tx.clone();
                self.speaker.speak(
                    &text,
                    &utterance_id,
                    Arc::new(move |event: SpeechEvent| {
                        let _ = tx.send(Inbox::Speech(event));
                    }),
                );
            }
            Action::ArmWakeTimer => {
                self.wake_ticker = Some(tick(self.config.wake_check_interval));
            }
            Action::CancelWakeTimer => self.wake_ticker = None,
            Action::ScheduleProbeRestart => {
                self.probe_restart = Some(after(self.config.probe_restart_delay));
            }
            Action::CancelProbeRestart => self.probe_restart = None,
            Action::ScheduleTurnRetry => {
                self.turn_retry = Some(after(self.config.turn_retry_delay));
            }
            Action::Exchange { heard, reply } => {
                (self.updates)(ConversationUpdate::Exchange { heard, reply });
            }
        }
    }

    fn start_recording(&mut self, kind: RecordingKind) {
        self.recorder
            .set_target_path(self.config.path_for(kind).clone());
        match self.recorder.start() {
            Ok(StartOutcome::Started(session)) => {
                self.sessions.insert(session, kind);
            }
            Ok(StartOutcome::AlreadyRunning) => {
                log_debug(&format!("{} recording requested while busy", kind.label()));
            }
            Err(err) => {
                log_debug(&format!("failed to start {} recording: {err}", kind.label()));
                self.deferred.push_back(Event::RecordingFailed {
                    kind,
                    error: CaptureError::DeviceUnavailable(err.to_string()),
                });
            }
        }
    }

    /// Forward a status line, skipping exact repeats (the recorder reports
    /// `Recording...` for every speech chunk).
    fn status(&mut self, message: String) {
        if self.last_status.as_deref() == Some(message.as_str()) {
            return;
        }
        self.last_status = Some(message.clone());
        (self.updates)(ConversationUpdate::Status(message));
    }
}
