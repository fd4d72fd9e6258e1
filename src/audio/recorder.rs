//! Background capture thread owner.
//!
//! At most one capture worker exists at a time. `start()` spawns it, the
//! worker reads chunks until silence, the duration cap, a stop request or a
//! read error ends the session, then writes the artifact and reports exactly
//! one terminal event (`Done` or `Error`) to the listener.

use super::session::{FinishedSession, RecordingSession};
use super::{
    AudioArtifact, AudioSourceFactory, CaptureError, Clock, SessionMetrics, SilenceDetector,
    StopReason, SystemClock, VoiceActivity, DEFAULT_SILENCE_THRESHOLD, SAMPLE_RATE,
};
use crate::lock_or_recover;
use crate::log_debug;
use crate::ports::EventSink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use thiserror::Error;

pub const MSG_RECORDING: &str = "Recording...";
pub const MSG_RECORDING_DONE: &str = "Recording done...!";
pub const MSG_PERMISSION_DENIED: &str = "Permission denied for audio recording";
pub const MSG_READ_ERROR: &str = "Error reading audio data";
pub const MSG_NO_AUDIO: &str = "Error: No audio data recorded";

/// Monotonic per-recorder session counter, starting at 1.
pub type SessionId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// RMS level below which a chunk is silence.
    pub silence_threshold: f64,
    /// Continuous silence that ends an utterance.
    pub silence_duration: Duration,
    /// Hard cap on a single session.
    pub max_duration: Duration,
    /// Audio per `read_chunk` call.
    pub chunk_duration: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            silence_duration: Duration::from_millis(3000),
            max_duration: Duration::from_millis(20_000),
            chunk_duration: Duration::from_millis(100),
        }
    }
}

impl RecorderConfig {
    pub fn chunk_samples(&self) -> usize {
        samples_for(self.chunk_duration).max(1)
    }

    pub fn max_samples(&self) -> usize {
        samples_for(self.max_duration)
    }
}

fn samples_for(duration: Duration) -> usize {
    (duration.as_micros() * u128::from(SAMPLE_RATE) / 1_000_000) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(SessionId),
    /// A session was already running; nothing changed.
    AlreadyRunning,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("no target path set; call set_target_path before start")]
    MissingTargetPath,
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingDone {
    pub session: SessionId,
    pub path: PathBuf,
    pub samples: usize,
    pub duration: Duration,
    pub stop_reason: StopReason,
    pub metrics: SessionMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    Status {
        session: SessionId,
        message: String,
    },
    Done(RecordingDone),
    Error {
        session: SessionId,
        error: CaptureError,
    },
}

impl RecorderEvent {
    pub fn session(&self) -> SessionId {
        match self {
            RecorderEvent::Status { session, .. } | RecorderEvent::Error { session, .. } => {
                *session
            }
            RecorderEvent::Done(done) => done.session,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecorderEvent::Status { .. })
    }
}

struct Worker {
    session: SessionId,
    stop: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    thread: ThreadId,
}

impl Worker {
    fn join(self) {
        if self.thread == thread::current().id() {
            // Called from the worker's own listener; it is already on its way out.
            log_debug(&format!(
                "recorder: session {} stopped from its own thread; not joining",
                self.session
            ));
            return;
        }
        if self.handle.join().is_err() {
            log_debug(&format!("recorder: session {} worker panicked", self.session));
        }
    }
}

struct RecorderInner {
    target_path: Option<PathBuf>,
    worker: Option<Worker>,
    next_session: SessionId,
}

/// Owns the capture worker. Safe to share across threads.
///
/// Listener callbacks run on the capture thread. They must hand events off
/// (e.g. into a channel) and never call back into the recorder.
pub struct Recorder {
    factory: Arc<dyn AudioSourceFactory>,
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
    listener: Mutex<Option<EventSink<RecorderEvent>>>,
    inner: Mutex<RecorderInner>,
}

impl Recorder {
    pub fn new(factory: Arc<dyn AudioSourceFactory>, config: RecorderConfig) -> Self {
        Self::with_clock(factory, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        factory: Arc<dyn AudioSourceFactory>,
        config: RecorderConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            factory,
            config,
            clock,
            listener: Mutex::new(None),
            inner: Mutex::new(RecorderInner {
                target_path: None,
                worker: None,
                next_session: 0,
            }),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Takes effect from the next `start()`.
    pub fn set_listener(&self, listener: EventSink<RecorderEvent>) {
        *lock_or_recover(&self.listener, "recorder listener") = Some(listener);
    }

    /// Where the next session's artifact goes. Takes effect from the next
    /// `start()`.
    pub fn set_target_path(&self, path: impl Into<PathBuf>) {
        lock_or_recover(&self.inner, "recorder").target_path = Some(path.into());
    }

    /// Spawn a capture worker unless one is already running.
    pub fn start(&self) -> Result<StartOutcome, RecorderError> {
        let mut inner = lock_or_recover(&self.inner, "recorder");
        if let Some(worker) = inner.worker.as_ref() {
            if worker.active.load(Ordering::Acquire) {
                log_debug(&format!(
                    "recorder: start ignored, session {} still in progress",
                    worker.session
                ));
                return Ok(StartOutcome::AlreadyRunning);
            }
        }
        // A worker that finished on its own is still owed a join.
        if let Some(finished) = inner.worker.take() {
            finished.join();
        }
        let target_path = inner
            .target_path
            .clone()
            .ok_or(RecorderError::MissingTargetPath)?;

        let session = inner.next_session + 1;
        let stop = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));
        let capture = CaptureThread {
            session,
            target_path,
            factory: Arc::clone(&self.factory),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
            listener: lock_or_recover(&self.listener, "recorder listener").clone(),
            stop: Arc::clone(&stop),
            active: Arc::clone(&active),
        };
        let handle = thread::Builder::new()
            .name(format!("voicechat-capture-{session}"))
            .spawn(move || capture.run())?;
        inner.next_session = session;
        inner.worker = Some(Worker {
            session,
            stop,
            active,
            thread: handle.thread().id(),
            handle,
        });
        log_debug(&format!("recorder: session {session} started"));
        Ok(StartOutcome::Started(session))
    }

    /// Ask the worker to finish and wait for it. Once this returns the
    /// artifact (if any) is complete and no further events for that session
    /// will arrive. Does nothing when idle.
    pub fn stop(&self) {
        let mut inner = lock_or_recover(&self.inner, "recorder");
        let Some(worker) = inner.worker.take() else {
            return;
        };
        worker.stop.store(true, Ordering::Release);
        worker.join();
    }

    pub fn is_in_progress(&self) -> bool {
        lock_or_recover(&self.inner, "recorder")
            .worker
            .as_ref()
            .is_some_and(|worker| worker.active.load(Ordering::Acquire))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the capture worker owns for one session.
struct CaptureThread {
    session: SessionId,
    target_path: PathBuf,
    factory: Arc<dyn AudioSourceFactory>,
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
    listener: Option<EventSink<RecorderEvent>>,
    stop: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl CaptureThread {
    fn run(self) {
        let outcome = self.capture();
        // Cleared before the terminal event so a listener reacting to it can
        // start the next session straight away.
        self.active.store(false, Ordering::Release);
        match outcome {
            Ok(done) => {
                log_debug(&format!(
                    "recorder: session {} done ({}, {} samples)",
                    self.session,
                    done.stop_reason.label(),
                    done.samples
                ));
                self.status(MSG_RECORDING_DONE);
                self.emit(RecorderEvent::Done(done));
            }
            Err(error) => {
                log_debug(&format!(
                    "recorder: session {} failed: {error}",
                    self.session
                ));
                self.status(match error {
                    CaptureError::PermissionDenied => MSG_PERMISSION_DENIED,
                    CaptureError::EmptyCapture => MSG_NO_AUDIO,
                    _ => MSG_READ_ERROR,
                });
                self.emit(RecorderEvent::Error {
                    session: self.session,
                    error,
                });
            }
        }
    }

    fn capture(&self) -> Result<RecordingDone, CaptureError> {
        let mut source = self.factory.open(self.config.chunk_samples())?;
        let detector = SilenceDetector::new(self.config.silence_threshold);
        let mut session =
            RecordingSession::new(self.target_path.clone(), self.clock.now(), &self.config);
        let mut read_failure = None;
        self.status(MSG_RECORDING);

        let reason = loop {
            if self.stop.load(Ordering::Acquire) {
                break StopReason::ManualStop;
            }
            if let Some(reason) = session.check_duration(self.clock.now()) {
                break reason;
            }
            let chunk = match source.read_chunk() {
                Ok(chunk) if chunk.is_empty() => {
                    let error = CaptureError::DeviceReadFailure("zero-length read".to_string());
                    let reason = StopReason::ReadError(error.to_string());
                    read_failure = Some(error);
                    break reason;
                }
                Ok(chunk) => chunk,
                Err(error) => {
                    let reason = StopReason::ReadError(error.to_string());
                    read_failure = Some(error);
                    break reason;
                }
            };
            let activity = detector.classify(&chunk);
            if activity == VoiceActivity::Speech {
                self.status(MSG_RECORDING);
            }
            if let Some(reason) = session.on_chunk(&chunk, activity, self.clock.now()) {
                break reason;
            }
        };
        source.close();

        let finished = session.finish(reason, self.clock.now());
        log_metrics(self.session, &finished);
        if finished.samples.is_empty() {
            return Err(read_failure.unwrap_or(CaptureError::EmptyCapture));
        }
        if read_failure.is_some() {
            // Partial audio still goes out; the stop reason records the failure.
            self.status(MSG_READ_ERROR);
        }
        self.persist(finished)
    }

    fn persist(&self, finished: FinishedSession) -> Result<RecordingDone, CaptureError> {
        let FinishedSession {
            target_path,
            samples,
            stop_reason,
            metrics,
        } = finished;
        let artifact = AudioArtifact::from_samples(samples);
        artifact
            .write(&target_path)
            .map_err(|err| CaptureError::Artifact(err.to_string()))?;
        Ok(RecordingDone {
            session: self.session,
            samples: artifact.samples().len(),
            duration: Duration::from_millis(artifact.duration_ms()),
            path: target_path,
            stop_reason,
            metrics,
        })
    }

    fn status(&self, message: &str) {
        self.emit(RecorderEvent::Status {
            session: self.session,
            message: message.to_string(),
        });
    }

    fn emit(&self, event: RecorderEvent) {
        match &self.listener {
            Some(listener) => listener(event),
            None if event.is_terminal() => log_debug(&format!(
                "recorder: no listener for session {} terminal event",
                self.session
            )),
            None => {}
        }
    }
}

fn log_metrics(session: SessionId, finished: &FinishedSession) {
    let metrics = &finished.metrics;
    tracing::info!(
        target: "voicechat",
        event = "session_metrics",
        session,
        stop_reason = finished.stop_reason.label(),
        chunks = metrics.chunks,
        speech_chunks = metrics.speech_chunks,
        silence_chunks = metrics.silence_chunks,
        captured_ms = metrics.captured_ms,
        trimmed_samples = metrics.trimmed_samples,
        overflow_samples = metrics.overflow_samples,
        samples = finished.samples.len(),
        path = %display_path(&finished.target_path),
        "recording session finished"
    );
}

fn display_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
