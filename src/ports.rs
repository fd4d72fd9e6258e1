//! Seams to the transcription and speech engines.
//!
//! Both ports are asynchronous: a call returns immediately and the outcome
//! arrives later through the [`EventSink`] handed to the port, possibly on
//! another thread.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Callback that receives events from a background component. Must be cheap
/// and non-blocking; the controller's sinks only enqueue.
pub type EventSink<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Correlates a transcription submission with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub id: RequestId,
    pub audio_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionEvent {
    Progress { id: RequestId, message: String },
    Result { id: RequestId, text: String },
    Failed { id: RequestId, reason: String },
}

impl TranscriptionEvent {
    pub fn id(&self) -> RequestId {
        match self {
            TranscriptionEvent::Progress { id, .. }
            | TranscriptionEvent::Result { id, .. }
            | TranscriptionEvent::Failed { id, .. } => *id,
        }
    }
}

/// Turns an audio artifact into text. Every request yields exactly one
/// `Result` or `Failed` on `events`, optionally preceded by `Progress`.
pub trait TranscriptionPort: Send + Sync {
    fn transcribe(&self, request: TranscriptionRequest, events: EventSink<TranscriptionEvent>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Started { utterance_id: String },
    Done { utterance_id: String },
    Error { utterance_id: String, reason: String },
}

impl SpeechEvent {
    pub fn utterance_id(&self) -> &str {
        match self {
            SpeechEvent::Started { utterance_id }
            | SpeechEvent::Done { utterance_id }
            | SpeechEvent::Error { utterance_id, .. } => utterance_id,
        }
    }
}

/// Speaks text aloud. Every call yields `Done` or `Error` on `events`;
/// `Started` comes first when playback actually begins.
pub trait SpeechOutputPort: Send + Sync {
    fn speak(&self, text: &str, utterance_id: &str, events: EventSink<SpeechEvent>);
}
