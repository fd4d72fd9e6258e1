//! Wake word, listen, reply, repeat.
//!
//! [`machine`] decides what happens next; [`controller`] runs it on a single
//! event-loop thread against a real [`Recorder`](crate::audio::Recorder) and
//! the transcription and speech ports.

mod controller;
mod machine;

pub use controller::{ControllerHandle, ConversationController, ConversationUpdate};
pub use machine::{
    normalize_transcript, Action, Conversation, ConversationState, Event, RecordingKind,
    MSG_LISTENING, MSG_SPEAKING, MSG_WAITING_FOR_WAKE_WORD, MSG_WAKE_WORD_DETECTED,
};

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WAKE_WORD: &str = "marcus";
pub const DEFAULT_FALLBACK_RESPONSE: &str = "I didn't understand that. Can you rephrase?";
pub const WAKE_PROBE_FILE: &str = "wake_word_temp.wav";
pub const TURN_FILE: &str = "conversation.wav";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationConfig {
    pub wake_word: String,
    /// How long each wake probe records before it is checked.
    pub wake_check_interval: Duration,
    /// Gap between stopping one probe and starting the next.
    pub probe_restart_delay: Duration,
    /// Pause before listening again after a failed capture or reply.
    pub turn_retry_delay: Duration,
    pub probe_path: PathBuf,
    pub turn_path: PathBuf,
    pub fallback_response: String,
}

impl ConversationConfig {
    /// Defaults with both artifacts placed under `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            wake_check_interval: Duration::from_millis(2000),
            probe_restart_delay: Duration::from_millis(300),
            turn_retry_delay: Duration::from_millis(1000),
            probe_path: data_dir.join(WAKE_PROBE_FILE),
            turn_path: data_dir.join(TURN_FILE),
            fallback_response: DEFAULT_FALLBACK_RESPONSE.to_string(),
        }
    }

    pub fn path_for(&self, kind: RecordingKind) -> &PathBuf {
        match kind {
            RecordingKind::WakeProbe => &self.probe_path,
            RecordingKind::Turn => &self.turn_path,
        }
    }
}
