//! Microphone capture and silence-gated utterance recording.
//!
//! Audio is normalized to 16 kHz mono signed 16-bit PCM before anything else
//! sees it. [`Recorder`] runs one capture thread per session, classifies each
//! chunk with [`SilenceDetector`] and writes the finished utterance as a WAV
//! artifact.

/// Sample rate every chunk and artifact uses.
pub const SAMPLE_RATE: u32 = 16_000;

/// Channel count every chunk and artifact uses.
pub const CHANNELS: u16 = 1;

/// Bit depth of the PCM samples.
pub const BITS_PER_SAMPLE: u16 = 16;

mod clock;
mod device;
mod dispatch;
mod error;
mod recorder;
mod resample;
mod session;
mod silence;
mod source;
mod wav;

pub use clock::{Clock, ManualClock, SystemClock};
pub use device::{list_input_devices, MicrophoneFactory};
pub use error::CaptureError;
pub use recorder::{
    Recorder, RecorderConfig, RecorderError, RecorderEvent, RecordingDone, SessionId,
    StartOutcome, MSG_NO_AUDIO, MSG_PERMISSION_DENIED, MSG_READ_ERROR, MSG_RECORDING,
    MSG_RECORDING_DONE,
};
pub use session::{FinishedSession, RecordingSession, SessionMetrics, StopReason, UtteranceBuffer};
pub use silence::{rms, SilenceDetector, VoiceActivity, DEFAULT_SILENCE_THRESHOLD};
pub use source::{AudioChunk, AudioSource, AudioSourceFactory};
pub use wav::{AudioArtifact, ArtifactError};
