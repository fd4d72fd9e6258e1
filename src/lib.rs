//! Wake-word driven voice conversation agent.
//!
//! A background recorder captures silence-gated utterances from the microphone,
//! a transcription port turns them into text, the intent corpus picks a reply and
//! a speech port reads it back. [`conversation::ConversationController`] sequences
//! all of it on a single event loop.

mod app;
pub mod audio;
pub mod config;
pub mod conversation;
pub mod intent;
mod lock;
pub mod ports;
pub mod speech;
pub mod stt;
mod telemetry;

pub use app::logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
pub(crate) use lock::lock_or_recover;
pub use telemetry::{init_tracing, tracing_log_path};
