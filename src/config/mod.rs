//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use crate::conversation::{DEFAULT_FALLBACK_RESPONSE, DEFAULT_WAKE_WORD};
use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    default_data_dir, DEFAULT_CHUNK_MS, DEFAULT_CORPUS_PATH, DEFAULT_MAX_RECORDING_MS,
    DEFAULT_PROBE_RESTART_DELAY_MS, DEFAULT_SILENCE_DURATION_MS, DEFAULT_SILENCE_THRESHOLD,
    DEFAULT_TTS_CMD, DEFAULT_TURN_RETRY_DELAY_MS, DEFAULT_WAKE_CHECK_INTERVAL_MS,
};

/// CLI options for the voicechat agent. `validate()` must run before the
/// derived configs are trusted.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "voicechat",
    about = "Wake-word voice assistant: say the wake word, then talk",
    author,
    version
)]
pub struct AppConfig {
    /// Word that starts a conversation (matched case-insensitively)
    #[arg(long, env = "VOICECHAT_WAKE_WORD", default_value = DEFAULT_WAKE_WORD)]
    pub wake_word: String,

    /// How long each wake-word probe records before it is checked (milliseconds)
    #[arg(long = "wake-check-interval-ms", default_value_t = DEFAULT_WAKE_CHECK_INTERVAL_MS)]
    pub wake_check_interval_ms: u64,

    /// Pause between wake-word probes (milliseconds)
    #[arg(long = "probe-restart-delay-ms", default_value_t = DEFAULT_PROBE_RESTART_DELAY_MS)]
    pub probe_restart_delay_ms: u64,

    /// Pause before listening again after the microphone or a reply failed (milliseconds)
    #[arg(long = "turn-retry-delay-ms", default_value_t = DEFAULT_TURN_RETRY_DELAY_MS)]
    pub turn_retry_delay_ms: u64,

    /// RMS level (16-bit scale) below which a chunk counts as silence
    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    pub silence_threshold: f64,

    /// Continuous silence that ends a recording (milliseconds)
    #[arg(long = "silence-duration-ms", default_value_t = DEFAULT_SILENCE_DURATION_MS)]
    pub silence_duration_ms: u64,

    /// Hard cap on a single recording (milliseconds)
    #[arg(long = "max-recording-ms", default_value_t = DEFAULT_MAX_RECORDING_MS)]
    pub max_recording_ms: u64,

    /// Audio read granularity (milliseconds)
    #[arg(long = "chunk-ms", default_value_t = DEFAULT_CHUNK_MS)]
    pub chunk_ms: u64,

    /// Intent corpus (JSON) used to pick replies
    #[arg(long, env = "VOICECHAT_CORPUS", default_value = DEFAULT_CORPUS_PATH)]
    pub corpus: PathBuf,

    /// Directory for recorded audio artifacts
    #[arg(long = "data-dir", default_value_os_t = default_data_dir())]
    pub data_dir: PathBuf,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Whisper GGML model path
    #[arg(long, env = "VOICECHAT_WHISPER_MODEL")]
    pub whisper_model_path: Option<PathBuf>,

    /// Language passed to Whisper (ISO-639-1 or `auto`)
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Whisper inference threads (0 = auto)
    #[arg(long = "whisper-threads", default_value_t = 0)]
    pub whisper_threads: usize,

    /// Text-to-speech command; the reply is appended as the last argument
    #[arg(long = "tts-cmd", env = "VOICECHAT_TTS_CMD", default_value = DEFAULT_TTS_CMD)]
    pub tts_cmd: String,

    /// Reply spoken when nothing in the corpus matches
    #[arg(long = "fallback-response", default_value = DEFAULT_FALLBACK_RESPONSE)]
    pub fallback_response: String,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "VOICECHAT_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "VOICECHAT_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging transcripts and replies (debug log only)
    #[arg(
        long = "log-content",
        env = "VOICECHAT_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable timing logs (implies file logging)
    #[arg(long)]
    pub log_timings: bool,
}

impl AppConfig {
    /// Whether the debug log and trace file should be written at all.
    pub fn logging_enabled(&self) -> bool {
        !self.no_logs && (self.logs || self.log_timings)
    }
}
