use super::defaults::{
    ISO_639_1_CODES, MAX_CHUNK_MS, MAX_PROBE_RESTART_DELAY_MS, MAX_RECORDING_HARD_LIMIT_MS,
    MAX_SILENCE_THRESHOLD, MAX_TURN_RETRY_DELAY_MS, MAX_WAKE_CHECK_INTERVAL_MS,
    MAX_WAKE_WORD_CHARS, MAX_WHISPER_THREADS, MIN_CHUNK_MS, MIN_TURN_RETRY_DELAY_MS,
    MIN_WAKE_CHECK_INTERVAL_MS,
};
use super::AppConfig;
use crate::audio::RecorderConfig;
use crate::conversation::{ConversationConfig, TURN_FILE, WAKE_PROBE_FILE};
use crate::stt::WhisperOptions;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;

impl AppConfig {
    /// Check CLI values and normalize strings and paths.
    pub fn validate(&mut self) -> Result<()> {
        self.wake_word = self.wake_word.trim().to_lowercase();
        if self.wake_word.is_empty() {
            bail!("--wake-word must not be empty");
        }
        if self.wake_word.chars().count() > MAX_WAKE_WORD_CHARS {
            bail!("--wake-word must be at most {MAX_WAKE_WORD_CHARS} characters");
        }

        if !(MIN_WAKE_CHECK_INTERVAL_MS..=MAX_WAKE_CHECK_INTERVAL_MS)
            .contains(&self.wake_check_interval_ms)
        {
            bail!(
                "--wake-check-interval-ms must be between {MIN_WAKE_CHECK_INTERVAL_MS} and {MAX_WAKE_CHECK_INTERVAL_MS}, got {}",
                self.wake_check_interval_ms
            );
        }
        if self.probe_restart_delay_ms > MAX_PROBE_RESTART_DELAY_MS {
            bail!(
                "--probe-restart-delay-ms must be at most {MAX_PROBE_RESTART_DELAY_MS}, got {}",
                self.probe_restart_delay_ms
            );
        }
        if !(MIN_TURN_RETRY_DELAY_MS..=MAX_TURN_RETRY_DELAY_MS)
            .contains(&self.turn_retry_delay_ms)
        {
            bail!(
                "--turn-retry-delay-ms must be between {MIN_TURN_RETRY_DELAY_MS} and {MAX_TURN_RETRY_DELAY_MS}, got {}",
                self.turn_retry_delay_ms
            );
        }

        if !self.silence_threshold.is_finite()
            || !(1.0..=MAX_SILENCE_THRESHOLD).contains(&self.silence_threshold)
        {
            bail!(
                "--silence-threshold must be between 1 and {MAX_SILENCE_THRESHOLD}, got {}",
                self.silence_threshold
            );
        }
        if !(MIN_CHUNK_MS..=MAX_CHUNK_MS).contains(&self.chunk_ms) {
            bail!(
                "--chunk-ms must be between {MIN_CHUNK_MS} and {MAX_CHUNK_MS}, got {}",
                self.chunk_ms
            );
        }
        if self.max_recording_ms < self.chunk_ms
            || self.max_recording_ms > MAX_RECORDING_HARD_LIMIT_MS
        {
            bail!(
                "--max-recording-ms must be between --chunk-ms ({}) and {MAX_RECORDING_HARD_LIMIT_MS}, got {}",
                self.chunk_ms,
                self.max_recording_ms
            );
        }
        if self.silence_duration_ms < self.chunk_ms
            || self.silence_duration_ms > self.max_recording_ms
        {
            bail!(
                "--silence-duration-ms must be >= --chunk-ms ({}) and <= --max-recording-ms ({})",
                self.chunk_ms,
                self.max_recording_ms
            );
        }

        if !self.corpus.is_file() {
            bail!("intent corpus '{}' does not exist", self.corpus.display());
        }

        if let Some(model) = &mut self.whisper_model_path {
            if !model.exists() {
                bail!("whisper model path '{}' does not exist", model.display());
            }
            *model = model.canonicalize().with_context(|| {
                format!("failed to canonicalize whisper model path '{}'", model.display())
            })?;
        }
        if self.whisper_threads > MAX_WHISPER_THREADS {
            bail!(
                "--whisper-threads must be at most {MAX_WHISPER_THREADS}, got {}",
                self.whisper_threads
            );
        }
        validate_lang(&self.lang)?;

        if self.tts_cmd.trim().is_empty() {
            bail!("--tts-cmd must not be empty");
        }
        shell_words::split(&self.tts_cmd)
            .with_context(|| format!("--tts-cmd '{}' is not a valid command line", self.tts_cmd))?;

        if self.fallback_response.trim().is_empty() {
            bail!("--fallback-response must not be empty");
        }
        if self.data_dir.as_os_str().is_empty() {
            bail!("--data-dir must not be empty");
        }

        Ok(())
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            silence_threshold: self.silence_threshold,
            silence_duration: Duration::from_millis(self.silence_duration_ms),
            max_duration: Duration::from_millis(self.max_recording_ms),
            chunk_duration: Duration::from_millis(self.chunk_ms),
        }
    }

    pub fn conversation_config(&self) -> ConversationConfig {
        ConversationConfig {
            wake_word: self.wake_word.clone(),
            wake_check_interval: Duration::from_millis(self.wake_check_interval_ms),
            probe_restart_delay: Duration::from_millis(self.probe_restart_delay_ms),
            turn_retry_delay: Duration::from_millis(self.turn_retry_delay_ms),
            probe_path: self.data_dir.join(WAKE_PROBE_FILE),
            turn_path: self.data_dir.join(TURN_FILE),
            fallback_response: self.fallback_response.clone(),
        }
    }

    pub fn whisper_options(&self) -> WhisperOptions {
        WhisperOptions {
            lang: self.lang.clone(),
            threads: self.whisper_threads,
        }
    }

    /// The model path, or an error explaining how to supply one.
    pub fn require_whisper_model(&self) -> Result<&Path> {
        match &self.whisper_model_path {
            Some(path) => Ok(path.as_path()),
            None => bail!(
                "no Whisper model configured; pass --whisper-model-path or set VOICECHAT_WHISPER_MODEL"
            ),
        }
    }
}

fn validate_lang(lang: &str) -> Result<()> {
    if lang.trim().is_empty() {
        bail!("--lang must not be empty");
    }
    if lang.eq_ignore_ascii_case("auto") {
        return Ok(());
    }
    if !lang
        .chars()
        .all(|ch| ch.is_ascii_alphabetic() || ch == '-' || ch == '_')
    {
        bail!("--lang must contain only alphabetic characters or '-'/'_' separators");
    }
    // Allow locale-style values but only check the leading ISO-639-1 code.
    let primary = lang
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if !ISO_639_1_CODES.contains(&primary.as_str()) {
        bail!("--lang must start with a valid ISO-639-1 code or be 'auto', got '{lang}'");
    }
    Ok(())
}
