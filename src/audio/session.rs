//! Per-session capture state: the utterance buffer and the silence/duration
//! rules that decide when an utterance is complete.

use super::{AudioChunk, RecorderConfig, VoiceActivity, SAMPLE_RATE};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Why a session stopped capturing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    SilenceTimeout { tail_ms: u64 },
    MaxDuration,
    ManualStop,
    ReadError(String),
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::SilenceTimeout { .. } => "silence_timeout",
            StopReason::MaxDuration => "max_duration",
            StopReason::ManualStop => "manual_stop",
            StopReason::ReadError(_) => "read_error",
        }
    }
}

/// Counters reported with every finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    pub chunks: usize,
    pub speech_chunks: usize,
    pub silence_chunks: usize,
    pub captured_ms: u64,
    pub trimmed_samples: usize,
    pub overflow_samples: usize,
}

/// Append-only sample store for one utterance, capped at a fixed length.
///
/// Remembers where the current run of silent chunks began so the tail can be
/// cut off once silence ends the utterance.
#[derive(Debug, Clone)]
pub struct UtteranceBuffer {
    samples: Vec<i16>,
    max_samples: usize,
    silent_tail_start: Option<usize>,
    overflow: usize,
}

impl UtteranceBuffer {
    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples.min(SAMPLE_RATE as usize * 30)),
            max_samples,
            silent_tail_start: None,
            overflow: 0,
        }
    }

    /// Append a chunk. Samples past the cap are counted and dropped.
    pub fn push(&mut self, samples: &[i16], activity: VoiceActivity) {
        match activity {
            VoiceActivity::Silence => {
                self.silent_tail_start.get_or_insert(self.samples.len());
            }
            VoiceActivity::Speech => self.silent_tail_start = None,
        }
        let room = self.max_samples.saturating_sub(self.samples.len());
        let take = room.min(samples.len());
        self.samples.extend_from_slice(&samples[..take]);
        self.overflow += samples.len() - take;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn overflow(&self) -> usize {
        self.overflow
    }

    /// Drop the trailing run of silent chunks. Returns how many samples went.
    pub fn trim_silent_tail(&mut self) -> usize {
        let Some(start) = self.silent_tail_start.take() else {
            return 0;
        };
        let removed = self.samples.len().saturating_sub(start);
        self.samples.truncate(start);
        removed
    }

    pub fn into_samples(mut self) -> Vec<i16> {
        self.samples.shrink_to_fit();
        self.samples
    }
}

/// State the capture thread keeps for one recording.
#[derive(Debug)]
pub struct RecordingSession {
    target_path: PathBuf,
    start_time: Instant,
    silence_start_time: Option<Instant>,
    is_silent: bool,
    buffer: UtteranceBuffer,
    silence_duration: Duration,
    max_duration: Duration,
    metrics: SessionMetrics,
}

impl RecordingSession {
    pub fn new(target_path: PathBuf, start_time: Instant, config: &RecorderConfig) -> Self {
        Self {
            target_path,
            start_time,
            silence_start_time: None,
            is_silent: false,
            buffer: UtteranceBuffer::with_max_samples(config.max_samples()),
            silence_duration: config.silence_duration,
            max_duration: config.max_duration,
            metrics: SessionMetrics::default(),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.is_silent
    }

    /// Hard ceiling on wall-clock time since the session started.
    pub fn check_duration(&self, now: Instant) -> Option<StopReason> {
        if now.saturating_duration_since(self.start_time) >= self.max_duration {
            Some(StopReason::MaxDuration)
        } else {
            None
        }
    }

    /// Buffer a classified chunk and decide whether the utterance is over.
    ///
    /// `now` is when the chunk was read; silence is taken to have begun where
    /// the first silent chunk's audio began, so a run of silent chunks is
    /// measured by the audio it covers rather than by how many arrived.
    pub fn on_chunk(
        &mut self,
        chunk: &AudioChunk,
        activity: VoiceActivity,
        now: Instant,
    ) -> Option<StopReason> {
        self.buffer.push(chunk.samples(), activity);
        self.metrics.chunks += 1;
        match activity {
            VoiceActivity::Speech => {
                self.metrics.speech_chunks += 1;
                self.is_silent = false;
                self.silence_start_time = None;
                None
            }
            VoiceActivity::Silence => {
                self.metrics.silence_chunks += 1;
                let began = *self.silence_start_time.get_or_insert_with(|| {
                    now.checked_sub(chunk.duration())
                        .unwrap_or(now)
                        .max(self.start_time)
                });
                self.is_silent = true;
                let tail = now.saturating_duration_since(began);
                (tail >= self.silence_duration).then(|| StopReason::SilenceTimeout {
                    tail_ms: tail.as_millis() as u64,
                })
            }
        }
    }

    /// Close the session. A silence stop drops the silent tail so the
    /// artifact holds only what came before it.
    pub fn finish(mut self, reason: StopReason, now: Instant) -> FinishedSession {
        if matches!(reason, StopReason::SilenceTimeout { .. }) {
            self.metrics.trimmed_samples = self.buffer.trim_silent_tail();
        }
        self.metrics.overflow_samples = self.buffer.overflow();
        self.metrics.captured_ms = now.saturating_duration_since(self.start_time).as_millis() as u64;
        FinishedSession {
            target_path: self.target_path,
            samples: self.buffer.into_samples(),
            stop_reason: reason,
            metrics: self.metrics,
        }
    }
}

/// What a session leaves behind once capture has ended.
#[derive(Debug)]
pub struct FinishedSession {
    pub target_path: PathBuf,
    pub samples: Vec<i16>,
    pub stop_reason: StopReason,
    pub metrics: SessionMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RecorderConfig {
        RecorderConfig::default()
    }

    fn chunk(level: i16) -> AudioChunk {
        // 100 ms at 16 kHz
        AudioChunk::new(vec![level; 1600])
    }

    struct Feed {
        session: RecordingSession,
        now: Instant,
    }

    impl Feed {
        fn new() -> Self {
            let now = Instant::now();
            Self {
                session: RecordingSession::new(PathBuf::from("unused.wav"), now, &config()),
                now,
            }
        }

        fn push(&mut self, level: i16, activity: VoiceActivity) -> Option<StopReason> {
            let chunk = chunk(level);
            self.now += chunk.duration();
            self.session.on_chunk(&chunk, activity, self.now)
        }
    }

    #[test]
    fn silence_just_under_the_limit_is_forgiven_by_speech() {
        let mut feed = Feed::new();
        assert_eq!(feed.push(8000, VoiceActivity::Speech), None);
        for _ in 0..29 {
            assert_eq!(feed.push(10, VoiceActivity::Silence), None);
        }
        // 2900 ms of silence plus a sliver more still is not enough
        feed.now += Duration::from_millis(99);
        assert!(feed.session.is_silent());
        assert_eq!(feed.push(8000, VoiceActivity::Speech), None);
        assert!(!feed.session.is_silent());
    }

    #[test]
    fn three_seconds_of_silence_ends_the_utterance() {
        let mut feed = Feed::new();
        feed.push(8000, VoiceActivity::Speech);
        feed.push(8000, VoiceActivity::Speech);
        let mut stop = None;
        let mut silent_chunks = 0;
        while stop.is_none() {
            silent_chunks += 1;
            stop = feed.push(0, VoiceActivity::Silence);
        }
        assert_eq!(silent_chunks, 30);
        assert_eq!(stop, Some(StopReason::SilenceTimeout { tail_ms: 3000 }));

        let finished = feed.session.finish(stop.unwrap(), feed.now);
        assert_eq!(finished.samples.len(), 3200);
        assert!(finished.samples.iter().all(|&s| s == 8000));
        assert_eq!(finished.metrics.trimmed_samples, 30 * 1600);
    }

    #[test]
    fn duration_cap_fires_regardless_of_speech() {
        let mut feed = Feed::new();
        let start = feed.now;
        for _ in 0..199 {
            assert_eq!(feed.push(9000, VoiceActivity::Speech), None);
            assert_eq!(feed.session.check_duration(feed.now), None);
        }
        feed.push(9000, VoiceActivity::Speech);
        assert_eq!(feed.now - start, Duration::from_secs(20));
        assert_eq!(
            feed.session.check_duration(feed.now),
            Some(StopReason::MaxDuration)
        );
        let finished = feed.session.finish(StopReason::MaxDuration, feed.now);
        assert_eq!(finished.samples.len(), 200 * 1600);
        assert_eq!(finished.metrics.trimmed_samples, 0);
    }

    #[test]
    fn manual_stop_keeps_trailing_silence() {
        let mut feed = Feed::new();
        feed.push(8000, VoiceActivity::Speech);
        feed.push(0, VoiceActivity::Silence);
        let finished = feed.session.finish(StopReason::ManualStop, feed.now);
        assert_eq!(finished.samples.len(), 3200);
    }

    #[test]
    fn all_silent_session_trims_to_nothing() {
        let mut feed = Feed::new();
        let mut stop = None;
        while stop.is_none() {
            stop = feed.push(0, VoiceActivity::Silence);
        }
        let finished = feed.session.finish(stop.unwrap(), feed.now);
        assert!(finished.samples.is_empty());
    }

    #[test]
    fn buffer_drops_samples_past_the_cap() {
        let mut buffer = UtteranceBuffer::with_max_samples(5);
        buffer.push(&[1, 2, 3], VoiceActivity::Speech);
        buffer.push(&[4, 5, 6], VoiceActivity::Speech);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.overflow(), 1);
        assert_eq!(buffer.into_samples(), vec![1, 2, 3, 4, 5]);
    }
}
