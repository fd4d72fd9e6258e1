use super::{CaptureError, CHANNELS, SAMPLE_RATE};
use std::time::Duration;

/// One block of captured PCM. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl AudioChunk {
    /// Wrap 16 kHz mono samples.
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples,
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback time covered by the chunk.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / u64::from(self.channels.max(1));
        Duration::from_micros(frames * 1_000_000 / u64::from(self.sample_rate.max(1)))
    }
}

/// An open 16 kHz mono input stream.
///
/// Sources are opened and used on the capture thread only, so they do not
/// need to be `Send` (cpal streams are not on every platform).
pub trait AudioSource {
    /// Block until the next chunk is available. An empty chunk or an error
    /// ends the session.
    fn read_chunk(&mut self) -> Result<AudioChunk, CaptureError>;

    /// Release the device. Called exactly once when the session ends.
    fn close(&mut self) {}
}

/// Opens a fresh [`AudioSource`] for each recording session.
pub trait AudioSourceFactory: Send + Sync {
    fn open(&self, chunk_samples: usize) -> Result<Box<dyn AudioSource>, CaptureError>;

    fn name(&self) -> String {
        "audio source".to_string()
    }
}
