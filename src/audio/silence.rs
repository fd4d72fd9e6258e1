//! Energy-based speech/silence classification.

use super::AudioChunk;

/// RMS level below which a chunk counts as silence, on the 16-bit PCM scale.
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 3000.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoiceActivity {
    Speech,
    Silence,
}

/// Classifies chunks by root-mean-square amplitude.
///
/// Holds no state between calls: the answer depends only on the samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceDetector {
    threshold: f64,
}

impl SilenceDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classify(&self, chunk: &AudioChunk) -> VoiceActivity {
        self.classify_samples(chunk.samples())
    }

    pub fn classify_samples(&self, samples: &[i16]) -> VoiceActivity {
        if rms(samples) < self.threshold {
            VoiceActivity::Silence
        } else {
            VoiceActivity::Speech
        }
    }
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD)
    }
}

/// `sqrt(mean(sample^2))`; zero for an empty slice.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples
        .iter()
        .map(|&s| {
            let s = f64::from(s);
            s * s
        })
        .sum();
    (energy / samples.len() as f64).sqrt()
}
