//! Finished utterances as 16 kHz mono 16-bit PCM WAV files.

use super::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("wav codec error on {path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is {found}, expected 16000 Hz mono 16-bit PCM")]
    UnexpectedFormat { path: PathBuf, found: String },
}

/// Immutable PCM recording plus its format header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
}

impl AudioArtifact {
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self {
            samples,
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Little-endian sample bytes as they sit after the header.
    pub fn pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate.max(1))
    }

    /// Samples scaled to [-1.0, 1.0) for Whisper.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| f32::from(s) / 32_768.0)
            .collect()
    }

    /// Write via a `.part` sibling and rename, so readers never see a
    /// half-written file at `path`.
    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let partial = partial_path(path);
        let codec = |source| ArtifactError::Codec {
            path: partial.clone(),
            source,
        };
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&partial, spec).map_err(codec)?;
        for &sample in &self.samples {
            writer.write_sample(sample).map_err(codec)?;
        }
        writer.finalize().map_err(codec)?;
        fs::rename(&partial, path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a file, rejecting anything other than 16 kHz mono 16-bit PCM.
    pub fn read(path: &Path) -> Result<Self, ArtifactError> {
        let codec = |source| ArtifactError::Codec {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = WavReader::open(path).map_err(codec)?;
        let spec = reader.spec();
        if spec.sample_rate != SAMPLE_RATE
            || spec.channels != CHANNELS
            || spec.bits_per_sample != BITS_PER_SAMPLE
            || spec.sample_format != SampleFormat::Int
        {
            return Err(ArtifactError::UnexpectedFormat {
                path: path.to_path_buf(),
                found: format!(
                    "{} Hz, {} ch, {}-bit {:?}",
                    spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
                ),
            });
        }
        let samples = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(codec)?;
        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
        })
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_artifact_parses_back_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("turn.wav");
        let samples: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN, 1234, -4321];
        let artifact = AudioArtifact::from_samples(samples.clone());
        artifact.write(&path).unwrap();

        assert!(!partial_path(&path).exists());
        let parsed = AudioArtifact::read(&path).unwrap();
        assert_eq!(parsed.sample_rate(), 16_000);
        assert_eq!(parsed.channels(), 1);
        assert_eq!(parsed.bits_per_sample(), 16);
        assert_eq!(parsed.pcm_bytes(), artifact.pcm_bytes());
        assert_eq!(parsed.samples(), samples.as_slice());
    }

    #[test]
    fn file_carries_canonical_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.wav");
        AudioArtifact::from_samples(vec![7; 10]).write(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 1);
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            16_000
        );
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        assert_eq!(bytes.len(), 44 + 20);
    }

    #[test]
    fn rejects_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let err = AudioArtifact::read(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::UnexpectedFormat { .. }));
    }

    #[test]
    fn float_conversion_stays_in_range() {
        let artifact = AudioArtifact::from_samples(vec![i16::MIN, 0, i16::MAX]);
        let floats = artifact.to_f32();
        assert_eq!(floats[0], -1.0);
        assert_eq!(floats[1], 0.0);
        assert!(floats[2] < 1.0);
    }
}
