//! System microphone access via cpal.
//!
//! Every session opens its own stream on the capture thread and tears it
//! down in `close()`, so an idle recorder holds no device.

use super::dispatch::{DispatchStats, FrameDispatcher};
use super::resample::{quantize, RateConverter};
use super::{AudioChunk, AudioSource, AudioSourceFactory, CaptureError, SAMPLE_RATE};
use crate::log_debug;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, SizedSample, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FRAME_QUEUE_DEPTH: usize = 64;
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Names of the input devices the default host exposes.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("no input devices available")?;
    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

pub(super) fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

fn classify_open_error(context: &str, err: impl std::fmt::Display) -> CaptureError {
    let message = err.to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("permission") || lowered.contains("not authorized") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::DeviceUnavailable(format!("{context}: {message}"))
    }
}

/// Opens the named (or default) input device for each session.
#[derive(Debug, Clone, Default)]
pub struct MicrophoneFactory {
    device_name: Option<String>,
}

impl MicrophoneFactory {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn device(&self) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match self.device_name.as_deref() {
            Some(name) => host
                .input_devices()
                .map_err(|err| classify_open_error("enumerating input devices", err))?
                .find(|device| device.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::DeviceUnavailable(format!("input device '{name}' not found"))
                }),
            None => host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnavailable("no default input device available".to_string())
            }),
        }
    }
}

/// 16 kHz mono i16 straight from the device when it offers that, else the
/// device default.
fn pick_config(device: &cpal::Device) -> Result<SupportedStreamConfig, CaptureError> {
    let native = device.supported_input_configs().ok().and_then(|mut ranges| {
        ranges.find(|range| {
            range.channels() == 1
                && range.sample_format() == SampleFormat::I16
                && range.min_sample_rate().0 <= SAMPLE_RATE
                && range.max_sample_rate().0 >= SAMPLE_RATE
        })
    });
    match native {
        Some(range) => Ok(range.with_sample_rate(SampleRate(SAMPLE_RATE))),
        None => device
            .default_input_config()
            .map_err(|err| classify_open_error("querying default input config", err)),
    }
}

impl AudioSourceFactory for MicrophoneFactory {
    fn open(&self, chunk_samples: usize) -> Result<Box<dyn AudioSource>, CaptureError> {
        let device = self.device()?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());
        let supported = pick_config(&device)?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let device_rate = config.sample_rate.0;
        let frame_len = ((chunk_samples as u64 * u64::from(device_rate)) / u64::from(SAMPLE_RATE))
            .max(1) as usize;
        log_debug(&format!(
            "mic '{device_name}': format={format:?} rate={device_rate}Hz channels={} frame={frame_len}",
            config.channels
        ));

        let (sender, receiver) = bounded(FRAME_QUEUE_DEPTH);
        let stats = Arc::new(DispatchStats::default());
        let fault = Arc::new(Mutex::new(None));
        let dispatcher = FrameDispatcher::new(frame_len, sender, Arc::clone(&stats));
        let stream = match format {
            SampleFormat::I16 => build_stream(&device, &config, dispatcher, &fault, |s: i16| {
                f32::from(s) / 32_768.0
            }),
            SampleFormat::U16 => build_stream(&device, &config, dispatcher, &fault, |s: u16| {
                (f32::from(s) - 32_768.0) / 32_768.0
            }),
            SampleFormat::F32 => build_stream(&device, &config, dispatcher, &fault, |s: f32| s),
            other => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|err| classify_open_error("opening input stream", err))?;
        stream
            .play()
            .map_err(|err| classify_open_error("starting input stream", err))?;

        let chunk_ms = (chunk_samples as u64 * 1000) / u64::from(SAMPLE_RATE);
        Ok(Box::new(MicrophoneSource {
            stream: Some(stream),
            receiver,
            converter: RateConverter::new(device_rate, frame_len),
            pending: Vec::with_capacity(chunk_samples * 2),
            chunk_samples: chunk_samples.max(1),
            read_timeout: Duration::from_millis(chunk_ms * 4).max(MIN_READ_TIMEOUT),
            stats,
            fault,
            device_name,
        }))
    }

    fn name(&self) -> String {
        self.device_name
            .clone()
            .unwrap_or_else(|| "default microphone".to_string())
    }
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut dispatcher: FrameDispatcher,
    fault: &Arc<Mutex<Option<String>>>,
    convert: F,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    F: Fn(T) -> f32 + Send + 'static,
{
    let channels = usize::from(config.channels.max(1));
    let fault = Arc::clone(fault);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| dispatcher.push(data, channels, &convert),
        move |err| {
            log_debug(&format!("audio_stream_error: {err}"));
            *crate::lock_or_recover(&fault, "stream fault") = Some(err.to_string());
        },
        None,
    )
}

/// One open cpal input stream, converted to 16 kHz mono i16 chunks.
struct MicrophoneSource {
    stream: Option<cpal::Stream>,
    receiver: Receiver<Vec<f32>>,
    converter: RateConverter,
    pending: Vec<i16>,
    chunk_samples: usize,
    read_timeout: Duration,
    stats: Arc<DispatchStats>,
    fault: Arc<Mutex<Option<String>>>,
    device_name: String,
}

impl AudioSource for MicrophoneSource {
    fn read_chunk(&mut self) -> Result<AudioChunk, CaptureError> {
        while self.pending.len() < self.chunk_samples {
            if let Some(fault) = crate::lock_or_recover(&self.fault, "stream fault").take() {
                return Err(CaptureError::DeviceReadFailure(fault));
            }
            match self.receiver.recv_timeout(self.read_timeout) {
                Ok(frame) => {
                    let converted = self.converter.convert(&frame);
                    self.pending.extend(converted.into_iter().map(quantize));
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CaptureError::DeviceReadFailure(format!(
                        "no audio from '{}' within {} ms. {}",
                        self.device_name,
                        self.read_timeout.as_millis(),
                        mic_permission_hint()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::DeviceReadFailure(
                        "audio stream disconnected".to_string(),
                    ));
                }
            }
        }
        let samples: Vec<i16> = self.pending.drain(..self.chunk_samples).collect();
        Ok(AudioChunk::new(samples))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                log_debug(&format!("failed to pause audio stream: {err}"));
            }
        }
        log_debug(&format!(
            "mic '{}' closed: frames sent={} dropped={}",
            self.device_name,
            self.stats.sent(),
            self.stats.dropped()
        ));
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        if self.stream.is_some() {
            self.close();
        }
    }
}
