//! Device-rate to 16 kHz conversion for microphone frames.

use super::SAMPLE_RATE;
use crate::log_debug;
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use std::f32::consts::PI;

// Rates outside this window are passed through untouched rather than
// stretched by an absurd ratio.
const MIN_DEVICE_RATE: u32 = 2_000;
const MAX_DEVICE_RATE: u32 = 384_000;
const MAX_FIR_TAPS: usize = 129;

/// Stateful converter for fixed-size frames at one device rate.
pub(super) enum RateConverter {
    Passthrough,
    #[cfg(feature = "high-quality-audio")]
    Sinc {
        resampler: Box<SincFixedIn<f32>>,
        device_rate: u32,
    },
    Linear {
        ratio: f32,
        taps: Vec<f32>,
    },
}

impl RateConverter {
    /// Pick the best converter for `device_rate`. `frame_len` is the exact
    /// number of mono samples every `convert` call will receive.
    pub(super) fn new(device_rate: u32, frame_len: usize) -> Self {
        if device_rate == SAMPLE_RATE || !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate)
        {
            if device_rate != SAMPLE_RATE {
                log_debug(&format!(
                    "device rate {device_rate} Hz out of range; passing audio through"
                ));
            }
            return RateConverter::Passthrough;
        }
        #[cfg(feature = "high-quality-audio")]
        {
            match sinc(device_rate, frame_len) {
                Ok(resampler) => {
                    return RateConverter::Sinc {
                        resampler: Box::new(resampler),
                        device_rate,
                    }
                }
                Err(err) => log_debug(&format!(
                    "sinc resampler unavailable ({err}); using linear fallback"
                )),
            }
        }
        #[cfg(not(feature = "high-quality-audio"))]
        let _ = frame_len;
        Self::linear(device_rate)
    }

    pub(super) fn linear(device_rate: u32) -> Self {
        let ratio = SAMPLE_RATE as f32 / device_rate.max(1) as f32;
        let taps = if device_rate > SAMPLE_RATE {
            low_pass_taps(device_rate)
        } else {
            Vec::new()
        };
        RateConverter::Linear { ratio, taps }
    }

    /// Convert one frame. Output length tracks `frame_len * 16000 / rate`
    /// on average; individual frames may differ by a sample or so.
    pub(super) fn convert(&mut self, frame: &[f32]) -> Vec<f32> {
        match self {
            RateConverter::Passthrough => frame.to_vec(),
            #[cfg(feature = "high-quality-audio")]
            RateConverter::Sinc {
                resampler,
                device_rate,
            } => match resampler.process(std::slice::from_ref(&frame), None) {
                Ok(mut channels) => channels.pop().unwrap_or_default(),
                Err(err) => {
                    log_debug(&format!(
                        "sinc resampler failed ({err}); switching to linear"
                    ));
                    let rate = *device_rate;
                    *self = Self::linear(rate);
                    self.convert(frame)
                }
            },
            RateConverter::Linear { ratio, taps } => {
                if taps.is_empty() {
                    interpolate(frame, *ratio)
                } else {
                    interpolate(&fir(frame, taps), *ratio)
                }
            }
        }
    }
}

#[cfg(feature = "high-quality-audio")]
fn sinc(device_rate: u32, frame_len: usize) -> Result<SincFixedIn<f32>, String> {
    let params = InterpolationParameters {
        sinc_len: 64,
        f_cutoff: 0.9,
        interpolation: InterpolationType::Cubic,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = f64::from(SAMPLE_RATE) / f64::from(device_rate);
    SincFixedIn::<f32>::new(ratio, 1.0, params, frame_len.max(1), 1).map_err(|e| e.to_string())
}

/// Map a float sample in [-1.0, 1.0] onto the 16-bit scale.
pub(super) fn quantize(sample: f32) -> i16 {
    (sample * 32_768.0).round().clamp(-32_768.0, 32_767.0) as i16
}

fn interpolate(input: &[f32], ratio: f32) -> Vec<f32> {
    let out_len = (input.len() as f32 * ratio).round() as usize;
    let last = input.last().copied().unwrap_or(0.0);
    (0..out_len)
        .map(|i| {
            let pos = i as f32 / ratio;
            let idx = pos as usize;
            match (input.get(idx), input.get(idx + 1)) {
                (Some(&a), Some(&b)) => {
                    let frac = pos - idx as f32;
                    a + (b - a) * frac
                }
                _ => last,
            }
        })
        .collect()
}

/// Hamming-windowed sinc low-pass at the 8 kHz Nyquist of the target rate.
fn low_pass_taps(device_rate: u32) -> Vec<f32> {
    let decimation = device_rate as f32 / SAMPLE_RATE as f32;
    let count = ((decimation * 4.0).ceil() as usize).max(11) | 1;
    let count = count.min(MAX_FIR_TAPS);
    let cutoff = (SAMPLE_RATE as f32 * 0.5 / device_rate as f32).min(0.499);
    let mid = (count - 1) as f32 / 2.0;
    let mut taps: Vec<f32> = (0..count)
        .map(|n| {
            let t = n as f32 - mid;
            let ideal = if t == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * t).sin() / (PI * t)
            };
            let window = 0.54 - 0.46 * (2.0 * PI * n as f32 / (count - 1) as f32).cos();
            ideal * window
        })
        .collect();
    let gain: f32 = taps.iter().sum();
    if gain != 0.0 {
        taps.iter_mut().for_each(|tap| *tap /= gain);
    }
    taps
}

fn fir(input: &[f32], taps: &[f32]) -> Vec<f32> {
    let half = taps.len() / 2;
    (0..input.len())
        .map(|n| {
            taps.iter()
                .enumerate()
                .filter_map(|(k, tap)| {
                    (n + k)
                        .checked_sub(half)
                        .and_then(|idx| input.get(idx))
                        .map(|s| s * tap)
                })
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_rate_is_untouched() {
        let mut converter = RateConverter::new(16_000, 4);
        assert!(matches!(converter, RateConverter::Passthrough));
        assert_eq!(converter.convert(&[0.1, 0.2, 0.3, 0.4]), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn linear_downsample_from_48k_keeps_dc_level() {
        let mut converter = RateConverter::linear(48_000);
        let out = converter.convert(&[0.5; 4800]);
        assert_eq!(out.len(), 1600);
        // skip the filter's edge where the window runs off the frame
        for sample in &out[20..1580] {
            assert!((sample - 0.5).abs() < 1e-3, "sample {sample}");
        }
    }

    #[test]
    fn linear_upsample_doubles_length() {
        let mut converter = RateConverter::linear(8_000);
        let out = converter.convert(&[0.0, 1.0, 0.0, -1.0]);
        assert_eq!(out.len(), 8);
        assert_eq!(out[1], 0.5);
    }

    #[test]
    fn quantize_saturates() {
        assert_eq!(quantize(2.0), i16::MAX);
        assert_eq!(quantize(-2.0), i16::MIN);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(-1.0), i16::MIN);
        assert_eq!(quantize(f32::from(1234i16) / 32_768.0), 1234);
    }

    #[cfg(feature = "high-quality-audio")]
    #[test]
    fn sinc_output_averages_to_target_rate() {
        let frame_len = 4410;
        let mut converter = RateConverter::new(44_100, frame_len);
        assert!(matches!(converter, RateConverter::Sinc { .. }));
        let frame = vec![0.25f32; frame_len];
        let total: usize = (0..10).map(|_| converter.convert(&frame).len()).sum();
        assert!((15_800..=16_200).contains(&total), "total {total}");
    }
}
