//! Speech-to-text: the Whisper engine and the worker thread that serves
//! [`TranscriptionPort`] requests with it.
//!
//! The model is loaded once at startup. Requests queue on a crossbeam
//! channel and are transcribed one at a time on a dedicated thread, so the
//! controller never waits on inference.

use crate::audio::AudioArtifact;
use crate::log_debug;
use crate::log_debug_content;
use crate::ports::{EventSink, TranscriptionEvent, TranscriptionPort, TranscriptionRequest};
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Sender};
use std::os::raw::{c_char, c_uint, c_void};
use std::path::Path;
use std::sync::{Mutex, Once};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

pub const MSG_TRANSCRIBING: &str = "Transcribing...";

/// Anything that can turn 16 kHz mono f32 samples into text.
pub trait TranscriptionEngine: Send {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhisperOptions {
    /// ISO-639-1 code, or `auto` to let Whisper detect it.
    pub lang: String,
    /// Inference threads; 0 picks `num_cpus` capped at 8.
    pub threads: usize,
}

impl Default for WhisperOptions {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            threads: 0,
        }
    }
}

impl WhisperOptions {
    fn thread_count(&self) -> i32 {
        let threads = if self.threads == 0 {
            num_cpus::get().min(8)
        } else {
            self.threads
        };
        threads.max(1) as i32
    }
}

/// Loaded GGML model plus decoding options.
pub struct WhisperTranscriber {
    ctx: WhisperContext,
    options: WhisperOptions,
}

impl WhisperTranscriber {
    /// Load the model at `model_path`. whisper.cpp prints its own banner on
    /// stderr while loading; that output is swallowed.
    pub fn new(model_path: &Path, options: WhisperOptions) -> Result<Self> {
        install_whisper_log_silencer();
        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("whisper model path must be valid UTF-8"))?;
        let ctx = {
            let _quiet = gag::Gag::stderr().ok();
            WhisperContext::new_with_params(path, WhisperContextParameters::default())
        }
        .with_context(|| format!("failed to load whisper model '{}'", model_path.display()))?;
        Ok(Self { ctx, options })
    }
}

impl TranscriptionEngine for WhisperTranscriber {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        let mut state = self
            .ctx
            .create_state()
            .context("failed to create whisper state")?;
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if self.options.lang.eq_ignore_ascii_case("auto") {
            params.set_language(None);
            params.set_detect_language(true);
        } else {
            params.set_language(Some(&self.options.lang));
            params.set_detect_language(false);
        }
        params.set_n_threads(self.options.thread_count());
        params.set_print_progress(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_translate(false);
        params.set_token_timestamps(false);
        state
            .full(params, samples)
            .context("whisper inference failed")?;

        let segments = state
            .full_n_segments()
            .context("failed to read whisper segment count")?;
        let mut transcript = String::new();
        for i in 0..segments.max(0) {
            match state.full_get_segment_text_lossy(i) {
                Ok(text) => transcript.push_str(&text),
                Err(err) => log_debug(&format!("failed to read whisper segment {i}: {err}")),
            }
        }
        Ok(transcript.trim().to_string())
    }
}

fn install_whisper_log_silencer() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| unsafe {
        whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
    });
}

unsafe extern "C" fn whisper_log_callback(
    _level: c_uint,
    _text: *const c_char,
    _user_data: *mut c_void,
) {
    // whisper.cpp would otherwise write straight to stderr mid-conversation.
}

struct Job {
    request: TranscriptionRequest,
    events: EventSink<TranscriptionEvent>,
}

/// [`TranscriptionPort`] backed by one engine on one worker thread.
pub struct TranscriptionWorker {
    jobs: Option<Sender<Job>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TranscriptionWorker {
    pub fn spawn(engine: Box<dyn TranscriptionEngine>) -> Result<Self> {
        let (jobs, queue) = unbounded::<Job>();
        let handle = thread::Builder::new()
            .name("voicechat-stt".to_string())
            .spawn(move || {
                let mut engine = engine;
                for job in queue.iter() {
                    serve(engine.as_mut(), job);
                }
            })
            .context("failed to spawn transcription thread")?;
        Ok(Self {
            jobs: Some(jobs),
            worker: Mutex::new(Some(handle)),
        })
    }
}

fn serve(engine: &mut dyn TranscriptionEngine, job: Job) {
    let Job { request, events } = job;
    let id = request.id;
    events(TranscriptionEvent::Progress {
        id,
        message: MSG_TRANSCRIBING.to_string(),
    });
    let started = Instant::now();
    let outcome = AudioArtifact::read(&request.audio_path)
        .map_err(anyhow::Error::from)
        .and_then(|artifact| engine.transcribe(&artifact.to_f32()));
    let elapsed_ms = started.elapsed().as_millis();
    match outcome {
        Ok(text) => {
            log_debug(&format!("stt {id}: {} chars in {elapsed_ms} ms", text.len()));
            log_debug_content(&format!("stt {id} transcript: {text:?}"));
            events(TranscriptionEvent::Result { id, text });
        }
        Err(err) => {
            log_debug(&format!("stt {id} failed after {elapsed_ms} ms: {err:#}"));
            events(TranscriptionEvent::Failed {
                id,
                reason: format!("{err:#}"),
            });
        }
    }
}

impl TranscriptionPort for TranscriptionWorker {
    fn transcribe(&self, request: TranscriptionRequest, events: EventSink<TranscriptionEvent>) {
        let id = request.id;
        let sent = self
            .jobs
            .as_ref()
            .map(|jobs| jobs.send(Job { request, events: events.clone() }).is_ok())
            .unwrap_or(false);
        if !sent {
            events(TranscriptionEvent::Failed {
                id,
                reason: "transcription worker is not running".to_string(),
            });
        }
    }
}

impl Drop for TranscriptionWorker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop once pending jobs drain.
        self.jobs.take();
        let handle = crate::lock_or_recover(&self.worker, "stt worker").take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log_debug("transcription worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RequestId;
    use crossbeam_channel::Receiver;
    use std::sync::Arc;
    use std::time::Duration;

    struct LengthEngine;

    impl TranscriptionEngine for LengthEngine {
        fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
            if samples.is_empty() {
                return Err(anyhow!("nothing to transcribe"));
            }
            Ok(format!("{} samples", samples.len()))
        }
    }

    fn sink() -> (EventSink<TranscriptionEvent>, Receiver<TranscriptionEvent>) {
        let (tx, rx) = unbounded();
        let sink: EventSink<TranscriptionEvent> = Arc::new(move |event: TranscriptionEvent| {
            let _ = tx.send(event);
        });
        (sink, rx)
    }

    fn recv(rx: &Receiver<TranscriptionEvent>) -> TranscriptionEvent {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn transcriber_rejects_missing_model() {
        let result = WhisperTranscriber::new(Path::new("/no/such/model.bin"), WhisperOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn worker_reports_progress_then_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turn.wav");
        AudioArtifact::from_samples(vec![100; 320]).write(&path).unwrap();

        let worker = TranscriptionWorker::spawn(Box::new(LengthEngine)).unwrap();
        let (events, rx) = sink();
        worker.transcribe(
            TranscriptionRequest {
                id: RequestId(7),
                audio_path: path,
            },
            events,
        );

        assert_eq!(
            recv(&rx),
            TranscriptionEvent::Progress {
                id: RequestId(7),
                message: MSG_TRANSCRIBING.to_string()
            }
        );
        assert_eq!(
            recv(&rx),
            TranscriptionEvent::Result {
                id: RequestId(7),
                text: "320 samples".to_string()
            }
        );
    }

    #[test]
    fn missing_artifact_fails_the_request() {
        let worker = TranscriptionWorker::spawn(Box::new(LengthEngine)).unwrap();
        let (events, rx) = sink();
        worker.transcribe(
            TranscriptionRequest {
                id: RequestId(1),
                audio_path: "/no/such/artifact.wav".into(),
            },
            events,
        );
        assert!(matches!(recv(&rx), TranscriptionEvent::Progress { .. }));
        assert!(matches!(
            recv(&rx),
            TranscriptionEvent::Failed { id: RequestId(1), .. }
        ));
    }

    #[test]
    fn requests_are_served_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let worker = TranscriptionWorker::spawn(Box::new(LengthEngine)).unwrap();
        let (events, rx) = sink();
        for n in 1..=3u64 {
            let path = dir.path().join(format!("{n}.wav"));
            AudioArtifact::from_samples(vec![1; n as usize]).write(&path).unwrap();
            worker.transcribe(
                TranscriptionRequest {
                    id: RequestId(n),
                    audio_path: path,
                },
                events.clone(),
            );
        }
        drop(worker);
        let results: Vec<_> = rx
            .try_iter()
            .filter_map(|event| match event {
                TranscriptionEvent::Result { id, text } => Some((id, text)),
                _ => None,
            })
            .collect();
        assert_eq!(
            results,
            vec![
                (RequestId(1), "1 samples".to_string()),
                (RequestId(2), "2 samples".to_string()),
                (RequestId(3), "3 samples".to_string()),
            ]
        );
    }
}
