//! The conversation state machine.
//!
//! [`Conversation`] owns no threads and performs no I/O: every input is an
//! [`Event`], every effect is an [`Action`] for the driver to carry out. That
//! keeps the wake/listen/speak sequencing testable without a microphone.

use crate::audio::{CaptureError, MSG_PERMISSION_DENIED};
use crate::intent::Corpus;
use crate::log_debug;
use crate::log_debug_content;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

pub const MSG_WAITING_FOR_WAKE_WORD: &str = "Waiting for wake word...";
pub const MSG_WAKE_WORD_DETECTED: &str = "Wake word detected!";
pub const MSG_LISTENING: &str = "Listening...";
pub const MSG_SPEAKING: &str = "Speaking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationState {
    AwaitingWakeWord,
    Listening,
    Speaking,
}

impl ConversationState {
    pub fn label(self) -> &'static str {
        match self {
            ConversationState::AwaitingWakeWord => "awaiting_wake_word",
            ConversationState::Listening => "listening",
            ConversationState::Speaking => "speaking",
        }
    }
}

/// What a recording (and the transcription made from it) was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingKind {
    WakeProbe,
    Turn,
}

impl RecordingKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordingKind::WakeProbe => "wake_probe",
            RecordingKind::Turn => "turn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The driver is up; start probing for the wake word.
    Begin,
    WakeTick,
    ProbeRestartDue,
    /// The pause after a failed turn is over; listen again.
    TurnRetryDue,
    RecordingDone {
        kind: RecordingKind,
        path: PathBuf,
    },
    RecordingFailed {
        kind: RecordingKind,
        error: CaptureError,
    },
    Transcript {
        kind: RecordingKind,
        text: String,
    },
    TranscriptionFailed {
        kind: RecordingKind,
        reason: String,
    },
    SpeechStarted {
        utterance_id: String,
    },
    SpeechFinished {
        utterance_id: String,
        failed: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Status(String),
    StartRecording { kind: RecordingKind },
    StopRecording,
    Transcribe { kind: RecordingKind, path: PathBuf },
    Speak { text: String, utterance_id: String },
    ArmWakeTimer,
    CancelWakeTimer,
    ScheduleProbeRestart,
    CancelProbeRestart,
    ScheduleTurnRetry,
    Exchange { heard: String, reply: String },
}

pub struct Conversation {
    state: ConversationState,
    wake_word: String,
    fallback: String,
    corpus: Arc<Corpus>,
    rng: StdRng,
    replies: u64,
    pending_reply: Option<String>,
    probe_in_flight: bool,
    /// The reply being spoken answers a failed capture, so the next turn
    /// recording waits for the retry delay.
    retry_after_reply: bool,
}

impl Conversation {
    pub fn new(wake_word: &str, fallback: &str, corpus: Arc<Corpus>) -> Self {
        Self::with_rng(wake_word, fallback, corpus, StdRng::from_entropy())
    }

    /// Same as [`Conversation::new`] with a fixed RNG, for reproducible
    /// response picks.
    pub fn with_rng(wake_word: &str, fallback: &str, corpus: Arc<Corpus>, rng: StdRng) -> Self {
        Self {
            state: ConversationState::AwaitingWakeWord,
            wake_word: wake_word.trim().to_lowercase(),
            fallback: fallback.to_string(),
            corpus,
            rng,
            replies: 0,
            pending_reply: None,
            probe_in_flight: false,
            retry_after_reply: false,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Utterance id of the reply currently being spoken.
    pub fn pending_reply(&self) -> Option<&str> {
        self.pending_reply.as_deref()
    }

    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        use ConversationState::*;
        match (self.state, event) {
            (AwaitingWakeWord, Event::Begin) => vec![
                Action::Status(MSG_WAITING_FOR_WAKE_WORD.to_string()),
                Action::StartRecording {
                    kind: RecordingKind::WakeProbe,
                },
                Action::ArmWakeTimer,
            ],
            (AwaitingWakeWord, Event::WakeTick) => {
                vec![Action::StopRecording, Action::ScheduleProbeRestart]
            }
            (AwaitingWakeWord, Event::ProbeRestartDue) => vec![Action::StartRecording {
                kind: RecordingKind::WakeProbe,
            }],
            (
                AwaitingWakeWord,
                Event::RecordingDone {
                    kind: RecordingKind::WakeProbe,
                    path,
                },
            ) => {
                if self.probe_in_flight {
                    log_debug("wake probe skipped: previous probe still transcribing");
                    return Vec::new();
                }
                self.probe_in_flight = true;
                vec![Action::Transcribe {
                    kind: RecordingKind::WakeProbe,
                    path,
                }]
            }
            (
                _,
                Event::Transcript {
                    kind: RecordingKind::WakeProbe,
                    text,
                },
            ) => {
                self.probe_in_flight = false;
                if self.state == AwaitingWakeWord && self.heard_wake_word(&text) {
                    self.wake()
                } else {
                    Vec::new()
                }
            }
            (
                _,
                Event::TranscriptionFailed {
                    kind: RecordingKind::WakeProbe,
                    reason,
                },
            ) => {
                self.probe_in_flight = false;
                log_debug(&format!("wake probe transcription failed: {reason}"));
                Vec::new()
            }
            (
                Listening,
                Event::RecordingDone {
                    kind: RecordingKind::Turn,
                    path,
                },
            ) => vec![Action::Transcribe {
                kind: RecordingKind::Turn,
                path,
            }],
            (
                Listening,
                Event::RecordingFailed {
                    kind: RecordingKind::Turn,
                    error,
                },
            ) => match error {
                CaptureError::EmptyCapture => vec![Action::StartRecording {
                    kind: RecordingKind::Turn,
                }],
                // No microphone, so nothing to answer; report it and retry.
                CaptureError::PermissionDenied | CaptureError::DeviceUnavailable(_) => {
                    log_debug(&format!("turn recording failed: {error}"));
                    vec![
                        Action::Status(capture_status(&error)),
                        Action::ScheduleTurnRetry,
                    ]
                }
                other => {
                    log_debug(&format!("turn recording failed: {other}"));
                    self.retry_after_reply = true;
                    self.reply("")
                }
            },
            (Listening, Event::TurnRetryDue) => vec![Action::StartRecording {
                kind: RecordingKind::Turn,
            }],
            (
                Listening,
                Event::Transcript {
                    kind: RecordingKind::Turn,
                    text,
                },
            ) => self.reply(&text),
            (
                Listening,
                Event::TranscriptionFailed {
                    kind: RecordingKind::Turn,
                    reason,
                },
            ) => {
                log_debug(&format!("turn transcription failed: {reason}"));
                self.reply("")
            }
            (Speaking, Event::SpeechStarted { utterance_id })
                if self.is_pending(&utterance_id) =>
            {
                vec![Action::StopRecording]
            }
            (
                Speaking,
                Event::SpeechFinished {
                    utterance_id,
                    failed,
                },
            ) if self.is_pending(&utterance_id) => {
                if failed {
                    log_debug(&format!("speech {utterance_id} failed; resuming listening"));
                }
                self.pending_reply = None;
                self.state = Listening;
                let next = if std::mem::take(&mut self.retry_after_reply) || failed {
                    Action::ScheduleTurnRetry
                } else {
                    Action::StartRecording {
                        kind: RecordingKind::Turn,
                    }
                };
                vec![Action::Status(MSG_LISTENING.to_string()), next]
            }
            (state, event) => {
                log_debug(&format!(
                    "conversation: ignoring {} in state {}",
                    event_label(&event),
                    state.label()
                ));
                Vec::new()
            }
        }
    }

    fn heard_wake_word(&self, text: &str) -> bool {
        !self.wake_word.is_empty() && text.to_lowercase().contains(&self.wake_word)
    }

    fn is_pending(&self, utterance_id: &str) -> bool {
        self.pending_reply.as_deref() == Some(utterance_id)
    }

    fn wake(&mut self) -> Vec<Action> {
        self.state = ConversationState::Listening;
        vec![
            Action::Status(MSG_WAKE_WORD_DETECTED.to_string()),
            Action::CancelWakeTimer,
            Action::CancelProbeRestart,
            Action::StopRecording,
            Action::StartRecording {
                kind: RecordingKind::Turn,
            },
            Action::Status(MSG_LISTENING.to_string()),
        ]
    }

    fn reply(&mut self, transcript: &str) -> Vec<Action> {
        let heard = normalize_transcript(transcript);
        let reply = if heard.is_empty() {
            self.fallback.clone()
        } else {
            self.corpus
                .respond(&heard, &mut self.rng)
                .unwrap_or(self.fallback.as_str())
                .to_string()
        };
        log_debug_content(&format!("heard {heard:?}, replying {reply:?}"));

        self.replies += 1;
        let utterance_id = format!("reply-{}", self.replies);
        self.pending_reply = Some(utterance_id.clone());
        self.state = ConversationState::Speaking;
        vec![
            Action::Exchange {
                heard,
                reply: reply.clone(),
            },
            Action::Status(MSG_SPEAKING.to_string()),
            Action::StopRecording,
            Action::Speak {
                text: reply,
                utterance_id,
            },
        ]
    }
}

fn event_label(event: &Event) -> String {
    match event {
        Event::Begin => "begin".to_string(),
        Event::WakeTick => "wake_tick".to_string(),
        Event::ProbeRestartDue => "probe_restart".to_string(),
        Event::TurnRetryDue => "turn_retry".to_string(),
        Event::RecordingDone { kind, .. } => format!("recording_done({})", kind.label()),
        Event::RecordingFailed { kind, error } => {
            format!("recording_failed({}, {})", kind.label(), error.label())
        }
        Event::Transcript { kind, .. } => format!("transcript({})", kind.label()),
        Event::TranscriptionFailed { kind, .. } => {
            format!("transcription_failed({})", kind.label())
        }
        Event::SpeechStarted { utterance_id } => format!("speech_started({utterance_id})"),
        Event::SpeechFinished { utterance_id, .. } => format!("speech_finished({utterance_id})"),
    }
}

fn capture_status(error: &CaptureError) -> String {
    match error {
        CaptureError::PermissionDenied => MSG_PERMISSION_DENIED.to_string(),
        other => format!("Error: {other}"),
    }
}

/// Lowercase a transcript and drop what the corpus can never match:
/// bracketed non-speech markers, punctuation and runs of whitespace.
pub fn normalize_transcript(text: &str) -> String {
    static MARKERS_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let markers = MARKERS_RE.get_or_init(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\*[^*]*\*").ok());
    let lowered = text.to_lowercase();
    let without_markers = match markers {
        Some(re) => re.replace_all(&lowered, " ").into_owned(),
        None => lowered,
    };
    without_markers
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "I didn't understand that. Can you rephrase?";

    fn conversation() -> Conversation {
        let corpus = Corpus::from_json(
            r#"[
                {"utterances": [["how", "are", "you"]], "responses": ["I'm doing well."]},
                {"utterances": [["what", "is", "your", "name"]], "responses": ["I'm Marcus."]}
            ]"#,
        )
        .unwrap();
        Conversation::with_rng("Marcus", FALLBACK, Arc::new(corpus), StdRng::seed_from_u64(3))
    }

    fn probe_done() -> Event {
        Event::RecordingDone {
            kind: RecordingKind::WakeProbe,
            path: PathBuf::from("/tmp/wake_word_temp.wav"),
        }
    }

    fn turn_done() -> Event {
        Event::RecordingDone {
            kind: RecordingKind::Turn,
            path: PathBuf::from("/tmp/conversation.wav"),
        }
    }

    fn probe_text(text: &str) -> Event {
        Event::Transcript {
            kind: RecordingKind::WakeProbe,
            text: text.to_string(),
        }
    }

    fn turn_text(text: &str) -> Event {
        Event::Transcript {
            kind: RecordingKind::Turn,
            text: text.to_string(),
        }
    }

    fn awake() -> Conversation {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        conv.handle(probe_done());
        conv.handle(probe_text("hey marcus"));
        assert_eq!(conv.state(), ConversationState::Listening);
        conv
    }

    fn spoken(actions: &[Action]) -> Option<(&str, &str)> {
        actions.iter().find_map(|action| match action {
            Action::Speak { text, utterance_id } => Some((text.as_str(), utterance_id.as_str())),
            _ => None,
        })
    }

    #[test]
    fn begin_starts_probe_and_timer() {
        let mut conv = conversation();
        assert_eq!(
            conv.handle(Event::Begin),
            vec![
                Action::Status(MSG_WAITING_FOR_WAKE_WORD.to_string()),
                Action::StartRecording {
                    kind: RecordingKind::WakeProbe
                },
                Action::ArmWakeTimer,
            ]
        );
        assert_eq!(conv.state(), ConversationState::AwaitingWakeWord);
    }

    #[test]
    fn tick_stops_probe_and_schedules_restart() {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        assert_eq!(
            conv.handle(Event::WakeTick),
            vec![Action::StopRecording, Action::ScheduleProbeRestart]
        );
        assert_eq!(
            conv.handle(Event::ProbeRestartDue),
            vec![Action::StartRecording {
                kind: RecordingKind::WakeProbe
            }]
        );
    }

    #[test]
    fn finished_probe_is_transcribed_once_at_a_time() {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        assert!(matches!(
            conv.handle(probe_done()).as_slice(),
            [Action::Transcribe {
                kind: RecordingKind::WakeProbe,
                ..
            }]
        ));
        assert!(conv.handle(probe_done()).is_empty());
        conv.handle(probe_text("nothing here"));
        assert_eq!(conv.handle(probe_done()).len(), 1);
    }

    #[test]
    fn wake_word_matches_case_insensitive_substring() {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        conv.handle(probe_done());
        let actions = conv.handle(probe_text("Okay MARCUSS, are you there?"));
        assert_eq!(
            actions,
            vec![
                Action::Status(MSG_WAKE_WORD_DETECTED.to_string()),
                Action::CancelWakeTimer,
                Action::CancelProbeRestart,
                Action::StopRecording,
                Action::StartRecording {
                    kind: RecordingKind::Turn
                },
                Action::Status(MSG_LISTENING.to_string()),
            ]
        );
        assert_eq!(conv.state(), ConversationState::Listening);
    }

    #[test]
    fn probe_without_wake_word_keeps_waiting() {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        conv.handle(probe_done());
        assert!(conv.handle(probe_text("mark us")).is_empty());
        assert_eq!(conv.state(), ConversationState::AwaitingWakeWord);
    }

    #[test]
    fn late_probe_results_are_ignored_after_wake() {
        let mut conv = awake();
        assert!(conv.handle(probe_done()).is_empty());
        assert!(conv.handle(probe_text("marcus")).is_empty());
        assert!(conv.handle(Event::WakeTick).is_empty());
        assert!(conv.handle(Event::ProbeRestartDue).is_empty());
        assert_eq!(conv.state(), ConversationState::Listening);
    }

    #[test]
    fn matched_turn_is_answered_from_the_corpus() {
        let mut conv = awake();
        assert!(matches!(
            conv.handle(turn_done()).as_slice(),
            [Action::Transcribe {
                kind: RecordingKind::Turn,
                ..
            }]
        ));
        let actions = conv.handle(turn_text(" How are you? "));
        assert_eq!(
            actions[0],
            Action::Exchange {
                heard: "how are you".to_string(),
                reply: "I'm doing well.".to_string()
            }
        );
        assert!(actions.contains(&Action::StopRecording));
        assert_eq!(spoken(&actions), Some(("I'm doing well.", "reply-1")));
        assert_eq!(conv.state(), ConversationState::Speaking);
    }

    #[test]
    fn unmatched_or_blank_turns_get_the_fallback() {
        let mut conv = awake();
        let actions = conv.handle(turn_text("turn on the kitchen lights"));
        assert_eq!(spoken(&actions), Some((FALLBACK, "reply-1")));
        conv.handle(Event::SpeechFinished {
            utterance_id: "reply-1".to_string(),
            failed: false,
        });

        let actions = conv.handle(turn_text("[BLANK_AUDIO]"));
        assert_eq!(spoken(&actions), Some((FALLBACK, "reply-2")));
        assert!(actions.contains(&Action::Exchange {
            heard: String::new(),
            reply: FALLBACK.to_string()
        }));
    }

    #[test]
    fn speech_events_for_the_current_reply_drive_the_cycle() {
        let mut conv = awake();
        conv.handle(turn_text("what is your name"));
        assert_eq!(conv.pending_reply(), Some("reply-1"));

        assert!(conv
            .handle(Event::SpeechStarted {
                utterance_id: "reply-0".to_string()
            })
            .is_empty());
        assert_eq!(
            conv.handle(Event::SpeechStarted {
                utterance_id: "reply-1".to_string()
            }),
            vec![Action::StopRecording]
        );
        assert!(conv
            .handle(Event::SpeechFinished {
                utterance_id: "reply-7".to_string(),
                failed: false
            })
            .is_empty());
        assert_eq!(conv.state(), ConversationState::Speaking);

        let actions = conv.handle(Event::SpeechFinished {
            utterance_id: "reply-1".to_string(),
            failed: false,
        });
        assert_eq!(
            actions,
            vec![
                Action::Status(MSG_LISTENING.to_string()),
                Action::StartRecording {
                    kind: RecordingKind::Turn
                },
            ]
        );
        assert_eq!(conv.state(), ConversationState::Listening);
        assert_eq!(conv.pending_reply(), None);
    }

    #[test]
    fn failed_speech_resumes_listening_after_a_pause() {
        let mut conv = awake();
        conv.handle(turn_text("how are you"));
        let actions = conv.handle(Event::SpeechFinished {
            utterance_id: "reply-1".to_string(),
            failed: true,
        });
        assert_eq!(
            actions,
            vec![
                Action::Status(MSG_LISTENING.to_string()),
                Action::ScheduleTurnRetry,
            ]
        );
        assert_eq!(conv.state(), ConversationState::Listening);
        assert_eq!(
            conv.handle(Event::TurnRetryDue),
            vec![Action::StartRecording {
                kind: RecordingKind::Turn
            }]
        );
    }

    #[test]
    fn empty_turn_capture_restarts_recording() {
        let mut conv = awake();
        assert_eq!(
            conv.handle(Event::RecordingFailed {
                kind: RecordingKind::Turn,
                error: CaptureError::EmptyCapture
            }),
            vec![Action::StartRecording {
                kind: RecordingKind::Turn
            }]
        );
        assert_eq!(conv.state(), ConversationState::Listening);
    }

    #[test]
    fn other_turn_failures_answer_with_the_fallback() {
        let mut conv = awake();
        let actions = conv.handle(Event::RecordingFailed {
            kind: RecordingKind::Turn,
            error: CaptureError::DeviceReadFailure("gone".to_string()),
        });
        assert_eq!(spoken(&actions), Some((FALLBACK, "reply-1")));
        // the next recording waits even though the fallback was spoken fine
        let actions = conv.handle(Event::SpeechFinished {
            utterance_id: "reply-1".to_string(),
            failed: false,
        });
        assert_eq!(actions.last(), Some(&Action::ScheduleTurnRetry));
        let actions = conv.handle(turn_text("how are you"));
        assert_eq!(spoken(&actions), Some(("I'm doing well.", "reply-2")));
        let resumed = conv.handle(Event::SpeechFinished {
            utterance_id: "reply-2".to_string(),
            failed: false,
        });
        assert_eq!(
            resumed.last(),
            Some(&Action::StartRecording {
                kind: RecordingKind::Turn
            })
        );

        let mut conv = awake();
        let actions = conv.handle(Event::TranscriptionFailed {
            kind: RecordingKind::Turn,
            reason: "model crashed".to_string(),
        });
        assert_eq!(spoken(&actions), Some((FALLBACK, "reply-1")));
    }

    #[test]
    fn missing_microphone_is_reported_without_a_reply() {
        let mut conv = awake();
        let actions = conv.handle(Event::RecordingFailed {
            kind: RecordingKind::Turn,
            error: CaptureError::PermissionDenied,
        });
        assert_eq!(
            actions,
            vec![
                Action::Status(MSG_PERMISSION_DENIED.to_string()),
                Action::ScheduleTurnRetry,
            ]
        );
        assert_eq!(conv.state(), ConversationState::Listening);
        assert_eq!(conv.pending_reply(), None);

        let actions = conv.handle(Event::RecordingFailed {
            kind: RecordingKind::Turn,
            error: CaptureError::DeviceUnavailable("no default input device".to_string()),
        });
        assert!(spoken(&actions).is_none());
        assert_eq!(actions.last(), Some(&Action::ScheduleTurnRetry));
        assert_eq!(
            conv.handle(Event::TurnRetryDue),
            vec![Action::StartRecording {
                kind: RecordingKind::Turn
            }]
        );
    }

    #[test]
    fn turn_retry_is_ignored_outside_listening() {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        assert!(conv.handle(Event::TurnRetryDue).is_empty());

        let mut conv = awake();
        conv.handle(turn_text("how are you"));
        assert!(conv.handle(Event::TurnRetryDue).is_empty());
        assert_eq!(conv.state(), ConversationState::Speaking);
    }

    #[test]
    fn probe_failures_are_ignored() {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        assert!(conv
            .handle(Event::RecordingFailed {
                kind: RecordingKind::WakeProbe,
                error: CaptureError::PermissionDenied
            })
            .is_empty());
        conv.handle(probe_done());
        assert!(conv
            .handle(Event::TranscriptionFailed {
                kind: RecordingKind::WakeProbe,
                reason: "bad".to_string()
            })
            .is_empty());
        // the in-flight flag cleared, so the next probe is transcribed
        assert_eq!(conv.handle(probe_done()).len(), 1);
        assert_eq!(conv.state(), ConversationState::AwaitingWakeWord);
    }

    #[test]
    fn transcripts_arriving_while_speaking_are_dropped() {
        let mut conv = awake();
        conv.handle(turn_text("how are you"));
        assert!(conv.handle(turn_text("what is your name")).is_empty());
        assert!(conv.handle(turn_done()).is_empty());
        assert_eq!(conv.pending_reply(), Some("reply-1"));
    }

    #[test]
    fn wake_phrase_inside_a_sentence_starts_listening() {
        let mut conv = conversation();
        conv.handle(Event::Begin);
        conv.handle(probe_done());
        let actions = conv.handle(probe_text("hey marcus how are you"));
        assert!(actions.contains(&Action::CancelWakeTimer));
        assert_eq!(conv.state(), ConversationState::Listening);

        let mut conv = conversation();
        conv.handle(Event::Begin);
        conv.handle(probe_done());
        assert!(conv.handle(probe_text("hello there")).is_empty());
        assert_eq!(conv.state(), ConversationState::AwaitingWakeWord);
    }

    #[test]
    fn unmatched_request_round_trips_back_to_listening() {
        let mut conv = awake();
        let actions = conv.handle(turn_text("turn on the lights"));
        assert_eq!(spoken(&actions), Some((FALLBACK, "reply-1")));
        assert_eq!(conv.state(), ConversationState::Speaking);

        let actions = conv.handle(Event::SpeechFinished {
            utterance_id: "reply-1".to_string(),
            failed: false,
        });
        assert!(actions.contains(&Action::StartRecording {
            kind: RecordingKind::Turn
        }));
        assert_eq!(conv.state(), ConversationState::Listening);
    }

    #[test]
    fn normalization_strips_markers_and_punctuation() {
        assert_eq!(normalize_transcript("  Hello,   World!  "), "hello world");
        assert_eq!(normalize_transcript("[BLANK_AUDIO]"), "");
        assert_eq!(normalize_transcript("(music) What's up? *laughs*"), "what's up");
        assert_eq!(normalize_transcript(""), "");
    }
}
