//! Speech output through an external TTS program such as `espeak` or `say`.

use crate::log_debug;
use crate::log_debug_content;
use crate::ports::{EventSink, SpeechEvent, SpeechOutputPort};
use anyhow::{bail, Context, Result};
use std::process::{Command, Stdio};
use std::thread;

/// Runs `<program> [args..] <text>` once per utterance on its own thread.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    /// Parse a shell-style command line, e.g. `espeak -s 150`.
    pub fn new(command_line: &str) -> Result<Self> {
        let mut words = shell_words::split(command_line)
            .with_context(|| format!("invalid TTS command '{command_line}'"))?
            .into_iter();
        let Some(program) = words.next() else {
            bail!("TTS command must not be empty");
        };
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, text: &str, utterance_id: &str, events: &EventSink<SpeechEvent>) {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(err) => {
                log_debug(&format!(
                    "speech {utterance_id}: failed to spawn '{}': {err}",
                    self.program
                ));
                events(SpeechEvent::Error {
                    utterance_id: utterance_id.to_string(),
                    reason: format!("failed to start '{}': {err}", self.program),
                });
                return;
            }
        };
        events(SpeechEvent::Started {
            utterance_id: utterance_id.to_string(),
        });
        let event = match child.wait() {
            Ok(status) if status.success() => SpeechEvent::Done {
                utterance_id: utterance_id.to_string(),
            },
            Ok(status) => SpeechEvent::Error {
                utterance_id: utterance_id.to_string(),
                reason: format!("'{}' exited with {status}", self.program),
            },
            Err(err) => SpeechEvent::Error {
                utterance_id: utterance_id.to_string(),
                reason: format!("waiting on '{}' failed: {err}", self.program),
            },
        };
        if let SpeechEvent::Error { reason, .. } = &event {
            log_debug(&format!("speech {utterance_id}: {reason}"));
        }
        events(event);
    }
}

impl SpeechOutputPort for CommandSpeaker {
    fn speak(&self, text: &str, utterance_id: &str, events: EventSink<SpeechEvent>) {
        log_debug_content(&format!("speech {utterance_id}: {text:?}"));
        let speaker = self.clone();
        let text = text.to_string();
        let id = utterance_id.to_string();
        let spawned = thread::Builder::new()
            .name(format!("voicechat-tts-{id}"))
            .spawn({
                let events = events.clone();
                let id = id.clone();
                move || speaker.run(&text, &id, &events)
            });
        if let Err(err) = spawned {
            events(SpeechEvent::Error {
                utterance_id: id,
                reason: format!("failed to spawn speech thread: {err}"),
            });
        }
    }
}
