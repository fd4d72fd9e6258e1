//! voicechat: say the wake word, ask a question, hear a reply.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use std::fs;
use std::panic;
use std::sync::Arc;
use voicechat::audio::{list_input_devices, MicrophoneFactory, Recorder};
use voicechat::config::AppConfig;
use voicechat::conversation::{ConversationController, ConversationState, ConversationUpdate};
use voicechat::intent::Corpus;
use voicechat::ports::EventSink;
use voicechat::speech::CommandSpeaker;
use voicechat::stt::{TranscriptionWorker, WhisperTranscriber};
use voicechat::{init_logging, init_tracing, log_debug, log_file_path, log_panic, tracing_log_path};

fn main() -> Result<()> {
    let mut config = AppConfig::parse();
    if config.list_input_devices {
        print_input_devices();
        return Ok(());
    }

    config.validate()?;
    install_panic_hook();
    init_logging(&config);
    init_tracing(&config);
    log_debug("=== voicechat started ===");
    if config.logging_enabled() {
        log_debug(&format!("Log file: {:?}", log_file_path()));
        log_debug(&format!("Trace file: {:?}", tracing_log_path()));
    }

    let corpus = Corpus::load(&config.corpus)
        .with_context(|| format!("failed to load intent corpus '{}'", config.corpus.display()))?;
    if corpus.is_empty() {
        eprintln!("warning: intent corpus is empty; every reply will be the fallback");
    }
    log_debug(&format!(
        "corpus {}: {} intents",
        config.corpus.display(),
        corpus.intents().len()
    ));

    let model = config.require_whisper_model()?;
    println!("Loading Whisper model {}...", model.display());
    let engine = WhisperTranscriber::new(model, config.whisper_options())?;
    let transcriber = Arc::new(TranscriptionWorker::spawn(Box::new(engine))?);
    let speaker = Arc::new(CommandSpeaker::new(&config.tts_cmd)?);

    fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "failed to create data directory '{}'",
            config.data_dir.display()
        )
    })?;
    let microphone = Arc::new(MicrophoneFactory::new(config.input_device.clone()));
    let recorder = Arc::new(Recorder::new(microphone, config.recorder_config()));

    let (quit_tx, quit_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = quit_tx.try_send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let updates: EventSink<ConversationUpdate> = Arc::new(print_update);
    let mut controller = ConversationController::new(
        config.conversation_config(),
        Arc::new(corpus),
        Arc::clone(&recorder),
        transcriber,
        speaker,
    )
    .spawn(updates)?;

    println!(
        "Say \"{}\" to start talking. Press Ctrl-C to quit.",
        config.wake_word
    );
    let _ = quit_rx.recv();
    println!("Shutting down...");
    controller.shutdown();
    log_debug("=== voicechat stopped ===");
    Ok(())
}

fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        default_hook(info);
    }));
}

fn print_update(update: ConversationUpdate) {
    match update {
        ConversationUpdate::Status(message) => println!("[{message}]"),
        ConversationUpdate::StateChanged(ConversationState::AwaitingWakeWord) => {
            println!("(waiting for the wake word)");
        }
        ConversationUpdate::StateChanged(state) => log_debug(&format!("state: {}", state.label())),
        ConversationUpdate::Exchange { heard, reply } => {
            if heard.is_empty() {
                println!("You: (nothing recognized)");
            } else {
                println!("You: {heard}");
            }
            println!("Assistant: {reply}");
        }
    }
}

fn print_input_devices() {
    // VOICECHAT_TEST_DEVICES stands in for real hardware in CLI tests.
    let devices = if let Ok(raw) = std::env::var("VOICECHAT_TEST_DEVICES") {
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    } else {
        list_input_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
}
