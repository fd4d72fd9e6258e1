//! Size-capped debug log written to the temp directory.
//!
//! Everything here is advisory: the controller never reads it back.

use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    panic,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const DEBUG_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: OnceLock<Mutex<Option<CappedLog>>> = OnceLock::new();

pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("voicechat.log")
}

pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("voicechat_crash.log")
}

/// Append-only file that starts over once it would grow past `cap` bytes.
struct CappedLog {
    path: PathBuf,
    file: fs::File,
    cap: u64,
    len: u64,
}

impl CappedLog {
    fn open(path: PathBuf, cap: u64) -> Option<Self> {
        let existing = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let (file, len) = if existing > cap {
            (truncate(&path)?, 0)
        } else {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .ok()?;
            (file, existing)
        };
        Some(Self {
            path,
            file,
            cap,
            len,
        })
    }

    fn append(&mut self, line: &str) {
        let incoming = line.len() as u64;
        if self.len.saturating_add(incoming) > self.cap {
            if let Some(file) = truncate(&self.path) {
                self.file = file;
                self.len = 0;
            }
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.len = self.len.saturating_add(incoming);
        }
    }
}

fn truncate(path: &Path) -> Option<fs::File> {
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .ok()
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn debug_log() -> &'static Mutex<Option<CappedLog>> {
    DEBUG_LOG.get_or_init(|| Mutex::new(None))
}

/// Turn the debug log on or off according to `--logs`, `--log-timings`,
/// `--no-logs` and `--log-content`.
pub fn init_logging(config: &AppConfig) {
    let enabled = config.logging_enabled();
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    CONTENT_ENABLED.store(enabled && config.log_content, Ordering::Relaxed);

    let mut slot = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = if enabled {
        CappedLog::open(log_file_path(), DEBUG_LOG_MAX_BYTES)
    } else {
        None
    };
}

pub fn log_debug(msg: &str) {
    if !DEBUG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", unix_secs());
    let mut slot = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(log) = slot.as_mut() {
        log.append(&line);
    }
}

/// Log a line carrying user speech (transcripts, replies). Dropped unless
/// `--log-content` was given.
pub fn log_debug_content(msg: &str) {
    if CONTENT_ENABLED.load(Ordering::Relaxed) {
        log_debug(msg);
    }
}

/// Record a panic location in the crash log. The payload may quote a
/// transcript, so it is only kept with content logging on.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !DEBUG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if CONTENT_ENABLED.load(Ordering::Relaxed) {
        info.payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string())
    } else {
        "payload omitted (log-content disabled)".to_string()
    };
    let line = format!(
        "[{}] panic at {location}: {payload} (v{})\n",
        unix_secs(),
        env!("CARGO_PKG_VERSION")
    );
    if let Some(mut log) = CappedLog::open(crash_log_path(), CRASH_LOG_MAX_BYTES) {
        log.append(&line);
    }
}

#[cfg(test)]
pub(crate) fn set_logging_for_tests(enabled: bool, content: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
    CONTENT_ENABLED.store(enabled && content, Ordering::Relaxed);
    let mut slot = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = if enabled {
        CappedLog::open(log_file_path(), DEBUG_LOG_MAX_BYTES)
    } else {
        None
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capped_log_starts_over_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capped.log");
        let mut log = CappedLog::open(path.clone(), 16).unwrap();
        log.append("0123456789\n");
        log.append("abcdefghij\n");
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "abcdefghij\n");
    }

    #[test]
    fn content_lines_need_both_flags() {
        set_logging_for_tests(false, true);
        assert!(!CONTENT_ENABLED.load(Ordering::Relaxed));
        set_logging_for_tests(true, false);
        assert!(!CONTENT_ENABLED.load(Ordering::Relaxed));
        set_logging_for_tests(false, false);
    }
}
