use std::env;
use std::path::PathBuf;

pub const DEFAULT_WAKE_CHECK_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_PROBE_RESTART_DELAY_MS: u64 = 300;
pub const DEFAULT_TURN_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_SILENCE_THRESHOLD: f64 = crate::audio::DEFAULT_SILENCE_THRESHOLD;
pub const DEFAULT_SILENCE_DURATION_MS: u64 = 3000;
pub const DEFAULT_MAX_RECORDING_MS: u64 = 20_000;
pub const DEFAULT_CHUNK_MS: u64 = 100;
pub const DEFAULT_CORPUS_PATH: &str = "assets/conversation.json";
pub const DEFAULT_TTS_CMD: &str = "espeak";

pub(super) const MIN_CHUNK_MS: u64 = 10;
pub(super) const MAX_CHUNK_MS: u64 = 1000;
pub(super) const MIN_WAKE_CHECK_INTERVAL_MS: u64 = 500;
pub(super) const MAX_WAKE_CHECK_INTERVAL_MS: u64 = 30_000;
pub(super) const MAX_PROBE_RESTART_DELAY_MS: u64 = 5000;
pub(super) const MIN_TURN_RETRY_DELAY_MS: u64 = 100;
pub(super) const MAX_TURN_RETRY_DELAY_MS: u64 = 10_000;
pub(super) const MAX_RECORDING_HARD_LIMIT_MS: u64 = 120_000;
pub(super) const MAX_SILENCE_THRESHOLD: f64 = 32767.0;
pub(super) const MAX_WHISPER_THREADS: usize = 64;
pub(super) const MAX_WAKE_WORD_CHARS: usize = 64;

pub(super) const ISO_639_1_CODES: &[&str] = &[
    "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg", "bh",
    "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy", "da",
    "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi", "fj", "fo", "fr",
    "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr", "ht", "hu", "hy", "hz",
    "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja", "jv", "ka", "kg", "ki", "kj",
    "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw", "ky", "la", "lb", "lg", "li", "ln",
    "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "na", "nb",
    "nd", "ne", "ng", "nl", "nn", "no", "nr", "nv", "ny", "oc", "oj", "om", "or", "os", "pa", "pi",
    "pl", "ps", "pt", "qu", "rm", "rn", "ro", "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk",
    "sl", "sm", "sn", "so", "sq", "sr", "ss", "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti",
    "tk", "tl", "tn", "to", "tr", "ts", "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo",
    "wa", "wo", "xh", "yi", "yo", "za", "zh", "zu",
];

/// `$TMPDIR/voicechat`, where recordings land unless `--data-dir` says
/// otherwise.
pub fn default_data_dir() -> PathBuf {
    env::temp_dir().join("voicechat")
}
