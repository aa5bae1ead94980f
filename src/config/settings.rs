//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every field is optional
//! in the file (`#[serde(default)]`); anything left out keeps its default.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Pronunciation speed requested for a word.
///
/// | Variant | File                | Pacing                               |
/// |---------|---------------------|--------------------------------------|
/// | Normal  | `{id}_normal.wav`   | natural, clear, not rushed           |
/// | Slow    | `{id}_slow.wav`     | slow, extra clear, tiny pauses       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Normal,
    Slow,
}

impl Variant {
    /// Suffix used in the output file name.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Variant::Normal => "normal",
            Variant::Slow => "slow",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_suffix())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Variant::Normal),
            "slow" => Ok(Variant::Slow),
            other => Err(format!("unknown variant {other:?} (expected \"normal\" or \"slow\")")),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Settings for the remote TTS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// Model identifier (e.g. `"gemini-2.5-flash-preview-tts"`).
    pub model: String,
    /// Prebuilt voice name sent in `speech_config`.
    pub voice: String,
    /// Accent description embedded in the prompt.
    pub accent: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// API keys, rotated on HTTP 429.  Usually supplied via `--api-key` or
    /// `GEMINI_API_KEY` instead of the file.
    pub keys: Vec<String>,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Idle read timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.5-flash-preview-tts".into(),
            voice: "Sulafat".into(),
            accent: "General American English".into(),
            temperature: 1.0,
            keys: Vec::new(),
            request_timeout_secs: 120,
            connect_timeout_secs: 30,
            read_timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Backoff and key-exhaustion timings, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry of a retryable failure.
    pub initial_delay_ms: u64,
    /// Upper bound for the exponential backoff.
    pub max_delay_ms: u64,
    /// Pause once every key has hit its rate limit.
    pub exhausted_cooldown_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 10_000,
            max_delay_ms: 300_000,
            exhausted_cooldown_ms: 60_000,
        }
    }
}

// ---------------------------------------------------------------------------
// BatchConfig
// ---------------------------------------------------------------------------

/// Input/output locations and pacing of the batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Word list JSON (array of categories with `words: [{id, name}]`).
    pub input: PathBuf,
    /// Directory receiving the WAV files.
    pub output: PathBuf,
    /// Variants generated for every word, in order.
    pub variants: Vec<Variant>,
    /// Fixed pause between words.
    pub request_delay_ms: u64,
    /// Also pause between the variants of one word.
    pub delay_between_variants: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("assets/data/categories.json"),
            output: PathBuf::from("assets/audio/words"),
            variants: vec![Variant::Normal, Variant::Slow],
            request_delay_ms: 7_000,
            delay_between_variants: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use word_tts::config::AppConfig;
///
/// // Returns Default when the file is missing.
/// let config = AppConfig::load().unwrap();
/// assert!(!config.api.model.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.  A missing file yields the defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.api.model, "gemini-2.5-flash-preview-tts");
        assert_eq!(cfg.api.voice, "Sulafat");
        assert_eq!(cfg.api.accent, "General American English");
        assert!((cfg.api.temperature - 1.0).abs() < f32::EPSILON);
        assert!(cfg.api.keys.is_empty());
        assert_eq!(cfg.api.connect_timeout_secs, 30);
        assert_eq!(cfg.retry.initial_delay_ms, 10_000);
        assert_eq!(cfg.retry.max_delay_ms, 300_000);
        assert_eq!(cfg.retry.exhausted_cooldown_ms, 60_000);
        assert_eq!(cfg.batch.request_delay_ms, 7_000);
        assert_eq!(cfg.batch.variants, vec![Variant::Normal, Variant::Slow]);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");

        let mut cfg = AppConfig::default();
        cfg.api.voice = "Kore".into();
        cfg.api.keys = vec!["k1".into(), "k2".into()];
        cfg.retry.max_delay_ms = 1_000;
        cfg.batch.variants = vec![Variant::Slow];
        cfg.batch.output = PathBuf::from("/tmp/out");

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.api.voice, "Kore");
        assert_eq!(loaded.api.keys, vec!["k1", "k2"]);
        assert_eq!(loaded.retry.max_delay_ms, 1_000);
        assert_eq!(loaded.batch.variants, vec![Variant::Slow]);
        assert_eq!(loaded.batch.output, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let config = AppConfig::load_from(&dir.path().join("nope.toml")).expect("load");
        assert_eq!(config.api.model, AppConfig::default().api.model);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[retry]\ninitial_delay_ms = 500\n\n[batch]\nvariants = [\"normal\"]\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.retry.initial_delay_ms, 500);
        assert_eq!(cfg.retry.max_delay_ms, 300_000);
        assert_eq!(cfg.batch.variants, vec![Variant::Normal]);
        assert_eq!(cfg.api.voice, "Sulafat");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[retry\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn variant_parsing() {
        assert_eq!("normal".parse::<Variant>(), Ok(Variant::Normal));
        assert_eq!(" SLOW ".parse::<Variant>(), Ok(Variant::Slow));
        assert!("fast".parse::<Variant>().is_err());
        assert_eq!(Variant::Slow.to_string(), "slow");
    }
}
