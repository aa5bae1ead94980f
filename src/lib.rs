//! word-tts — batch word pronunciation generator backed by Gemini TTS.
//!
//! * [`config`] — TOML settings and platform paths.
//! * [`batch`] — word list loading, the sequential runner and statistics.
//! * [`tts`] — HTTP client, outcome classification, key rotation and retries.
//! * [`audio`] — MIME-type parsing and WAV framing.

pub mod audio;
pub mod batch;
pub mod config;
pub mod tts;
