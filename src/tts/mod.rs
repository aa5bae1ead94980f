//! Speech generation — one word/variant in, framed-ready PCM out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Synthesizer::synthesize(request)          (retry loop)   │
//! │    │                                                     │
//! │    ├─▶ KeyRing::current_key()                            │
//! │    ├─▶ SpeechApi::generate(key, request) ─▶ RequestOutcome│
//! │    │        (GeminiClient: POST generateContent)         │
//! │    ├─ RateLimited → KeyRing rotate / cooldown            │
//! │    ├─ Retryable   → Sleeper::sleep(backoff)              │
//! │    ├─ Fatal       → Err(FatalError)                      │
//! │    └─ Success     → Ok(GeneratedAudio)                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use word_tts::config::{AppConfig, Variant};
//! use word_tts::tts::{
//!     GeminiClient, KeyRing, PromptBuilder, RetryPolicy, SpeechRequest, Synthesizer,
//!     TokioSleeper,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let mut synth = Synthesizer::new(
//!         Arc::new(GeminiClient::from_config(&config.api)?),
//!         KeyRing::parse("key-1,key-2")?,
//!         Arc::new(TokioSleeper),
//!         RetryPolicy::from_config(&config.retry),
//!     );
//!
//!     let request = SpeechRequest {
//!         model: config.api.model.clone(),
//!         text: PromptBuilder::new(&config.api.accent).build("Cat", Variant::Normal),
//!         voice: config.api.voice.clone(),
//!         temperature: config.api.temperature,
//!     };
//!     let audio = synth.synthesize(&request).await?;
//!     println!("{} bytes of PCM", audio.pcm.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod keys;
pub mod outcome;
pub mod prompt;
pub mod retry;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use client::{build_body, proxy_from_env, ClientError, GeminiClient, SpeechApi, SpeechRequest};
pub use keys::{KeyRing, KeyRingError};
pub use outcome::{classify_status, extract_audio, FatalError, GeneratedAudio, RequestOutcome};
pub use prompt::PromptBuilder;
pub use retry::{format_duration, RetryPolicy, Sleeper, Synthesizer, TokioSleeper};

// test-only re-exports so the batch tests can script the API and the clock.
#[cfg(test)]
pub use client::MockSpeechApi;
#[cfg(test)]
pub use retry::RecordingSleeper;
