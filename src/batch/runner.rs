//! Batch orchestrator — word list → WAV files, one request at a time.
//!
//! # Flow per word
//!
//! ```text
//! missing = variants whose {output}/{id}_{variant}.wav does not exist
//!   ├─ none missing → skipped
//!   └─ for each missing variant
//!         [pause between variants]
//!         Synthesizer::synthesize → encode_wav → {path}.part → rename
//!           └─ FatalError / write error → word failed, next word
//! pause between words (not after the last one, not after a skip)
//! ```
//!
//! A failed word never aborts the run and never touches the key ring or
//! retry state of the words after it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::encode_wav;
use crate::batch::stats::RunStatistics;
use crate::batch::words::WordRecord;
use crate::config::{AppConfig, Variant};
use crate::tts::{FatalError, PromptBuilder, Sleeper, SpeechRequest, Synthesizer};

// ---------------------------------------------------------------------------
// WordError
// ---------------------------------------------------------------------------

/// Why a single word could not be completed.
#[derive(Debug, Error)]
pub enum WordError {
    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Drives the whole word list through the [`Synthesizer`].
pub struct BatchRunner {
    synth: Synthesizer,
    sleeper: Arc<dyn Sleeper>,
    prompts: PromptBuilder,
    model: String,
    voice: String,
    temperature: f32,
    output_dir: PathBuf,
    variants: Vec<Variant>,
    request_delay: Duration,
    delay_between_variants: bool,
}

impl BatchRunner {
    /// Build a runner from `config.api` and `config.batch`.
    ///
    /// Repeated variants in the config are collapsed, keeping first-seen order.
    pub fn new(synth: Synthesizer, sleeper: Arc<dyn Sleeper>, config: &AppConfig) -> Self {
        let mut variants = Vec::with_capacity(config.batch.variants.len());
        for variant in &config.batch.variants {
            if !variants.contains(variant) {
                variants.push(*variant);
            }
        }

        Self {
            synth,
            sleeper,
            prompts: PromptBuilder::new(&config.api.accent),
            model: config.api.model.clone(),
            voice: config.api.voice.clone(),
            temperature: config.api.temperature,
            output_dir: config.batch.output.clone(),
            variants,
            request_delay: Duration::from_millis(config.batch.request_delay_ms),
            delay_between_variants: config.batch.delay_between_variants,
        }
    }

    /// `{output_dir}/{id}_{variant}.wav`
    pub fn output_path(&self, word: &WordRecord, variant: Variant) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.wav", word.id, variant.file_suffix()))
    }

    /// Process every word in order and return the aggregated statistics.
    pub async fn run(&mut self, words: &[WordRecord]) -> RunStatistics {
        let started = Instant::now();
        let mut stats = RunStatistics::default();
        let total = words.len();

        for (index, word) in words.iter().enumerate() {
            let progress = format!("[{}/{}]", index + 1, total);
            let missing = self.missing_variants(word).await;

            if missing.is_empty() {
                log::info!("{progress} skipping {} (already exists)", word.id);
                stats.record_skip();
                continue;
            }

            log::info!("{progress} generating {} / {}", word.id, word.name);

            match self.process_word(word, &missing).await {
                Ok(()) => {
                    log::info!("{progress} done {}", word.id);
                    stats.record_success();
                }
                Err(e) => {
                    log::error!("{progress} failed {} (skipping): {e}", word.id);
                    stats.record_failure(word, e.to_string());
                }
            }

            if index + 1 < total {
                self.sleeper.sleep(self.request_delay).await;
            }
        }

        stats.elapsed = started.elapsed();
        stats
    }

    async fn missing_variants(&self, word: &WordRecord) -> Vec<Variant> {
        let mut missing = Vec::new();
        for &variant in &self.variants {
            let path = self.output_path(word, variant);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                missing.push(variant);
            }
        }
        missing
    }

    async fn process_word(
        &mut self,
        word: &WordRecord,
        variants: &[Variant],
    ) -> Result<(), WordError> {
        for (i, &variant) in variants.iter().enumerate() {
            if i > 0 && self.delay_between_variants {
                self.sleeper.sleep(self.request_delay).await;
            }

            let request = SpeechRequest {
                model: self.model.clone(),
                text: self.prompts.build(&word.name, variant),
                voice: self.voice.clone(),
                temperature: self.temperature,
            };

            log::info!(
                "  → {variant}: requesting audio (API key #{})",
                self.synth.keys().current_index() + 1
            );
            let audio = self.synth.synthesize(&request).await?;

            let wav = encode_wav(&audio.pcm, audio.format);
            let path = self.output_path(word, variant);
            write_atomically(&path, &wav)
                .await
                .map_err(|source| WordError::Write {
                    path: path.clone(),
                    source,
                })?;

            log::debug!("  wrote {} ({} bytes)", path.display(), wav.len());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

/// Write to `{path}.part` then rename, so an interrupted run never leaves a
/// truncated WAV that would be mistaken for a finished one.
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(())
}

/// Create `dir` (and parents) and verify files can be written into it.
pub async fn prepare_output_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let probe = dir.join(".word-tts-write-check");
    tokio::fs::write(&probe, b"").await?;
    tokio::fs::remove_file(&probe).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
