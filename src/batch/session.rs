//! One complete run: validate everything, then talk to the API.
//!
//! ```text
//! variants configured? ─► load_words ─► prepare_output_dir ─► connect ─► BatchRunner::run
//! ```
//!
//! Every check that can fail without the network happens before `connect`
//! is called, so a bad word list or output directory never costs a request.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::batch::runner::{prepare_output_dir, BatchRunner};
use crate::batch::stats::RunStatistics;
use crate::batch::words::load_words;
use crate::config::{ApiConfig, AppConfig, Variant};
use crate::tts::{KeyRing, RetryPolicy, Sleeper, SpeechApi, Synthesizer};

/// Validate `config`, build the API client with `connect` and process the
/// whole word list.
///
/// # Errors
///
/// Setup failures only: no variants, an unreadable or invalid word list, an
/// unwritable output directory, or `connect` itself failing.  Per-word
/// failures end up in the returned [`RunStatistics`].
pub async fn run_session<F>(
    config: &AppConfig,
    keys: KeyRing,
    sleeper: Arc<dyn Sleeper>,
    connect: F,
) -> Result<RunStatistics>
where
    F: FnOnce(&ApiConfig) -> Result<Arc<dyn SpeechApi>>,
{
    if config.batch.variants.is_empty() {
        bail!("no variants configured (expected \"normal\" and/or \"slow\")");
    }

    let words = load_words(&config.batch.input)?;

    prepare_output_dir(&config.batch.output)
        .await
        .with_context(|| {
            format!(
                "output directory {} is not writable",
                config.batch.output.display()
            )
        })?;

    log::info!("word list:  {} words", words.len());
    log::info!("input:      {}", config.batch.input.display());
    log::info!("output:     {}", config.batch.output.display());
    log::info!("model:      {}", config.api.model);
    log::info!("voice:      {}", config.api.voice);
    log::info!("accent:     {}", config.api.accent);
    log::info!(
        "variants:   {}",
        config
            .batch
            .variants
            .iter()
            .map(Variant::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    log::info!("API keys:   {}", keys.len());

    let api = connect(&config.api)?;
    let synth = Synthesizer::new(
        api,
        keys,
        Arc::clone(&sleeper),
        RetryPolicy::from_config(&config.retry),
    );

    let mut runner = BatchRunner::new(synth, sleeper, config);
    Ok(runner.run(&words).await)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
