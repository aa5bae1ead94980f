//! Application entry point — word-tts.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse CLI flags and load [`AppConfig`] (defaults on first run).
//! 3. Apply CLI overrides and build the [`KeyRing`].
//! 4. [`run_session`]: load and validate the word list (duplicate ids abort
//!    here), create the output directory, build the HTTP client, run.
//! 5. Print the summary.
//!
//! Any setup failure in steps 2–4 exits non-zero before a single request is made.
//! Per-word failures do not affect the exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use word_tts::batch::{run_session, RunStatistics};
use word_tts::config::{AppConfig, Variant};
use word_tts::tts::{GeminiClient, KeyRing, SpeechApi, TokioSleeper};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Batch-generate normal and slow word pronunciations as WAV files
#[derive(Parser, Debug)]
#[command(name = "word-tts", version, about)]
struct Cli {
    /// API key(s), comma separated; rotated when one is rate limited
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Settings file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input word list JSON
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output directory for WAV files
    #[arg(long)]
    output: Option<PathBuf>,

    /// Model ID
    #[arg(long)]
    model: Option<String>,

    /// Prebuilt voice name
    #[arg(long)]
    voice: Option<String>,

    /// Accent description used in the prompt
    #[arg(long)]
    accent: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Variants to generate, e.g. "normal,slow"
    #[arg(long, value_delimiter = ',')]
    variants: Option<Vec<Variant>>,

    /// Pause between requests in milliseconds
    #[arg(long)]
    request_delay_ms: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.batch.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.batch.output = output.clone();
        }
        if let Some(model) = &self.model {
            config.api.model = model.clone();
        }
        if let Some(voice) = &self.voice {
            config.api.voice = voice.clone();
        }
        if let Some(accent) = &self.accent {
            config.api.accent = accent.clone();
        }
        if let Some(temperature) = self.temperature {
            config.api.temperature = temperature;
        }
        if let Some(variants) = &self.variants {
            config.batch.variants = variants.clone();
        }
        if let Some(delay) = self.request_delay_ms {
            config.batch.request_delay_ms = delay;
        }
    }

    /// Keys from `--api-key` / `GEMINI_API_KEY` replace those in the file.
    fn key_ring(&self, config: &AppConfig) -> Result<KeyRing> {
        let ring = match &self.api_key {
            Some(list) => KeyRing::parse(list)?,
            None => KeyRing::new(config.api.keys.clone())?,
        };
        Ok(ring)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn run(cli: Cli) -> Result<RunStatistics> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    cli.apply(&mut config);

    let keys = cli.key_ring(&config)?;

    run_session(&config, keys, Arc::new(TokioSleeper), |api| {
        let client: Arc<dyn SpeechApi> = Arc::new(GeminiClient::from_config(api)?);
        Ok(client)
    })
    .await
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(stats) => {
            for line in stats.summary_lines() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
