//! Configuration module for word-tts.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the API, retry
//! and batch subsystems, `AppPaths` for the platform config directory, and
//! TOML persistence via `AppConfig::load` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ApiConfig, AppConfig, BatchConfig, RetryConfig, Variant};
