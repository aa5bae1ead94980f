//! Batch processing — word list in, WAV files and a run summary out.
//!
//! * [`load_words`] — read and validate the category/word JSON document.
//! * [`BatchRunner`] — sequential generation with skip, pacing and
//!   per-word failure isolation.
//! * [`RunStatistics`] — succeeded / skipped / failed counters and summary.
//! * [`run_session`] — setup checks in order, then the run itself.

pub mod runner;
pub mod session;
pub mod stats;
pub mod words;

pub use runner::{prepare_output_dir, BatchRunner, WordError};
pub use session::run_session;
pub use stats::{FailedWord, RunStatistics};
pub use words::{extract_words, load_words, parse_words, WordListError, WordRecord};
