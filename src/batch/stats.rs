//! Run statistics and the end-of-run summary.

use std::time::Duration;

use crate::batch::words::WordRecord;
use crate::tts::{format_duration, outcome::truncate};

/// Error messages are cut to this many characters in the summary.
const SUMMARY_ERROR_CHARS: usize = 80;

const RULE_WIDTH: usize = 60;

/// A word whose generation failed fatally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWord {
    pub id: String,
    pub name: String,
    pub error: String,
}

/// Counters accumulated over one batch run.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FailedWord>,
    pub elapsed: Duration,
}

impl RunStatistics {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, word: &WordRecord, error: String) {
        self.failed += 1;
        self.failures.push(FailedWord {
            id: word.id.clone(),
            name: word.name.clone(),
            error,
        });
    }

    /// Total number of words seen.
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    /// Human-readable report printed once the run finishes.
    pub fn summary_lines(&self) -> Vec<String> {
        let rule = "=".repeat(RULE_WIDTH);
        let mut lines = vec![
            rule.clone(),
            "Run summary".to_string(),
            rule.clone(),
            format!("succeeded: {}", self.succeeded),
            format!("skipped:   {}", self.skipped),
            format!("failed:    {}", self.failed),
            format!("elapsed:   {}", format_duration(self.elapsed)),
        ];

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push("Failed words:".to_string());
            for f in &self.failures {
                lines.push(format!(
                    "  - {} ({}): {}",
                    f.id,
                    f.name,
                    truncate(&f.error, SUMMARY_ERROR_CHARS)
                ));
            }
        }

        lines.push(rule.clone());
        if self.failed == 0 {
            lines.push("All done!".to_string());
        } else {
            lines.push(format!("Finished with {} failed word(s)", self.failed));
        }
        lines.push(rule);
        lines
    }
}
