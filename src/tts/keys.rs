//! API key ring with per-key rate-limit bookkeeping.
//!
//! Exactly one key is current at any time.  [`KeyRing::rotate`] advances the
//! index circularly.  Failure counters only track *whether* a key has been
//! rate limited since the last [`KeyRing::reset_all`]; the retry engine uses
//! [`KeyRing::all_failed`] to decide when every key is exhausted.
//!
//! Keys are never logged — only their 1-based position (`#1`, `#2`, …).

use std::fmt;

use thiserror::Error;

/// Errors raised while building a [`KeyRing`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyRingError {
    #[error("no API key provided (use --api-key or GEMINI_API_KEY)")]
    Empty,
}

/// Ordered set of API keys, each paired with a failure counter.
pub struct KeyRing {
    keys: Vec<String>,
    failures: Vec<u32>,
    current: usize,
}

impl KeyRing {
    /// Build a ring from individual keys.  Blank entries are dropped; at
    /// least one key must remain.
    pub fn new(keys: Vec<String>) -> Result<Self, KeyRingError> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(KeyRingError::Empty);
        }

        let failures = vec![0; keys.len()];
        Ok(Self {
            keys,
            failures,
            current: 0,
        })
    }

    /// Build a ring from a comma-separated list such as `"key1, key2"`.
    pub fn parse(list: &str) -> Result<Self, KeyRingError> {
        Self::new(list.split(',').map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key used for the next request.
    pub fn current_key(&self) -> &str {
        &self.keys[self.current]
    }

    /// Zero-based index of the current key.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Failure count of the key at `index` (0 when out of range).
    pub fn failure_count(&self, index: usize) -> u32 {
        self.failures.get(index).copied().unwrap_or(0)
    }

    /// Record a rate limit against the current key.
    pub fn mark_current_failed(&mut self) {
        self.failures[self.current] += 1;
    }

    /// `true` when every key has been rate limited since the last reset.
    pub fn all_failed(&self) -> bool {
        self.failures.iter().all(|&count| count > 0)
    }

    /// Advance to the next key, wrapping around.
    pub fn rotate(&mut self) {
        let previous = self.current;
        self.current = (self.current + 1) % self.keys.len();
        log::info!("switching API key #{} → #{}", previous + 1, self.current + 1);
    }

    /// Clear every failure counter.
    pub fn reset_all(&mut self) {
        self.failures.iter_mut().for_each(|count| *count = 0);
        log::info!("reset failure counters of all {} API keys", self.keys.len());
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &format_args!("[{} redacted]", self.keys.len()))
            .field("failures", &self.failures)
            .field("current", &self.current)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
