//! Unbounded retry loop with exponential backoff and key rotation.
//!
//! # Policy
//!
//! ```text
//! loop {
//!     outcome = api.generate(keys.current_key(), request)
//!     Success      → return audio
//!     Fatal        → return FatalError            (no retry, no rotation)
//!     RateLimited  → mark key failed
//!                    all keys failed? → sleep(cooldown), reset counters
//!                    rotate key, attempt = 0      (no backoff)
//!     Retryable    → attempt += 1
//!                    sleep(min(initial × 2^(attempt-1), max))
//! }
//! ```
//!
//! Only a fatal classification ends the loop without audio.  There is no
//! attempt limit: a flaky upstream is waited out, never skipped.
//!
//! All waiting goes through the [`Sleeper`] trait so tests can record the
//! delays instead of sleeping.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RetryConfig;
use crate::tts::client::{SpeechApi, SpeechRequest};
use crate::tts::keys::KeyRing;
use crate::tts::outcome::{truncate, FatalError, GeneratedAudio, RequestOutcome};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Timings used by [`Synthesizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first consecutive retryable failure.
    pub initial_delay: Duration,
    /// Cap for the exponential backoff.
    pub max_delay: Duration,
    /// Pause once every key is rate limited.
    pub exhausted_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            exhausted_cooldown: Duration::from_millis(config.exhausted_cooldown_ms),
        }
    }

    /// Backoff before retry number `attempt` (1-based):
    /// `min(initial_delay × 2^(attempt-1), max_delay)`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use word_tts::tts::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff_delay(1), Duration::from_secs(10));
    /// assert_eq!(policy.backoff_delay(3), Duration::from_secs(40));
    /// assert_eq!(policy.backoff_delay(30), Duration::from_secs(300));
    /// ```
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Suspends the current task.  Injected so tests never wait in real time.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records every requested delay and returns immediately.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Owns the key ring and drives requests until they succeed or fail fatally.
pub struct Synthesizer {
    api: Arc<dyn SpeechApi>,
    keys: KeyRing,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl Synthesizer {
    pub fn new(
        api: Arc<dyn SpeechApi>,
        keys: KeyRing,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            api,
            keys,
            sleeper,
            policy,
        }
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Request audio for `request`, retrying every recoverable failure.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError`] on the first non-retryable client error.
    pub async fn synthesize(
        &mut self,
        request: &SpeechRequest,
    ) -> Result<GeneratedAudio, FatalError> {
        let mut attempt: u32 = 0;

        loop {
            let key_number = self.keys.current_index() + 1;
            let outcome = self.api.generate(self.keys.current_key(), request).await;
            log::debug!("API key #{key_number}: {}", outcome.kind());

            match outcome {
                RequestOutcome::Success(audio) => return Ok(audio),

                RequestOutcome::Fatal { status, message } => {
                    return Err(FatalError { status, message });
                }

                RequestOutcome::RateLimited { message } => {
                    log::warn!(
                        "API key #{} hit its rate limit (429): {}",
                        self.keys.current_index() + 1,
                        truncate(&message, 100)
                    );
                    self.handle_rate_limit().await;
                    attempt = 0;
                }

                RequestOutcome::Retryable { message } => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.policy.backoff_delay(attempt);
                    log::warn!("retryable error: {}", truncate(&message, 100));
                    log::warn!(
                        "waiting {} before retry (attempt {attempt})",
                        format_duration(delay)
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    async fn handle_rate_limit(&mut self) {
        self.keys.mark_current_failed();

        if self.keys.all_failed() {
            log::warn!(
                "all {} API keys are rate limited; waiting {}",
                self.keys.len(),
                format_duration(self.policy.exhausted_cooldown)
            );
            self.sleeper.sleep(self.policy.exhausted_cooldown).await;
            self.keys.reset_all();
        }

        self.keys.rotate();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Compact human-readable duration: `850ms`, `7s`, `5m`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{}s", (ms + 500) / 1_000)
    } else {
        format!("{}m", (ms + 30_000) / 60_000)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::client::MockSpeechApi;

    fn request() -> SpeechRequest {
        SpeechRequest {
            model: "m".into(),
            text: "Cat".into(),
            voice: "v".into(),
            temperature: 1.0,
        }
    }

    fn retryable() -> RequestOutcome {
        RequestOutcome::Retryable {
            message: "HTTP 503: overloaded".into(),
        }
    }

    fn rate_limited() -> RequestOutcome {
        RequestOutcome::RateLimited {
            message: "quota exceeded".into(),
        }
    }

    fn synthesizer(
        script: Vec<RequestOutcome>,
        keys: &str,
    ) -> (Synthesizer, Arc<MockSpeechApi>, Arc<RecordingSleeper>) {
        let api = Arc::new(MockSpeechApi::new(script));
        let sleeper = Arc::new(RecordingSleeper::default());
        let synth = Synthesizer::new(
            Arc::clone(&api) as Arc<dyn SpeechApi>,
            KeyRing::parse(keys).unwrap(),
            Arc::clone(&sleeper) as Arc<dyn Sleeper>,
            RetryPolicy::default(),
        );
        (synth, api, sleeper)
    }

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    // ---- RetryPolicy ---

    #[test]
    fn backoff_sequence_doubles_then_caps() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(10_000),
            max_delay: Duration::from_millis(300_000),
            exhausted_cooldown: Duration::from_secs(60),
        };
        let delays: Vec<u128> = (1..=8).map(|n| policy.backoff_delay(n).as_millis()).collect();
        assert_eq!(
            delays,
            [10_000, 20_000, 40_000, 80_000, 160_000, 300_000, 300_000, 300_000]
        );
    }

    #[test]
    fn backoff_never_overflows() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(u32::MAX), policy.max_delay);
    }

    #[test]
    fn policy_from_config() {
        let config = RetryConfig {
            initial_delay_ms: 5,
            max_delay_ms: 50,
            exhausted_cooldown_ms: 500,
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.initial_delay, Duration::from_millis(5));
        assert_eq!(policy.max_delay, Duration::from_millis(50));
        assert_eq!(policy.exhausted_cooldown, Duration::from_millis(500));
    }

    // ---- Synthesizer ---

    #[tokio::test]
    async fn success_on_first_try_does_not_sleep() {
        let (mut synth, api, sleeper) = synthesizer(vec![], "k0");
        let audio = synth.synthesize(&request()).await.expect("audio");

        assert_eq!(audio.pcm.len(), 480);
        assert_eq!(api.call_count(), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn retryable_failures_back_off_exponentially() {
        let (mut synth, api, sleeper) = synthesizer(vec![retryable(); 7], "k0");
        synth.synthesize(&request()).await.expect("audio");

        assert_eq!(api.call_count(), 8);
        assert_eq!(sleeper.slept(), secs(&[10, 20, 40, 80, 160, 300, 300]));
        assert_eq!(api.keys_used(), vec!["k0"; 8]);
    }

    #[tokio::test]
    async fn two_keys_rotate_then_cool_down() {
        let (mut synth, api, sleeper) =
            synthesizer(vec![rate_limited(), rate_limited()], "k0,k1");
        synth.synthesize(&request()).await.expect("audio");

        assert_eq!(api.keys_used(), ["k0", "k1", "k0"]);
        assert_eq!(sleeper.slept(), secs(&[60]));
        assert_eq!(synth.keys().current_index(), 0);
        assert_eq!(synth.keys().failure_count(0), 0);
        assert_eq!(synth.keys().failure_count(1), 0);
    }

    #[tokio::test]
    async fn first_rate_limit_rotates_without_delay() {
        let (mut synth, api, sleeper) = synthesizer(vec![rate_limited()], "k0,k1,k2");
        synth.synthesize(&request()).await.expect("audio");

        assert_eq!(api.keys_used(), ["k0", "k1"]);
        assert!(sleeper.slept().is_empty());
        assert_eq!(synth.keys().failure_count(0), 1);
    }

    #[tokio::test]
    async fn key_switch_resets_backoff() {
        let script = vec![retryable(), retryable(), rate_limited(), retryable()];
        let (mut synth, api, sleeper) = synthesizer(script, "k0,k1");
        synth.synthesize(&request()).await.expect("audio");

        // 10s, 20s on k0; rotation; backoff restarts at 10s on k1.
        assert_eq!(sleeper.slept(), secs(&[10, 20, 10]));
        assert_eq!(api.keys_used(), ["k0", "k0", "k0", "k1", "k1"]);
    }

    #[tokio::test]
    async fn single_key_cools_down_on_every_rate_limit() {
        let (mut synth, api, sleeper) =
            synthesizer(vec![rate_limited(), rate_limited()], "only");
        synth.synthesize(&request()).await.expect("audio");

        assert_eq!(sleeper.slept(), secs(&[60, 60]));
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test]
    async fn fatal_stops_immediately() {
        let fatal = RequestOutcome::Fatal {
            status: 400,
            message: "blocked by safety filter".into(),
        };
        let (mut synth, api, sleeper) = synthesizer(vec![retryable(), fatal], "k0,k1");

        let err = synth.synthesize(&request()).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.to_string(), "HTTP 400: blocked by safety filter");
        assert_eq!(api.call_count(), 2);
        assert_eq!(sleeper.slept(), secs(&[10]));
        assert_eq!(synth.keys().current_index(), 0);
    }

    #[tokio::test]
    async fn fatal_leaves_key_state_for_next_request() {
        let fatal = RequestOutcome::Fatal {
            status: 403,
            message: "denied".into(),
        };
        let (mut synth, api, _sleeper) = synthesizer(vec![rate_limited(), fatal], "k0,k1");

        assert!(synth.synthesize(&request()).await.is_err());
        // Next word continues on k1 with a clean backoff.
        synth.synthesize(&request()).await.expect("audio");
        assert_eq!(api.keys_used(), ["k0", "k1", "k1"]);
    }

    #[tokio::test]
    async fn request_is_forwarded_unchanged() {
        let (mut synth, api, _sleeper) = synthesizer(vec![], "k0");
        synth.synthesize(&request()).await.expect("audio");
        assert_eq!(api.requests(), vec![request()]);
    }

    // ---- format_duration ---

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_secs(7)), "7s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
    }
}
