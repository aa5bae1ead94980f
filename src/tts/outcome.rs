//! Per-attempt request outcomes and the rules that classify them.
//!
//! Every HTTP attempt ends in exactly one [`RequestOutcome`].  The retry
//! engine matches on it:
//!
//! | Outcome       | Cause                                          | Engine reaction        |
//! |---------------|------------------------------------------------|------------------------|
//! | `Success`     | 2xx with an audio payload                      | return                 |
//! | `RateLimited` | HTTP 429                                       | rotate key             |
//! | `Retryable`   | 5xx, transport failure, odd status, no audio   | back off, same key     |
//! | `Fatal`       | any other 4xx                                  | give up on this word   |

use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

use crate::audio::AudioFormat;

/// Character cap for retryable messages (they are only logged).
const RETRYABLE_MESSAGE_CHARS: usize = 200;
/// Character cap for fatal messages (they end up in the run summary).
const FATAL_MESSAGE_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// GeneratedAudio
// ---------------------------------------------------------------------------

/// Decoded audio returned by a successful request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAudio {
    /// Raw little-endian PCM (base64-decoded `inlineData.data`).
    pub pcm: Vec<u8>,
    /// Layout parsed from `inlineData.mimeType`.
    pub format: AudioFormat,
}

// ---------------------------------------------------------------------------
// RequestOutcome
// ---------------------------------------------------------------------------

/// Result of a single request attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(GeneratedAudio),
    RateLimited { message: String },
    Retryable { message: String },
    Fatal { status: u16, message: String },
}

impl RequestOutcome {
    /// Short tag for log lines (`rate-limited`, `retryable`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            RequestOutcome::Success(_) => "success",
            RequestOutcome::RateLimited { .. } => "rate-limited",
            RequestOutcome::Retryable { .. } => "retryable",
            RequestOutcome::Fatal { .. } => "fatal",
        }
    }
}

/// Transport failures (connect refused, DNS, timeouts, broken bodies) are
/// always retryable.
///
/// The URL is stripped first because it carries the API key as a query
/// parameter.
impl From<reqwest::Error> for RequestOutcome {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "request timed out".to_string()
        } else {
            e.without_url().to_string()
        };
        RequestOutcome::Retryable {
            message: truncate(&message, RETRYABLE_MESSAGE_CHARS).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// FatalError
// ---------------------------------------------------------------------------

/// A non-retryable client error; the only failure the retry engine surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {status}: {message}")]
pub struct FatalError {
    pub status: u16,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a non-2xx response from its status code and raw body.
///
/// ```
/// use word_tts::tts::{classify_status, RequestOutcome};
///
/// let outcome = classify_status(429, r#"{"error":{"message":"quota"}}"#);
/// assert_eq!(outcome, RequestOutcome::RateLimited { message: "quota".into() });
/// ```
pub fn classify_status(status: u16, body: &str) -> RequestOutcome {
    let message = error_message(body);

    match status {
        429 => RequestOutcome::RateLimited { message },
        500..=u16::MAX => RequestOutcome::Retryable {
            message: format!("HTTP {status}: {}", truncate(&message, RETRYABLE_MESSAGE_CHARS)),
        },
        400..=499 => RequestOutcome::Fatal {
            status,
            message: truncate(&message, FATAL_MESSAGE_CHARS).to_string(),
        },
        _ => RequestOutcome::Retryable {
            message: format!("HTTP {status}: {}", truncate(&message, RETRYABLE_MESSAGE_CHARS)),
        },
    }
}

/// Pull the audio payload out of a 2xx `generateContent` response.
///
/// Both camelCase and snake_case field names are accepted.  A response with
/// no audio, or with audio that is not valid base64, is treated as a flaky
/// upstream reply and classified [`RequestOutcome::Retryable`].
pub fn extract_audio(response: &Value) -> RequestOutcome {
    let part = &response["candidates"][0]["content"]["parts"][0];
    let inline = part.get("inlineData").or_else(|| part.get("inline_data"));

    let Some(inline) = inline else {
        return missing_audio();
    };

    let data = match inline.get("data").and_then(Value::as_str) {
        Some(data) if !data.is_empty() => data,
        _ => return missing_audio(),
    };

    let mime_type = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str);

    match base64::engine::general_purpose::STANDARD.decode(data) {
        Ok(pcm) => RequestOutcome::Success(GeneratedAudio {
            pcm,
            format: AudioFormat::from_mime_type(mime_type),
        }),
        Err(e) => RequestOutcome::Retryable {
            message: format!("audio payload is not valid base64: {e}"),
        },
    }
}

fn missing_audio() -> RequestOutcome {
    RequestOutcome::Retryable {
        message: "response is missing audio data".into(),
    }
}

/// `error.message` from a JSON error body, else the body itself.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => match json["error"]["message"].as_str() {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => json.to_string(),
        },
        Err(_) => body.trim().to_string(),
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
