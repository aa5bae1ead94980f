//! `SpeechApi` trait and the Gemini `generateContent` implementation.
//!
//! [`GeminiClient`] performs exactly one HTTP attempt per call and never
//! retries on its own; every result, including transport failures, is
//! reported as a [`RequestOutcome`] for the retry engine to act on.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::ApiConfig;
use crate::tts::outcome::{classify_status, extract_audio, RequestOutcome};

/// Proxy variables checked in order; the first non-blank one wins.
const PROXY_ENV_VARS: [&str; 4] = ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"];

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// Errors raised while constructing the HTTP client (setup time only).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid proxy URL {url:?}: {source}")]
    Proxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// SpeechRequest
// ---------------------------------------------------------------------------

/// Parameters of one speech generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub model: String,
    pub text: String,
    pub voice: String,
    pub temperature: f32,
}

/// JSON body for `models/{model}:generateContent` with audio output.
pub fn build_body(request: &SpeechRequest) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [ { "text": request.text } ] }
        ],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "temperature": request.temperature,
            "speech_config": {
                "voice_config": {
                    "prebuilt_voice_config": { "voice_name": request.voice }
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// SpeechApi trait
// ---------------------------------------------------------------------------

/// One request attempt against a TTS backend.
///
/// Implementors must be `Send + Sync` so they can be held behind an
/// `Arc<dyn SpeechApi>`.
#[async_trait]
pub trait SpeechApi: Send + Sync {
    async fn generate(&self, api_key: &str, request: &SpeechRequest) -> RequestOutcome;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Calls the Generative Language API with the key as a `key=` query parameter.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Build a client from config, honouring the proxy environment variables.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ClientError> {
        Self::with_proxy(config, proxy_from_env())
    }

    /// Build a client with an explicit (optional) forward proxy.
    pub fn with_proxy(config: &ApiConfig, proxy: Option<String>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs));

        builder = match proxy {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url.as_str())
                    .map_err(|source| ClientError::Proxy { url, source })?;
                log::info!("routing API requests through the configured proxy");
                builder.proxy(proxy)
            }
            // Proxy discovery is done by `proxy_from_env`, not by reqwest.
            None => builder.no_proxy(),
        };

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL for `model`, without the key.
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl SpeechApi for GeminiClient {
    async fn generate(&self, api_key: &str, request: &SpeechRequest) -> RequestOutcome {
        let url = self.endpoint(&request.model);
        log::debug!("POST {url} (voice {})", request.voice);

        let response = match self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&build_body(request))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return RequestOutcome::from(e),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RequestOutcome::from(e),
        };

        if !(200..300).contains(&status) {
            return classify_status(status, &body);
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(json) => extract_audio(&json),
            Err(e) => RequestOutcome::Retryable {
                message: format!("failed to parse response: {e}"),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Proxy discovery
// ---------------------------------------------------------------------------

/// First non-blank proxy URL from the process environment.
pub fn proxy_from_env() -> Option<String> {
    proxy_from_lookup(|name| std::env::var(name).ok())
}

fn proxy_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    PROXY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

// ---------------------------------------------------------------------------
// MockSpeechApi (test double)
// ---------------------------------------------------------------------------

/// Scripted [`SpeechApi`] that pops one outcome per call and records the key
/// and request it was called with.  Once the script runs out every call
/// succeeds with a short silent payload.
#[cfg(test)]
pub struct MockSpeechApi {
    script: std::sync::Mutex<std::collections::VecDeque<RequestOutcome>>,
    calls: std::sync::Mutex<Vec<(String, SpeechRequest)>>,
}

#[cfg(test)]
impl MockSpeechApi {
    pub fn new(script: Vec<RequestOutcome>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(Vec::new())
    }

    pub fn silence() -> RequestOutcome {
        RequestOutcome::Success(crate::tts::outcome::GeneratedAudio {
            pcm: vec![0u8; 480],
            format: crate::audio::AudioFormat::default(),
        })
    }

    /// Keys used so far, in call order.
    pub fn keys_used(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechApi for MockSpeechApi {
    async fn generate(&self, api_key: &str, request: &SpeechRequest) -> RequestOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((api_key.to_string(), request.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::silence)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request() -> SpeechRequest {
        SpeechRequest {
            model: "gemini-2.5-flash-preview-tts".into(),
            text: "Say cat".into(),
            voice: "Sulafat".into(),
            temperature: 1.0,
        }
    }

    #[test]
    fn body_matches_generate_content_shape() {
        let body = build_body(&request());

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Say cat");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(body["generationConfig"]["temperature"], 1.0);
        assert_eq!(
            body["generationConfig"]["speech_config"]["voice_config"]["prebuilt_voice_config"]
                ["voice_name"],
            "Sulafat"
        );
    }

    #[test]
    fn endpoint_has_no_key_and_no_double_slash() {
        let config = ApiConfig {
            base_url: "https://example.test/".into(),
            ..ApiConfig::default()
        };
        let client = GeminiClient::with_proxy(&config, None).expect("client");
        assert_eq!(
            client.endpoint("m1"),
            "https://example.test/v1beta/models/m1:generateContent"
        );
    }

    #[test]
    fn valid_proxy_is_accepted() {
        let client = GeminiClient::with_proxy(
            &ApiConfig::default(),
            Some("http://127.0.0.1:8080".into()),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn proxy_lookup_order_and_blanks() {
        let env: HashMap<&str, &str> = [
            ("HTTPS_PROXY", "   "),
            ("https_proxy", ""),
            ("HTTP_PROXY", " http://proxy:3128 "),
            ("http_proxy", "http://other:1"),
        ]
        .into_iter()
        .collect();

        let found = proxy_from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(found.as_deref(), Some("http://proxy:3128"));
    }

    #[test]
    fn no_proxy_when_unset() {
        assert_eq!(proxy_from_lookup(|_| None), None);
    }

    #[tokio::test]
    async fn unreachable_host_is_retryable() {
        // Port 9 on localhost is closed on CI machines; connect fails fast.
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".into(),
            connect_timeout_secs: 2,
            request_timeout_secs: 5,
            ..ApiConfig::default()
        };
        let client = GeminiClient::with_proxy(&config, None).expect("client");

        let outcome = client.generate("secret-key", &request()).await;
        match outcome {
            RequestOutcome::Retryable { message } => assert!(!message.contains("secret-key")),
            other => panic!("expected retryable, got {other:?}"),
        }
    }

    #[test]
    fn client_is_object_safe() {
        let client = GeminiClient::with_proxy(&ApiConfig::default(), None).expect("client");
        let _: Box<dyn SpeechApi> = Box::new(client);
    }
}
