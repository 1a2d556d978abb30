//! HTTP client for hosted text and speech models (Gemini, OpenAI, Anthropic).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use derive_getters::Getters;
use derive_more::{Display, Error};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::retry::{Classify, ErrorClass};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Sample rate of the 16-bit mono PCM returned by Gemini and OpenAI speech.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LlmProvider {
    /// Google Gemini.
    Gemini,
    /// OpenAI (GPT models).
    OpenAI,
    /// Anthropic (Claude models). Text only.
    Anthropic,
}

/// Configuration for LLM client.
#[derive(Debug, Clone, Getters)]
pub struct LlmConfig {
    provider: LlmProvider,
    #[getter(skip)]
    api_key: String,
    model: String,
    speech_model: String,
    voice: String,
    max_tokens: u32,
    base_url: String,
}

impl LlmConfig {
    /// Creates a new LLM configuration pointing at the provider's public endpoint.
    #[instrument(skip(api_key), fields(provider = %provider, model = %model))]
    pub fn new(
        provider: LlmProvider,
        api_key: String,
        model: String,
        speech_model: String,
        voice: String,
        max_tokens: u32,
    ) -> Self {
        debug!("Creating LLM config");
        let base_url = match provider {
            LlmProvider::Gemini => GEMINI_BASE_URL,
            LlmProvider::OpenAI => OPENAI_BASE_URL,
            LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
        }
        .to_string();
        Self {
            provider,
            api_key,
            model,
            speech_model,
            voice,
            max_tokens,
            base_url,
        }
    }

    /// Overrides the API base URL (proxies, local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Gets the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// Raw speech audio: mono 16-bit PCM.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SpeechClip {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl SpeechClip {
    /// Wraps decoded samples.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decodes little-endian 16-bit PCM bytes. A trailing odd byte is dropped.
    pub fn from_pcm_le(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Samples scaled to `[-1.0, 1.0]`.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| (f32::from(s) / f32::from(i16::MAX)).max(-1.0))
            .collect()
    }

    /// Playback length at the native rate.
    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate.max(1)))
    }
}

/// LLM client that abstracts over multiple providers.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = %config.provider()))]
    pub fn new(config: LlmConfig) -> Self {
        info!("Creating LLM client");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Generates a completion from a system prompt and user message.
    #[instrument(skip(self, system_prompt, user_message), fields(provider = %self.config.provider, model = %self.config.model))]
    pub async fn generate(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        debug!("Generating completion");
        match self.config.provider {
            LlmProvider::Gemini => self.generate_gemini(system_prompt, user_message).await,
            LlmProvider::OpenAI => self.generate_openai(system_prompt, user_message).await,
            LlmProvider::Anthropic => self.generate_anthropic(system_prompt, user_message).await,
        }
    }

    /// Synthesizes speech for `text`.
    ///
    /// Anthropic has no speech endpoint and always returns a fatal error.
    #[instrument(skip(self, text), fields(provider = %self.config.provider, chars = text.len()))]
    pub async fn synthesize_speech(&self, text: &str) -> Result<SpeechClip, LlmError> {
        match self.config.provider {
            LlmProvider::Gemini => self.speech_gemini(text).await,
            LlmProvider::OpenAI => self.speech_openai(text).await,
            LlmProvider::Anthropic => Err(LlmError::new(
                LlmErrorKind::Unsupported,
                "Anthropic does not offer speech synthesis".to_string(),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Gemini
    // ─────────────────────────────────────────────────────────────

    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_gemini(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let body = serde_json::json!({
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_message }] }],
            "generationConfig": { "maxOutputTokens": self.config.max_tokens }
        });

        debug!("Sending request to Gemini");
        let request = self
            .http
            .post(url)
            .header("x-goog-api-key", self.config.api_key.clone())
            .json(&body);
        let json = send_json(request, "Gemini").await?;

        if !json["candidates"][0].is_object() {
            error!(response = %json, "No candidates in Gemini response");
            return Err(LlmError::new(
                LlmErrorKind::Parse,
                "No candidates in Gemini response".to_string(),
            ));
        }
        let content = gemini_parts(&json)
            .filter_map(|part| part["text"].as_str())
            .collect::<String>();
        if content.trim().is_empty() {
            warn!(finish_reason = %json["candidates"][0]["finishReason"], "Gemini answered without text");
        }

        info!(content_length = content.len(), "Generated completion");
        Ok(content.trim().to_string())
    }

    #[instrument(skip(self, text))]
    async fn speech_gemini(&self, text: &str) -> Result<SpeechClip, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.speech_model
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": format!("[Mystical ancient voice, deep and resonant] {text}") }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.config.voice } }
                }
            }
        });

        debug!("Sending speech request to Gemini");
        let request = self
            .http
            .post(url)
            .header("x-goog-api-key", self.config.api_key.clone())
            .json(&body);
        let json = send_json(request, "Gemini TTS").await?;

        let encoded = gemini_parts(&json)
            .find_map(|part| part["inlineData"]["data"].as_str())
            .ok_or_else(|| {
                LlmError::new(
                    LlmErrorKind::Parse,
                    "No inline audio in Gemini response".to_string(),
                )
            })?;
        let bytes = BASE64.decode(encoded).map_err(|e| {
            LlmError::new(LlmErrorKind::Parse, format!("Invalid base64 audio: {}", e))
        })?;

        let clip = SpeechClip::from_pcm_le(&bytes, SPEECH_SAMPLE_RATE);
        info!(samples = clip.samples().len(), "Synthesized speech");
        Ok(clip)
    }

    // ─────────────────────────────────────────────────────────────
    //  OpenAI
    // ─────────────────────────────────────────────────────────────

    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_openai(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_message }
            ]
        });

        debug!("Sending request to OpenAI");
        let request = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body);
        let json = send_json(request, "OpenAI").await?;

        let message = &json["choices"][0]["message"];
        if !message.is_object() {
            error!(response = %json, "No message in OpenAI response");
            return Err(LlmError::new(
                LlmErrorKind::Parse,
                "No message in OpenAI response".to_string(),
            ));
        }
        // A refusal or length cut-off can leave content null.
        let content = message["content"].as_str().unwrap_or_default().trim().to_string();
        if content.is_empty() {
            warn!(finish_reason = %json["choices"][0]["finish_reason"], "OpenAI answered without text");
        }

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }

    #[instrument(skip(self, text))]
    async fn speech_openai(&self, text: &str) -> Result<SpeechClip, LlmError> {
        let body = serde_json::json!({
            "model": self.config.speech_model,
            "voice": self.config.voice,
            "input": text,
            "response_format": "pcm"
        });

        debug!("Sending speech request to OpenAI");
        let response = self
            .http
            .post(format!("{}/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport("OpenAI TTS", &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status("OpenAI TTS", status, &text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LlmError::from_transport("OpenAI TTS", &e))?;
        let clip = SpeechClip::from_pcm_le(&bytes, SPEECH_SAMPLE_RATE);
        info!(samples = clip.samples().len(), "Synthesized speech");
        Ok(clip)
    }

    // ─────────────────────────────────────────────────────────────
    //  Anthropic
    // ─────────────────────────────────────────────────────────────

    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_anthropic(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system_prompt,
            "messages": [
                { "role": "user", "content": user_message }
            ]
        });

        debug!("Sending request to Anthropic");
        let request = self
            .http
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", self.config.api_key.clone())
            .header("anthropic-version", "2023-06-01")
            .json(&body);
        let json = send_json(request, "Anthropic").await?;

        let blocks = json["content"].as_array().ok_or_else(|| {
            error!(response = %json, "No content in Anthropic response");
            LlmError::new(
                LlmErrorKind::Parse,
                "No content in Anthropic response".to_string(),
            )
        })?;
        let content = blocks
            .iter()
            .filter_map(|block| block["text"].as_str())
            .collect::<String>()
            .trim()
            .to_string();
        if content.is_empty() {
            warn!(stop_reason = %json["stop_reason"], "Anthropic answered without text");
        }

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

/// Sends a request and parses a JSON body, mapping failures onto [`LlmError`].
async fn send_json(request: reqwest::RequestBuilder, api: &str) -> Result<serde_json::Value, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::from_transport(api, &e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| LlmError::from_transport(api, &e))?;

    if !status.is_success() {
        return Err(LlmError::from_status(api, status, &response_text));
    }

    debug!(response_length = response_text.len(), api, "Parsing response");
    serde_json::from_str(&response_text).map_err(|e| {
        error!(error = ?e, api, "Failed to parse response");
        LlmError::new(LlmErrorKind::Parse, format!("Failed to parse {} response: {}", api, e))
    })
}

fn gemini_parts(json: &serde_json::Value) -> impl Iterator<Item = &serde_json::Value> {
    json["candidates"][0]["content"]["parts"]
        .as_array()
        .into_iter()
        .flatten()
}

/// Category of an [`LlmError`], used for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LlmErrorKind {
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx gateway/availability errors.
    Server,
    /// Connection failures and timeouts.
    Transport,
    /// Other non-success HTTP statuses (bad request, auth).
    Rejected,
    /// Response body did not have the expected shape.
    Parse,
    /// Operation not offered by the provider.
    Unsupported,
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error ({}): {} at {}:{}", kind, message, file, line)]
pub struct LlmError {
    /// Error category.
    pub kind: LlmErrorKind,
    /// Error message.
    pub message: String,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: LlmErrorKind, message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, %kind, "LLM error created");
        Self {
            kind,
            message,
            status: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Maps a non-success HTTP status onto an error kind.
    #[track_caller]
    pub fn from_status(api: &str, status: StatusCode, body: &str) -> Self {
        let kind = match status.as_u16() {
            429 => LlmErrorKind::RateLimited,
            500 | 502 | 503 | 504 => LlmErrorKind::Server,
            _ => LlmErrorKind::Rejected,
        };
        let mut err = Self::new(kind, format!("{} API error {}: {}", api, status, body));
        err.status = Some(status.as_u16());
        err
    }

    /// Maps a reqwest failure that produced no usable response.
    #[track_caller]
    pub fn from_transport(api: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() {
            LlmErrorKind::Transport
        } else if let Some(status) = err.status() {
            return Self::from_status(api, status, &err.to_string());
        } else if err.is_decode() {
            LlmErrorKind::Parse
        } else {
            LlmErrorKind::Transport
        };
        Self::new(kind, format!("{} API request failed: {}", api, err))
    }
}

impl Classify for LlmError {
    fn classify(&self) -> ErrorClass {
        match self.kind {
            LlmErrorKind::RateLimited => ErrorClass::RateLimited,
            LlmErrorKind::Server | LlmErrorKind::Transport => ErrorClass::Transient,
            LlmErrorKind::Rejected | LlmErrorKind::Parse | LlmErrorKind::Unsupported => {
                ErrorClass::Fatal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_retry_classes() {
        let classify = |code: u16| {
            LlmError::from_status("test", StatusCode::from_u16(code).unwrap(), "").classify()
        };
        assert_eq!(classify(429), ErrorClass::RateLimited);
        assert_eq!(classify(500), ErrorClass::Transient);
        assert_eq!(classify(503), ErrorClass::Transient);
        assert_eq!(classify(400), ErrorClass::Fatal);
        assert_eq!(classify(401), ErrorClass::Fatal);
        assert_eq!(classify(404), ErrorClass::Fatal);
    }

    #[test]
    fn status_is_recorded() {
        let err = LlmError::from_status("test", StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.status, Some(429));
        assert!(err.message.contains("slow down"));
    }

    #[test]
    fn pcm_decodes_little_endian() {
        let clip = SpeechClip::from_pcm_le(&[0x01, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x42], 24_000);
        assert_eq!(clip.samples(), &vec![1, i16::MAX, i16::MIN]);
        let floats = clip.to_f32();
        assert!((floats[1] - 1.0).abs() < f32::EPSILON);
        assert!(floats[2] < -1.0 + 0.001);
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let config = LlmConfig::new(
            LlmProvider::OpenAI,
            "key".to_string(),
            "m".to_string(),
            "tts".to_string(),
            "onyx".to_string(),
            10,
        )
        .with_base_url("http://localhost:9999/v1/");
        assert_eq!(config.base_url(), "http://localhost:9999/v1");
    }
}
