//! Game configuration loaded from TOML and the environment.

use crate::game::MAX_ATTEMPTS;
use crate::llm_client::{LlmConfig, LlmProvider};
use crate::retry::RetryPolicy;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "nebula_sage.toml";

/// Configuration for a Nebula Sage session.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct SageConfig {
    /// LLM provider (gemini, openai or anthropic).
    llm_provider: LlmProvider,

    /// Text model name.
    llm_model: String,

    /// Speech model name.
    speech_model: String,

    /// Prebuilt voice for narration.
    voice: String,

    /// Maximum tokens for Sage responses.
    llm_max_tokens: u32,

    /// Optional API base URL override.
    base_url: Option<String>,

    /// Guesses allowed per game.
    max_attempts: usize,

    /// Speak the Sage's messages aloud.
    narration: bool,

    /// Play cues and ambience.
    audio: bool,

    /// Retry behaviour for outbound calls.
    retry: RetryPolicy,
}

impl Default for SageConfig {
    fn default() -> Self {
        Self::for_provider(LlmProvider::Gemini)
    }
}

impl SageConfig {
    /// Creates a configuration with the default models for `provider`.
    #[instrument]
    pub fn for_provider(provider: LlmProvider) -> Self {
        let (llm_model, speech_model, voice) = match provider {
            LlmProvider::Gemini => ("gemini-3-flash-preview", "gemini-2.5-flash-preview-tts", "Charon"),
            LlmProvider::OpenAI => ("gpt-4o-mini", "gpt-4o-mini-tts", "onyx"),
            LlmProvider::Anthropic => ("claude-3-5-haiku-20241022", "", ""),
        };
        Self {
            llm_provider: provider,
            llm_model: llm_model.to_string(),
            speech_model: speech_model.to_string(),
            voice: voice.to_string(),
            llm_max_tokens: 150,
            base_url: None,
            max_attempts: MAX_ATTEMPTS,
            narration: provider != LlmProvider::Anthropic,
            audio: true,
            retry: RetryPolicy::default(),
        }
    }

    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(provider = %config.llm_provider, model = %config.llm_model, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Serializes this configuration to TOML.
    #[instrument(skip(self))]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to serialize config: {}", e)))
    }

    /// Disables narration and all sound.
    pub fn muted(mut self) -> Self {
        self.narration = false;
        self.audio = false;
        self
    }

    /// Creates LLM configuration from this config.
    /// Requires GEMINI_API_KEY (or API_KEY), OPENAI_API_KEY or ANTHROPIC_API_KEY.
    #[instrument(skip(self), fields(provider = %self.llm_provider, model = %self.llm_model))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        debug!("Creating LLM config");

        let api_key = match self.llm_provider {
            LlmProvider::Gemini => std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .map_err(|_| {
                    ConfigError::new("GEMINI_API_KEY environment variable not set".to_string())
                })?,
            LlmProvider::OpenAI => std::env::var("OPENAI_API_KEY").map_err(|_| {
                ConfigError::new("OPENAI_API_KEY environment variable not set".to_string())
            })?,
            LlmProvider::Anthropic => std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                ConfigError::new("ANTHROPIC_API_KEY environment variable not set".to_string())
            })?,
        };

        if api_key.trim().is_empty() {
            warn!("API key is empty");
            return Err(ConfigError::new("API key is empty".to_string()));
        }

        let config = LlmConfig::new(
            self.llm_provider,
            api_key,
            self.llm_model.clone(),
            self.speech_model.clone(),
            self.voice.clone(),
            self.llm_max_tokens,
        );
        Ok(match &self.base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
