//! Tests for loading and saving the game configuration.

use std::io::Write;

use nebula_sage::{LlmProvider, MAX_ATTEMPTS, RetryPolicy, SageConfig};
use tempfile::{NamedTempFile, tempdir};

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = SageConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, SageConfig::default());
    assert_eq!(*config.llm_provider(), LlmProvider::Gemini);
    assert_eq!(*config.max_attempts(), MAX_ATTEMPTS);
    assert_eq!(config.retry(), &RetryPolicy::default());
}

#[test]
fn test_toml_round_trip() {
    let config = SageConfig::for_provider(LlmProvider::OpenAI).muted();
    let toml = config.to_toml().unwrap();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();

    let loaded = SageConfig::from_file(file.path()).unwrap();
    assert_eq!(loaded, config);
    assert!(!*loaded.audio());
    assert!(!*loaded.narration());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "llm_provider = \"anthropic\"").unwrap();
    writeln!(file, "max_attempts = 5").unwrap();
    writeln!(file, "[retry]").unwrap();
    writeln!(file, "max_attempts = 1").unwrap();

    let config = SageConfig::from_file(file.path()).unwrap();
    assert_eq!(*config.llm_provider(), LlmProvider::Anthropic);
    assert_eq!(*config.max_attempts(), 5);
    assert_eq!(*config.retry().max_attempts(), 1);
    assert_eq!(*config.retry().transient_delay_ms(), 1000);
    assert!(*config.audio());
}

#[test]
fn test_unknown_provider_is_an_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "llm_provider = \"oracle-of-delphi\"").unwrap();

    let err = SageConfig::from_file(file.path()).unwrap_err();
    assert!(err.message.contains("Failed to parse config"), "{err}");
}

#[test]
fn test_unreadable_path_is_an_error() {
    let dir = tempdir().unwrap();
    let err = SageConfig::from_file(dir.path()).unwrap_err();
    assert!(err.message.contains("Failed to read config file"), "{err}");
}
