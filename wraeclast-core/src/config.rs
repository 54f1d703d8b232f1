//! Engine configuration loaded from TOML.
//!
//! Every section is optional; a missing file section falls back to the
//! built-in defaults. Example:
//! ```toml
//! [vocabulary]
//! negative_words = ["reduced", "less", "decreased"]
//! positive_words = ["increased", "more", "additional"]
//!
//! [extract]
//! max_magnitude = 1000000000.0
//!
//! [writer]
//! max_retries = 5
//! backoff_base_ms = 100
//!
//! [pass]
//! deadline_secs = 600
//! workers = 8
//! ```

use crate::error::{Result, WraeclastError};
use serde::Deserialize;
use std::path::Path;

/// Qualifier words that decide a modifier's sign when no explicit `-`
/// is present. Vocabulary, not code: snapshots add wording ("lowered",
/// "amplified") without an engine release.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Vocabulary {
    pub negative_words: Vec<String>,
    pub positive_words: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary {
            negative_words: vec![
                "reduced".to_string(),
                "less".to_string(),
                "decreased".to_string(),
            ],
            positive_words: vec![
                "increased".to_string(),
                "more".to_string(),
                "additional".to_string(),
            ],
        }
    }
}

impl Vocabulary {
    pub fn is_negative(&self, word: &str) -> bool {
        let word = word.to_ascii_lowercase();
        self.negative_words.iter().any(|w| w.eq_ignore_ascii_case(&word))
    }

    pub fn is_positive(&self, word: &str) -> bool {
        let word = word.to_ascii_lowercase();
        self.positive_words.iter().any(|w| w.eq_ignore_ascii_case(&word))
    }
}

/// Bounds applied during magnitude extraction.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractConfig {
    pub max_magnitude: f64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            max_magnitude: 1.0e9,
        }
    }
}

/// Retry policy for the normalized modifier writer.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WriterConfig {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            max_retries: 5,
            backoff_base_ms: 100,
        }
    }
}

/// Whole-pass limits.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PassConfig {
    /// Soft deadline in seconds; once exceeded the pass stops issuing
    /// writes and reports the remainder as unprocessed.
    pub deadline_secs: Option<u64>,
    /// Rayon worker count; None uses the global default.
    pub workers: Option<usize>,
}

/// Complete engine configuration loaded from TOML.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub vocabulary: Vocabulary,
    pub extract: ExtractConfig,
    pub writer: WriterConfig,
    pub pass: PassConfig,
}

impl EngineConfig {
    /// Load engine configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WraeclastError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read engine config from {:?}: {}", path, e),
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse engine configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| WraeclastError::Config(format!("Failed to parse engine config TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[vocabulary]
negative_words = ["reduced", "lowered"]
positive_words = ["increased"]

[extract]
max_magnitude = 5000.0

[writer]
max_retries = 3
backoff_base_ms = 50

[pass]
deadline_secs = 120
workers = 4
"#;

        let config = EngineConfig::from_str(toml).unwrap();
        assert_eq!(config.vocabulary.negative_words, vec!["reduced", "lowered"]);
        assert_eq!(config.extract.max_magnitude, 5000.0);
        assert_eq!(config.writer.max_retries, 3);
        assert_eq!(config.writer.backoff_base_ms, 50);
        assert_eq!(config.pass.deadline_secs, Some(120));
        assert_eq!(config.pass.workers, Some(4));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_str("").unwrap();
        assert!(config.vocabulary.is_negative("reduced"));
        assert!(config.vocabulary.is_positive("increased"));
        assert_eq!(config.extract.max_magnitude, 1.0e9);
        assert_eq!(config.writer.max_retries, 5);
        assert_eq!(config.writer.backoff_base_ms, 100);
        assert_eq!(config.pass.deadline_secs, None);
        assert_eq!(config.pass.workers, None);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = EngineConfig::from_str("[writer]\nmax_retries = 1\n").unwrap();
        assert_eq!(config.writer.max_retries, 1);
        assert_eq!(config.writer.backoff_base_ms, 100);
        assert_eq!(config.extract.max_magnitude, 1.0e9);
    }

    #[test]
    fn test_vocabulary_is_case_insensitive() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_negative("Reduced"));
        assert!(vocab.is_negative("LESS"));
        assert!(vocab.is_positive("Additional"));
        assert!(!vocab.is_negative("increased"));
        assert!(!vocab.is_positive("wither"));
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = EngineConfig::from_str("[writer\nmax_retries = 1").unwrap_err();
        assert!(matches!(err, WraeclastError::Config(_)));
    }
}
