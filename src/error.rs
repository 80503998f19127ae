//! Configuration errors.
//!
//! Scanning a line never fails; the only fatal condition is a malformed set of
//! metrical constants, which is rejected when a component is constructed.

/// Error raised while loading or validating [`crate::MetricalConstants`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("character class `{0}` is empty")]
    EmptyClass(&'static str),
    #[error("scansion symbols must be distinct and non-whitespace, got {0:?}")]
    InvalidSymbols([char; 4]),
    #[error("vowel {0:?} has no macron mapping")]
    MissingMacron(char),
    #[error("diphthong {0:?} must be exactly two vowels")]
    InvalidDiphthong(String),
    #[error("entry {0:?} in `{1}` must be exactly two letters")]
    InvalidDigraph(String, &'static str),
    #[error("pattern built from constants failed to compile: {0}")]
    Pattern(#[from] regex::Error),
    #[error("failed to parse constants YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to read constants file: {0}")]
    Io(#[from] std::io::Error),
}
