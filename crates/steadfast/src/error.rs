//! Error types for loading and building retry policies.

use steadfast_core::InvalidConfiguration;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning configuration into a policy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Policy parameters were rejected
    #[error(transparent)]
    Configuration(#[from] InvalidConfiguration),

    /// TOML document could not be parsed
    #[error("failed to parse TOML policy config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config could not be rendered as TOML
    #[error("failed to serialize policy config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON document could not be parsed
    #[error("failed to parse JSON policy config: {0}")]
    Json(#[from] serde_json::Error),

    /// Environment variable was set to something unusable
    #[error("environment variable {var} has invalid value '{value}': {reason}")]
    Env {
        /// Variable name
        var: &'static str,
        /// Raw value found in the environment
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Config file could not be read
    #[error("failed to read policy config: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an environment error.
    pub fn env(var: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
