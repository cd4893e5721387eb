//! Policy configuration
//!
//! Retry parameters can live outside the code that uses them. A [`PolicyConfig`]
//! is read from TOML, JSON, or `STEADFAST_*` environment variables and then turned
//! into a [`RetryPolicyBuilder`], where the caller adds the parts that only code can
//! supply (the classifier and the observer).
//!
//! ```toml
//! max_attempts = 4
//!
//! [backoff]
//! kind = "exponential"
//! initial_ms = 200
//! max_ms = 5000
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use steadfast_core::{
    Backoff, DEFAULT_MAX_ATTEMPTS, ExponentialBackoff, RetryPolicy, RetryPolicyBuilder,
};
use tracing::debug;

/// Environment variable holding the total attempt budget.
pub const ENV_MAX_ATTEMPTS: &str = "STEADFAST_MAX_ATTEMPTS";
/// Environment variable selecting the backoff kind (`none`, `constant`, `exponential`).
pub const ENV_BACKOFF: &str = "STEADFAST_BACKOFF";
/// Environment variable holding the first (or constant) delay in milliseconds.
pub const ENV_BACKOFF_INITIAL_MS: &str = "STEADFAST_BACKOFF_INITIAL_MS";
/// Environment variable holding the delay cap in milliseconds.
pub const ENV_BACKOFF_MAX_MS: &str = "STEADFAST_BACKOFF_MAX_MS";
/// Environment variable holding the exponential multiplier.
pub const ENV_BACKOFF_MULTIPLIER: &str = "STEADFAST_BACKOFF_MULTIPLIER";
/// Environment variable holding the jitter factor.
pub const ENV_BACKOFF_JITTER: &str = "STEADFAST_BACKOFF_JITTER";

const BACKOFF_VARS: [&str; 4] = [
    ENV_BACKOFF_INITIAL_MS,
    ENV_BACKOFF_MAX_MS,
    ENV_BACKOFF_MULTIPLIER,
    ENV_BACKOFF_JITTER,
];

/// Serializable retry parameters.
///
/// Missing fields take their defaults: three attempts and no backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Total number of attempts, including the first
    pub max_attempts: u32,

    /// Delay schedule between attempts
    pub backoff: BackoffConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffConfig::None,
        }
    }
}

/// Serializable form of [`Backoff`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum BackoffConfig {
    /// Retry immediately
    #[default]
    None,

    /// Fixed delay between attempts
    Constant {
        /// Delay in milliseconds
        delay_ms: u64,
    },

    /// Exponentially growing delay
    Exponential {
        /// Delay before the first retry, in milliseconds
        #[serde(default = "default_initial_ms")]
        initial_ms: u64,
        /// Upper bound on any delay, in milliseconds
        #[serde(default = "default_max_ms")]
        max_ms: u64,
        /// Growth factor between consecutive delays
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        /// Jitter factor in `[0, 1]`
        #[serde(default = "default_jitter")]
        jitter: f64,
    },
}

fn default_initial_ms() -> u64 {
    ExponentialBackoff::DEFAULT_INITIAL_DELAY.as_millis() as u64
}

fn default_max_ms() -> u64 {
    ExponentialBackoff::DEFAULT_MAX_DELAY.as_millis() as u64
}

fn default_multiplier() -> f64 {
    ExponentialBackoff::DEFAULT_MULTIPLIER
}

fn default_jitter() -> f64 {
    ExponentialBackoff::DEFAULT_JITTER
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        match *config {
            BackoffConfig::None => Backoff::None,
            BackoffConfig::Constant { delay_ms } => {
                Backoff::Constant(Duration::from_millis(delay_ms))
            }
            BackoffConfig::Exponential {
                initial_ms,
                max_ms,
                multiplier,
                jitter,
            } => ExponentialBackoff::builder()
                .initial_delay(Duration::from_millis(initial_ms))
                .max_delay(Duration::from_millis(max_ms))
                .multiplier(multiplier)
                .jitter(jitter)
                .build()
                .into(),
        }
    }
}

impl PolicyConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        debug!(
            max_attempts = config.max_attempts,
            backoff = ?config.backoff,
            "loaded TOML policy config"
        );
        Ok(config)
    }

    /// Parse a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)?;
        debug!(
            max_attempts = config.max_attempts,
            backoff = ?config.backoff,
            "loaded JSON policy config"
        );
        Ok(config)
    }

    /// Read a config file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "reading policy config file");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `STEADFAST_MAX_ATTEMPTS` for the attempt budget (must be a valid u32)
    /// - `STEADFAST_BACKOFF` for the schedule: `none`, `constant` or `exponential`
    /// - `STEADFAST_BACKOFF_INITIAL_MS` for the first (or constant) delay
    /// - `STEADFAST_BACKOFF_MAX_MS` for the delay cap
    /// - `STEADFAST_BACKOFF_MULTIPLIER` for the exponential growth factor
    /// - `STEADFAST_BACKOFF_JITTER` for the jitter factor
    ///
    /// Unset variables keep their defaults. The delay variables only take effect
    /// together with a `STEADFAST_BACKOFF` kind that uses them: `constant` reads
    /// `STEADFAST_BACKOFF_INITIAL_MS`, `exponential` reads all four.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Env`] if a variable is set but cannot be parsed, or if a
    /// delay variable is set that the selected backoff kind does not use.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(max_attempts) = parse_var::<u32>(ENV_MAX_ATTEMPTS)? {
            config.max_attempts = max_attempts;
        }

        let initial_ms = parse_var::<u64>(ENV_BACKOFF_INITIAL_MS)?;
        let max_ms = parse_var::<u64>(ENV_BACKOFF_MAX_MS)?;
        let multiplier = parse_var::<f64>(ENV_BACKOFF_MULTIPLIER)?;
        let jitter = parse_var::<f64>(ENV_BACKOFF_JITTER)?;

        let kind = std::env::var(ENV_BACKOFF).ok();
        let kind_name = kind
            .as_deref()
            .map(|k| k.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let backoff = match kind_name.as_str() {
            "" | "none" => BackoffConfig::None,
            "constant" => BackoffConfig::Constant {
                delay_ms: initial_ms.unwrap_or_else(default_initial_ms),
            },
            "exponential" => BackoffConfig::Exponential {
                initial_ms: initial_ms.unwrap_or_else(default_initial_ms),
                max_ms: max_ms.unwrap_or_else(default_max_ms),
                multiplier: multiplier.unwrap_or_else(default_multiplier),
                jitter: jitter.unwrap_or_else(default_jitter),
            },
            _ => {
                return Err(Error::env(
                    ENV_BACKOFF,
                    kind.unwrap_or_default(),
                    "expected one of: none, constant, exponential",
                ));
            }
        };

        for var in BACKOFF_VARS {
            let used = match backoff {
                BackoffConfig::None => false,
                BackoffConfig::Constant { .. } => var == ENV_BACKOFF_INITIAL_MS,
                BackoffConfig::Exponential { .. } => true,
            };
            if used {
                continue;
            }
            if let Ok(value) = std::env::var(var) {
                let reason = match kind.as_deref() {
                    None => format!("requires {ENV_BACKOFF} to be set to constant or exponential"),
                    Some(kind) => format!("not used by {ENV_BACKOFF}={kind}"),
                };
                return Err(Error::env(var, value, reason));
            }
        }
        config.backoff = backoff;

        debug!(
            max_attempts = config.max_attempts,
            backoff = ?config.backoff,
            "loaded policy config from environment"
        );
        Ok(config)
    }

    /// Serialize as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Delay schedule described by this configuration.
    pub fn backoff(&self) -> Backoff {
        Backoff::from(&self.backoff)
    }

    /// Start a policy builder seeded with these parameters.
    ///
    /// Validation happens when the builder is built.
    pub fn builder<E: 'static>(&self) -> RetryPolicyBuilder<E> {
        RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .backoff(self.backoff())
    }

    /// Build a policy that retries every failure.
    pub fn policy<E: 'static>(&self) -> Result<RetryPolicy<E>> {
        Ok(self.builder().build()?)
    }
}

fn parse_var<T>(var: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::env(var, value.clone(), e.to_string())),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_defaults() {
        let config = PolicyConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, BackoffConfig::None);
        assert_eq!(config.backoff(), Backoff::None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = PolicyConfig::from_toml_str("").unwrap();
        assert_eq!(config, PolicyConfig::default());
    }

    #[test]
    fn test_exponential_fields_default_individually() {
        let config = PolicyConfig::from_toml_str(
            r#"
            [backoff]
            kind = "exponential"
            initial_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(
            config.backoff,
            BackoffConfig::Exponential {
                initial_ms: 250,
                max_ms: 60_000,
                multiplier: 2.0,
                jitter: 0.1,
            }
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PolicyConfig::from_toml_str("max_retries = 3").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_toml_roundtrip_preserves_backoff() {
        let config = PolicyConfig {
            max_attempts: 5,
            backoff: BackoffConfig::Constant { delay_ms: 50 },
        };
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(PolicyConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_toml_roundtrip_without_backoff() {
        let config = PolicyConfig {
            max_attempts: 2,
            backoff: BackoffConfig::None,
        };
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("kind = \"none\""), "rendered: {rendered}");
        assert_eq!(PolicyConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_toml_roundtrip_preserves_exponential_floats() {
        let config = PolicyConfig {
            max_attempts: 6,
            backoff: BackoffConfig::Exponential {
                initial_ms: 125,
                max_ms: 9_000,
                multiplier: 1.7,
                jitter: 0.33,
            },
        };
        let rendered = config.to_toml_string().unwrap();
        let parsed = PolicyConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, config);

        match parsed.backoff() {
            Backoff::Exponential(exponential) => {
                assert_eq!(exponential.multiplier(), 1.7);
                assert_eq!(exponential.jitter(), 0.33);
            }
            other => panic!("expected exponential backoff, got {other:?}"),
        }
    }

    #[test]
    fn test_policy_rejects_zero_attempts() {
        let config = PolicyConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let err = config.policy::<io::Error>().unwrap_err();
        assert!(matches!(err, Error::Configuration(ref e) if e.field() == "max_attempts"));
    }
}
