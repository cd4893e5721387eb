//! Error types for retry policies.
//!
//! Every `execute` call ends in either the action's success value or exactly one
//! [`RetryError`], whose variant tells the caller which way the policy gave up:
//!
//! - [`RetryError::NonRetriable`] - the classifier rejected the failure
//! - [`RetryError::Exhausted`] - the attempt budget ran out
//! - [`RetryError::Observer`] - the caller-supplied observer failed
//!
//! Construction problems are reported separately as [`InvalidConfiguration`], so a
//! policy value that exists is always a valid one.

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error type carried by a failing observer.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A policy could not be built from the supplied parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration for `{field}`: {reason}")]
pub struct InvalidConfiguration {
    field: &'static str,
    reason: String,
}

impl InvalidConfiguration {
    /// Create a configuration error for the named field.
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending parameter.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Human-readable explanation.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Error raised by a retry observer.
///
/// Observers are telemetry hooks; when one fails the policy stops and reports it
/// instead of retrying past it.
#[derive(Debug, Error)]
#[error("retry observer failed: {source}")]
pub struct ObserverError {
    #[source]
    source: BoxError,
}

impl ObserverError {
    /// Wrap an arbitrary error.
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Create an observer error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            source: message.into(),
        }
    }
}

/// Category of a terminal failure, for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The classifier declared the failure non-retriable.
    NonRetriable,
    /// Every permitted attempt failed with a retriable failure.
    Exhausted,
    /// The observer failed while being notified of a retriable failure.
    Observer,
}

/// Terminal failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The action failed with a failure the classifier does not retry.
    ///
    /// The failure is returned unchanged; `attempt` is the attempt it occurred on.
    #[error("non-retriable failure on attempt {attempt}: {failure}")]
    NonRetriable {
        /// Attempt number (1-indexed) that produced the failure
        attempt: u32,
        /// The action's failure
        #[source]
        failure: E,
    },

    /// The last permitted attempt still failed with a retriable failure.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        /// Total number of attempts made
        attempts: u32,
        /// Failure of the final attempt
        #[source]
        last: E,
    },

    /// The observer failed while being notified about a retriable failure.
    #[error("retry observer failed on attempt {attempt}: {source}")]
    Observer {
        /// Attempt number whose failure was being reported
        attempt: u32,
        /// The failure the observer was notified about
        failure: E,
        /// What the observer reported
        #[source]
        source: ObserverError,
    },
}

impl<E> RetryError<E> {
    /// Which way the policy gave up.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NonRetriable { .. } => FailureKind::NonRetriable,
            Self::Exhausted { .. } => FailureKind::Exhausted,
            Self::Observer { .. } => FailureKind::Observer,
        }
    }

    /// The action failure behind this terminal error.
    pub fn failure(&self) -> &E {
        match self {
            Self::NonRetriable { failure, .. } => failure,
            Self::Exhausted { last, .. } => last,
            Self::Observer { failure, .. } => failure,
        }
    }

    /// Consume the error and return the underlying action failure.
    pub fn into_failure(self) -> E {
        match self {
            Self::NonRetriable { failure, .. } => failure,
            Self::Exhausted { last, .. } => last,
            Self::Observer { failure, .. } => failure,
        }
    }

    /// Number of times the action was invoked before the policy gave up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::NonRetriable { attempt, .. } => *attempt,
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Observer { attempt, .. } => *attempt,
        }
    }

    /// `true` when the attempt budget was consumed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_invalid_configuration_display() {
        let err = InvalidConfiguration::new("max_attempts", "must be at least 1 (got 0)");
        assert_eq!(err.field(), "max_attempts");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `max_attempts`: must be at least 1 (got 0)"
        );
    }

    #[test]
    fn test_exhausted_exposes_last_failure_as_source() {
        let err = RetryError::Exhausted {
            attempts: 3,
            last: io::Error::other("attempt 3"),
        };

        assert_eq!(err.kind(), FailureKind::Exhausted);
        assert_eq!(err.attempts(), 3);
        assert!(err.is_exhausted());
        assert_eq!(err.to_string(), "retries exhausted after 3 attempts: attempt 3");

        let source = err.source().expect("exhausted error should carry a source");
        assert_eq!(source.to_string(), "attempt 3");
    }

    #[test]
    fn test_observer_error_keeps_both_failures() {
        let err = RetryError::Observer {
            attempt: 2,
            failure: io::Error::other("flaky"),
            source: ObserverError::msg("sink closed"),
        };

        assert_eq!(err.kind(), FailureKind::Observer);
        assert!(!err.is_exhausted());
        assert_eq!(err.failure().to_string(), "flaky");
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("retry observer failed: sink closed".to_string())
        );
    }

    #[test]
    fn test_into_failure_returns_unchanged_value() {
        let err = RetryError::NonRetriable {
            attempt: 1,
            failure: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        let failure = err.into_failure();
        assert_eq!(failure.kind(), io::ErrorKind::PermissionDenied);
    }
}
