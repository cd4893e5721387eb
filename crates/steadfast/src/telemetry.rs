//! Retry telemetry through `tracing`.
//!
//! The core policy never logs. These helpers build observers that forward every
//! retried failure to the `tracing` ecosystem, so a subscriber decides where the
//! events end up.

use std::fmt::Display;
use std::sync::Arc;
use steadfast_core::{Observer, RetryPolicyBuilder};
use tracing::warn;

/// Observer that emits a `WARN` event for each retried failure.
///
/// Events carry the fields `operation`, `attempt` and `error`.
///
/// # Examples
///
/// ```rust
/// use steadfast::telemetry::tracing_observer;
/// use steadfast::RetryPolicy;
/// use std::io;
///
/// let policy = RetryPolicy::<io::Error>::builder()
///     .observer(tracing_observer("fetch_user"))
///     .build()
///     .unwrap();
/// ```
pub fn tracing_observer<E>(operation: impl Into<String>) -> Observer<E>
where
    E: Display + 'static,
{
    let operation: Arc<str> = Arc::from(operation.into());
    Observer::new(move |failure: &E, attempt| {
        warn!(
            operation = %operation,
            attempt,
            error = %failure,
            "operation failed, retrying"
        );
    })
}

/// Builder extension attaching a [`tracing_observer`].
pub trait LogRetries {
    /// Log every retried failure of `operation` at `WARN` level.
    fn log_retries(self, operation: impl Into<String>) -> Self;
}

impl<E> LogRetries for RetryPolicyBuilder<E>
where
    E: Display + 'static,
{
    fn log_retries(self, operation: impl Into<String>) -> Self {
        self.observer(tracing_observer(operation))
    }
}
