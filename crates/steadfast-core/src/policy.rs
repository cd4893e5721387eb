//! The retry policy.

use crate::backoff::Backoff;
use crate::classify::Classifier;
use crate::error::{InvalidConfiguration, ObserverError, RetryError};
use crate::observe::Observer;
use std::fmt;
use std::future::Future;

/// Total attempts used when the builder is not told otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Runs a fallible action under a bounded retry budget.
///
/// A policy owns a [`Classifier`] deciding which failures are retriable, the total
/// number of attempts allowed (including the first), an optional [`Observer`]
/// notified of every retried failure, and a [`Backoff`] schedule (immediate retry by
/// default).
///
/// Policies are immutable once built. They can be cloned cheaply and shared between
/// threads; every `execute` call keeps its own attempt counter.
///
/// # Examples
///
/// ```rust
/// use steadfast_core::RetryPolicy;
/// use std::io;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = RetryPolicy::builder()
///     .handle(|e: &io::Error| e.kind() == io::ErrorKind::TimedOut)
///     .retries(3)
///     .on_retry(|err, attempt| eprintln!("Retry {attempt} due to {err}"))
///     .build()?;
///
/// let mut calls = 0;
/// let value = policy.execute(|| {
///     calls += 1;
///     if calls < 3 {
///         Err(io::Error::from(io::ErrorKind::TimedOut))
///     } else {
///         Ok(42)
///     }
/// })?;
///
/// assert_eq!(value, 42);
/// assert_eq!(calls, 3);
/// # Ok(())
/// # }
/// ```
pub struct RetryPolicy<E> {
    classifier: Classifier<E>,
    max_attempts: u32,
    observer: Option<Observer<E>>,
    backoff: Backoff,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            classifier: self.classifier.clone(),
            max_attempts: self.max_attempts,
            observer: self.observer.clone(),
            backoff: self.backoff.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("has_observer", &self.observer.is_some())
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// What to do with a failed attempt.
enum Step<E> {
    Retry,
    Stop(RetryError<E>),
}

impl<E: 'static> RetryPolicy<E> {
    /// Create a policy from its three essential parts.
    ///
    /// Fails with [`InvalidConfiguration`] when `max_attempts` is zero.
    pub fn new(
        classifier: Classifier<E>,
        max_attempts: u32,
        observer: Option<Observer<E>>,
    ) -> Result<Self, InvalidConfiguration> {
        let mut builder = Self::builder().classifier(classifier).max_attempts(max_attempts);
        builder.observer = observer;
        builder.build()
    }

    /// Create a new builder for configuring a policy.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::default()
    }

    /// Total number of executions allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_attempts - 1
    }

    /// Delay schedule between attempts.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Whether an observer is attached.
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Apply the policy's classifier to a failure.
    pub fn is_retriable(&self, failure: &E) -> bool {
        self.classifier.classify(failure)
    }

    /// Run `action` until it succeeds, fails non-retriably, or the budget runs out.
    ///
    /// Blocks the calling thread for the configured backoff between attempts, if any.
    ///
    /// # Returns
    /// - `Ok(T)`: the first successful result
    /// - `Err(RetryError::NonRetriable)`: the classifier rejected a failure
    /// - `Err(RetryError::Exhausted)`: the final permitted attempt failed
    /// - `Err(RetryError::Observer)`: the observer failed
    pub fn execute<T, F>(&self, mut action: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            let failure = match action() {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            match self.on_failure(failure, attempt) {
                Step::Stop(err) => return Err(err),
                Step::Retry => {
                    if let Some(delay) = self.backoff.delay(attempt) {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Async counterpart of [`execute`](Self::execute).
    ///
    /// Waits with `tokio::time::sleep` when a backoff is configured. Dropping the
    /// returned future cancels the remaining attempts.
    pub async fn execute_async<T, F, Fut>(&self, mut action: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let failure = match action().await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            match self.on_failure(failure, attempt) {
                Step::Stop(err) => return Err(err),
                Step::Retry => {
                    if let Some(delay) = self.backoff.delay(attempt) {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Classify a failure of `attempt` and notify the observer when it will be retried.
    fn on_failure(&self, failure: E, attempt: u32) -> Step<E> {
        if !self.classifier.classify(&failure) {
            return Step::Stop(RetryError::NonRetriable { attempt, failure });
        }

        if attempt >= self.max_attempts {
            return Step::Stop(RetryError::Exhausted {
                attempts: attempt,
                last: failure,
            });
        }

        if let Some(observer) = &self.observer
            && let Err(source) = observer.notify(&failure, attempt)
        {
            return Step::Stop(RetryError::Observer {
                attempt,
                failure,
                source,
            });
        }

        Step::Retry
    }
}

/// Builder for configuring a [`RetryPolicy`].
///
/// Defaults: [`DEFAULT_MAX_ATTEMPTS`] attempts, every failure retriable, no
/// observer, no backoff.
pub struct RetryPolicyBuilder<E> {
    classifier: Option<Classifier<E>>,
    max_attempts: u32,
    observer: Option<Observer<E>>,
    backoff: Backoff,
}

impl<E> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self {
            classifier: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            observer: None,
            backoff: Backoff::None,
        }
    }
}

impl<E> fmt::Debug for RetryPolicyBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicyBuilder")
            .field("max_attempts", &self.max_attempts)
            .field("has_classifier", &self.classifier.is_some())
            .field("has_observer", &self.observer.is_some())
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<E: 'static> RetryPolicyBuilder<E> {
    /// Set the total number of attempts, including the first.
    ///
    /// Must be at least 1; checked by [`build`](Self::build).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Allow `retries` retries after the first attempt.
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_attempts = retries.saturating_add(1);
        self
    }

    /// Replace the classifier.
    pub fn classifier(mut self, classifier: Classifier<E>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Retry only failures matching `predicate`.
    pub fn handle<F>(self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.classifier(Classifier::new(predicate))
    }

    /// Also retry failures matching `predicate`.
    ///
    /// Without a prior [`handle`](Self::handle) this is the same as `handle`.
    pub fn or_handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.classifier = Some(match self.classifier.take() {
            Some(existing) => existing.or(predicate),
            None => Classifier::new(predicate),
        });
        self
    }

    /// Notify `callback` of every retried failure.
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E, u32) + Send + Sync + 'static,
    {
        self.observer = Some(Observer::new(callback));
        self
    }

    /// Notify a fallible `callback` of every retried failure.
    pub fn try_on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E, u32) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.observer = Some(Observer::fallible(callback));
        self
    }

    /// Attach a prepared observer.
    pub fn observer(mut self, observer: Observer<E>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the delay schedule between attempts.
    pub fn backoff(mut self, backoff: impl Into<Backoff>) -> Self {
        self.backoff = backoff.into();
        self
    }

    /// Validate the parameters and build the policy.
    pub fn build(self) -> Result<RetryPolicy<E>, InvalidConfiguration> {
        if self.max_attempts < 1 {
            return Err(InvalidConfiguration::new(
                "max_attempts",
                format!("must be at least 1 (got {})", self.max_attempts),
            ));
        }
        self.backoff.validate()?;

        Ok(RetryPolicy {
            classifier: self.classifier.unwrap_or_default(),
            max_attempts: self.max_attempts,
            observer: self.observer,
            backoff: self.backoff,
        })
    }
}
