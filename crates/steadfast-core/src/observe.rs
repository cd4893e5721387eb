//! Retry observation.

use crate::error::ObserverError;
use std::fmt;
use std::sync::Arc;

type Callback<E> = dyn Fn(&E, u32) -> Result<(), ObserverError> + Send + Sync;

/// Callback notified of each retriable failure that is followed by another attempt.
///
/// The attempt number passed to the callback is 1-indexed and names the attempt that
/// just failed. Observers are meant for telemetry: they see failures but cannot
/// change what the policy does next, except by failing themselves.
///
/// # Examples
///
/// ```rust
/// use steadfast_core::observe::Observer;
/// use std::io;
///
/// let observer = Observer::new(|err: &io::Error, attempt| {
///     eprintln!("Retry {attempt} due to {err}");
/// });
///
/// assert!(observer.notify(&io::Error::other("flaky"), 1).is_ok());
/// ```
pub struct Observer<E> {
    callback: Arc<Callback<E>>,
}

impl<E> Clone for Observer<E> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<E> fmt::Debug for Observer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").finish_non_exhaustive()
    }
}

impl<E: 'static> Observer<E> {
    /// Wrap an observer that cannot fail.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&E, u32) + Send + Sync + 'static,
    {
        Self::fallible(move |failure, attempt| {
            callback(failure, attempt);
            Ok(())
        })
    }

    /// Wrap an observer that may fail.
    ///
    /// A failing observer aborts the retry loop with
    /// [`RetryError::Observer`](crate::error::RetryError::Observer).
    pub fn fallible<F>(callback: F) -> Self
    where
        F: Fn(&E, u32) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Report a retriable failure of `attempt`.
    pub fn notify(&self, failure: &E, attempt: u32) -> Result<(), ObserverError> {
        (self.callback)(failure, attempt)
    }
}
