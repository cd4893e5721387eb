//! Failure classification.
//!
//! A [`Classifier`] decides whether a failure is worth another attempt. It is a
//! plain value supplied by the caller, so retriability is an explicit part of the
//! policy rather than a blanket catch.

use std::fmt;
use std::io;
use std::sync::Arc;

/// Self-describing retriability.
///
/// Error types that know whether they are transient implement this trait and can
/// then be classified with [`Classifier::retriable`].
pub trait Retriable {
    /// Whether this failure should be retried.
    fn is_retriable(&self) -> bool;
}

impl Retriable for io::Error {
    fn is_retriable(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::Interrupted
                | io::ErrorKind::TimedOut
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::ConnectionRefused
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
        )
    }
}

type Predicate<E> = dyn Fn(&E) -> bool + Send + Sync;

/// Predicate deciding whether a failure is retriable.
///
/// Classifiers must be pure and total: they are evaluated once per failure and
/// their answer alone decides between retrying and giving up.
///
/// # Examples
///
/// ```rust
/// use steadfast_core::classify::Classifier;
/// use std::io;
///
/// let transient = Classifier::new(|e: &io::Error| e.kind() == io::ErrorKind::TimedOut)
///     .or(|e: &io::Error| e.kind() == io::ErrorKind::Interrupted);
///
/// assert!(transient.classify(&io::Error::from(io::ErrorKind::TimedOut)));
/// assert!(!transient.classify(&io::Error::from(io::ErrorKind::NotFound)));
/// ```
pub struct Classifier<E> {
    predicate: Arc<Predicate<E>>,
}

impl<E> Clone for Classifier<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E> fmt::Debug for Classifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier").finish_non_exhaustive()
    }
}

impl<E: 'static> Classifier<E> {
    /// Build a classifier from a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Retry every failure.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Retry nothing.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Evaluate the classifier.
    pub fn classify(&self, failure: &E) -> bool {
        (self.predicate)(failure)
    }

    /// Retriable if either this classifier or `other` says so.
    pub fn or<F>(self, other: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let this = self.predicate;
        Self::new(move |e| this(e) || other(e))
    }

    /// Retriable only if both this classifier and `other` say so.
    pub fn and<F>(self, other: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let this = self.predicate;
        Self::new(move |e| this(e) && other(e))
    }

    /// Invert the classification.
    pub fn negate(self) -> Self {
        let this = self.predicate;
        Self::new(move |e| !this(e))
    }
}

impl<E: Retriable + 'static> Classifier<E> {
    /// Defer to the failure's own [`Retriable`] implementation.
    pub fn retriable() -> Self {
        Self::new(|e: &E| e.is_retriable())
    }
}

impl<E: 'static> Default for Classifier<E> {
    fn default() -> Self {
        Self::always()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(io::ErrorKind::Interrupted, true)]
    #[case(io::ErrorKind::TimedOut, true)]
    #[case(io::ErrorKind::ConnectionReset, true)]
    #[case(io::ErrorKind::NotFound, false)]
    #[case(io::ErrorKind::PermissionDenied, false)]
    #[case(io::ErrorKind::InvalidData, false)]
    fn test_io_error_retriability(#[case] kind: io::ErrorKind, #[case] expected: bool) {
        let classifier = Classifier::<io::Error>::retriable();
        assert_eq!(classifier.classify(&io::Error::from(kind)), expected);
    }

    #[test]
    fn test_always_and_never() {
        let err = io::Error::other("boom");
        assert!(Classifier::<io::Error>::always().classify(&err));
        assert!(!Classifier::<io::Error>::never().classify(&err));
        assert!(Classifier::<io::Error>::default().classify(&err));
    }

    #[test]
    fn test_combinators() {
        let timed_out = |e: &io::Error| e.kind() == io::ErrorKind::TimedOut;
        let refused = |e: &io::Error| e.kind() == io::ErrorKind::ConnectionRefused;

        let either = Classifier::new(timed_out).or(refused);
        assert!(either.classify(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(either.classify(&io::Error::from(io::ErrorKind::ConnectionRefused)));
        assert!(!either.classify(&io::Error::from(io::ErrorKind::NotFound)));

        let both = Classifier::new(timed_out).and(refused);
        assert!(!both.classify(&io::Error::from(io::ErrorKind::TimedOut)));

        let inverted = Classifier::new(timed_out).negate();
        assert!(!inverted.classify(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(inverted.classify(&io::Error::from(io::ErrorKind::NotFound)));
    }

    #[test]
    fn test_clone_shares_predicate() {
        let classifier = Classifier::new(|e: &io::Error| e.to_string().contains("network"));
        let cloned = classifier.clone();
        assert!(cloned.classify(&io::Error::other("network unreachable")));
        assert!(!cloned.classify(&io::Error::other("auth failed")));
    }
}
