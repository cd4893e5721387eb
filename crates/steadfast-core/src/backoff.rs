//! Delay schedules between attempts.
//!
//! A policy retries immediately unless it is given a [`Backoff`]. The schedule is
//! consulted after a retriable failure has been reported to the observer and
//! before the next attempt starts; it is never consulted after the final attempt.

use crate::error::InvalidConfiguration;
use std::time::Duration;

/// Delay applied between a retried failure and the next attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,

    /// Wait the same amount before every retry.
    Constant(Duration),

    /// Exponentially growing delay with jitter.
    Exponential(ExponentialBackoff),
}

impl Backoff {
    /// Delay before the attempt that follows failed attempt `attempt` (1-indexed).
    ///
    /// Returns `None` when the policy should retry without waiting.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            Backoff::None => None,
            Backoff::Constant(delay) => Some(*delay),
            Backoff::Exponential(exponential) => Some(exponential.delay(attempt)),
        }
    }

    /// Check the schedule's parameters.
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        match self {
            Backoff::None | Backoff::Constant(_) => Ok(()),
            Backoff::Exponential(exponential) => exponential.validate(),
        }
    }
}

/// Exponential backoff with configurable jitter.
///
/// For failed attempt `n` (1-indexed):
/// ```text
/// base_delay   = initial_delay * multiplier^(n - 1)
/// jitter_range = base_delay * jitter
/// final_delay  = min(base_delay + random(-jitter_range, +jitter_range), max_delay)
/// ```
///
/// # Examples
///
/// ```rust
/// use steadfast_core::backoff::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(5))
///     .multiplier(2.0)
///     .jitter(0.0)
///     .build();
///
/// assert_eq!(backoff.delay(1), Duration::from_millis(100));
/// assert_eq!(backoff.delay(3), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Default delay before the first retry.
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
    /// Default upper bound on any single delay.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
    /// Default growth factor.
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;
    /// Default jitter factor.
    pub const DEFAULT_JITTER: f64 = 0.1;

    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !base_delay.is_finite() {
            // Growth overflowed; a zero schedule stays at zero.
            return if self.initial_delay.is_zero() {
                Duration::ZERO
            } else {
                self.max_delay
            };
        }

        let jittered = if self.jitter > 0.0 {
            // Range is [base * (1 - jitter), base * (1 + jitter)]
            let jitter_amount = base_delay * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
            base_delay + jitter_amount
        } else {
            base_delay
        };

        let capped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound on any single delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor between consecutive delays.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Jitter factor in `[0, 1]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn validate(&self) -> Result<(), InvalidConfiguration> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(InvalidConfiguration::new(
                "multiplier",
                format!("must be a finite number >= 1.0 (got {})", self.multiplier),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(InvalidConfiguration::new(
                "max_delay",
                format!(
                    "must not be shorter than initial_delay ({:?} < {:?})",
                    self.max_delay, self.initial_delay
                ),
            ));
        }
        Ok(())
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
            jitter: Self::DEFAULT_JITTER,
        }
    }
}

impl From<ExponentialBackoff> for Backoff {
    fn from(exponential: ExponentialBackoff) -> Self {
        Backoff::Exponential(exponential)
    }
}

/// Builder for configuring [`ExponentialBackoff`].
///
/// Unset parameters fall back to the `DEFAULT_*` constants.
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the delay before the first retry.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between retries.
    ///
    /// Default: 60s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier.
    ///
    /// Default: 2.0 (doubles each time)
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    ///
    /// A jitter of 0.1 means the delay can vary by ±10%. Out-of-range values are
    /// clamped.
    ///
    /// Default: 0.1
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) });
        self
    }

    /// Build the `ExponentialBackoff` instance.
    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_delay: self
                .initial_delay
                .unwrap_or(ExponentialBackoff::DEFAULT_INITIAL_DELAY),
            max_delay: self.max_delay.unwrap_or(ExponentialBackoff::DEFAULT_MAX_DELAY),
            multiplier: self.multiplier.unwrap_or(ExponentialBackoff::DEFAULT_MULTIPLIER),
            jitter: self.jitter.unwrap_or(ExponentialBackoff::DEFAULT_JITTER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(initial: Duration, max: Duration, multiplier: f64) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .initial_delay(initial)
            .max_delay(max)
            .multiplier(multiplier)
            .jitter(0.0)
            .build()
    }

    #[test]
    fn test_none_never_waits() {
        assert_eq!(Backoff::None.delay(1), None);
        assert_eq!(Backoff::default().delay(7), None);
    }

    #[test]
    fn test_constant_delay() {
        let backoff = Backoff::Constant(Duration::from_millis(250));
        assert_eq!(backoff.delay(1), Some(Duration::from_millis(250)));
        assert_eq!(backoff.delay(9), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let backoff = no_jitter(Duration::from_millis(100), Duration::from_secs(10), 2.0);

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_max_delay_cap() {
        let backoff = no_jitter(Duration::from_secs(1), Duration::from_secs(5), 10.0);

        for attempt in 5..10 {
            assert_eq!(backoff.delay(attempt), Duration::from_secs(5));
        }
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_initial_delay_stays_zero_after_overflow() {
        let backoff = no_jitter(Duration::ZERO, Duration::from_secs(60), 2.0);

        assert_eq!(backoff.delay(1), Duration::ZERO);
        assert_eq!(backoff.delay(2000), Duration::ZERO);
        assert_eq!(backoff.delay(u32::MAX), Duration::ZERO);

        let jittered = ExponentialBackoff::builder()
            .initial_delay(Duration::ZERO)
            .jitter(0.5)
            .build();
        assert_eq!(jittered.delay(2000), Duration::ZERO);
    }

    #[test]
    fn test_overflowed_growth_caps_at_max_delay() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_secs(30))
            .jitter(0.5)
            .build();

        assert_eq!(backoff.delay(5000), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_secs(1))
            .jitter(0.5)
            .build();

        for _ in 0..20 {
            let millis = backoff.delay(1).as_millis();
            assert!(
                (500..=1500).contains(&millis),
                "Delay with 50% jitter should be in range [500ms, 1500ms], got {}ms",
                millis
            );
        }
    }

    #[test]
    fn test_jitter_clamped() {
        assert_eq!(ExponentialBackoff::builder().jitter(2.0).build().jitter(), 1.0);
        assert_eq!(ExponentialBackoff::builder().jitter(-0.5).build().jitter(), 0.0);
    }

    #[test]
    fn test_builder_defaults() {
        let backoff = ExponentialBackoff::builder().build();
        assert_eq!(backoff, ExponentialBackoff::default());
        assert_eq!(backoff.initial_delay(), Duration::from_millis(100));
        assert_eq!(backoff.max_delay(), Duration::from_secs(60));
        assert_eq!(backoff.multiplier(), 2.0);
        assert_eq!(backoff.jitter(), 0.1);
    }

    #[test]
    fn test_validate_rejects_shrinking_multiplier() {
        let backoff: Backoff = ExponentialBackoff::builder().multiplier(0.5).build().into();
        let err = backoff.validate().unwrap_err();
        assert_eq!(err.field(), "multiplier");

        let backoff: Backoff = ExponentialBackoff::builder().multiplier(f64::NAN).build().into();
        assert!(backoff.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let backoff: Backoff =
            no_jitter(Duration::from_secs(10), Duration::from_secs(1), 2.0).into();
        assert_eq!(backoff.validate().unwrap_err().field(), "max_delay");
        assert!(Backoff::Constant(Duration::ZERO).validate().is_ok());
    }
}
