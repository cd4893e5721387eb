#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core retry policy for the Steadfast resilience toolkit.
//!
//! This crate provides the retry primitive and the pieces it is assembled from:
//!
//! - **Bounded retry execution** via [`RetryPolicy`]
//!   - Blocking `execute` and async `execute_async`
//!   - A terminal [`RetryError`] that says why the policy gave up
//! - **Failure classification** via [`Classifier`] and the [`Retriable`] trait
//! - **Attempt observation** via [`Observer`] callbacks
//! - **Optional delay schedules** via [`Backoff`] (immediate retry by default)
//!
//! The core performs no logging and no I/O of its own; everything it decides is
//! reported to the caller.
//!
//! # Examples
//!
//! ```rust
//! use steadfast_core::prelude::*;
//! use std::io;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .classifier(Classifier::<io::Error>::retriable())
//!     .max_attempts(3)
//!     .build()?;
//!
//! let result = policy.execute(|| Err::<(), _>(io::Error::from(io::ErrorKind::NotFound)));
//! assert_eq!(result.unwrap_err().kind(), FailureKind::NonRetriable);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod classify;
pub mod error;
pub mod observe;
pub mod policy;

pub use backoff::{Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
pub use classify::{Classifier, Retriable};
pub use error::{BoxError, FailureKind, InvalidConfiguration, ObserverError, RetryError};
pub use observe::Observer;
pub use policy::{DEFAULT_MAX_ATTEMPTS, RetryPolicy, RetryPolicyBuilder};

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use steadfast_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backoff::{Backoff, ExponentialBackoff};
    pub use crate::classify::{Classifier, Retriable};
    pub use crate::error::{FailureKind, InvalidConfiguration, ObserverError, RetryError};
    pub use crate::observe::Observer;
    pub use crate::policy::RetryPolicy;
}
