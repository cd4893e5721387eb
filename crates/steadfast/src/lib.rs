#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Steadfast
//!
//! Retry policies with explicit failure classification, a bounded attempt budget,
//! and retry telemetry.
//!
//! ```rust
//! use steadfast::prelude::*;
//! use std::io;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .handle(|e: &io::Error| e.kind() != io::ErrorKind::PermissionDenied)
//!     .retries(3)
//!     .log_retries("sync_inventory")
//!     .build()?;
//!
//! let mut calls = 0;
//! let synced = policy.execute(|| {
//!     calls += 1;
//!     if calls == 1 {
//!         Err(io::Error::other("random failure"))
//!     } else {
//!         Ok("synced")
//!     }
//! })?;
//!
//! assert_eq!(synced, "synced");
//! # Ok(())
//! # }
//! ```
//!
//! Policies can also be described in configuration and completed in code:
//!
//! ```rust
//! use steadfast::PolicyConfig;
//! use std::io;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PolicyConfig::from_toml_str("max_attempts = 5")?;
//! let policy = config
//!     .builder::<io::Error>()
//!     .handle(|e| e.kind() == io::ErrorKind::TimedOut)
//!     .build()?;
//!
//! assert_eq!(policy.max_attempts(), 5);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{BackoffConfig, PolicyConfig};
pub use error::{Error, Result};
pub use steadfast_core::{
    Backoff, BoxError, Classifier, DEFAULT_MAX_ATTEMPTS, ExponentialBackoff,
    ExponentialBackoffBuilder, FailureKind, InvalidConfiguration, Observer, ObserverError,
    Retriable, RetryError, RetryPolicy, RetryPolicyBuilder,
};

/// Convenient re-exports of commonly used items.
pub mod prelude {
    pub use crate::config::PolicyConfig;
    pub use crate::telemetry::{LogRetries, tracing_observer};
    pub use steadfast_core::prelude::*;
}
