//! Example: protecting a flaky operation with a retry policy
//!
//! This example demonstrates:
//! 1. Building a policy that retries any failure up to three times
//! 2. Logging every retry through `tracing`
//! 3. Reporting the terminal outcome once retries run out
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run -p steadfast --example flaky_operation
//! ```

use rand::Rng;
use std::io;
use steadfast::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fails about half of the time.
fn flaky_operation() -> Result<&'static str, io::Error> {
    if rand::thread_rng().gen_bool(0.5) {
        Err(io::Error::other("Random failure"))
    } else {
        Ok("Operation succeeded")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = PolicyConfig::from_env()?;
    let policy = config
        .builder::<io::Error>()
        .log_retries("flaky_operation")
        .build()?;

    info!(max_attempts = policy.max_attempts(), "running protected operation");

    match policy.execute(flaky_operation) {
        Ok(message) => info!("{message}"),
        Err(err) => error!(attempts = err.attempts(), "Operation failed after retries: {err}"),
    }

    // Same policy, async action.
    let outcome = policy
        .execute_async(|| async { flaky_operation() })
        .await;
    match outcome {
        Ok(message) => info!("async: {message}"),
        Err(err) => error!(kind = ?err.kind(), "async operation gave up: {err}"),
    }

    Ok(())
}
