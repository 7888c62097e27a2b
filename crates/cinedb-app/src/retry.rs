//! Fixed delay retry of fallible async operations.
//!
//! Only errors reporting themselves as transient are retried, anything else
//! is returned to caller right away.

use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Error which may disappear when the operation is repeated
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for cinedb_dal::Error {
    fn is_transient(&self) -> bool {
        cinedb_dal::Error::is_transient(self)
    }
}

impl Transient for cinedb_store::error::StoreError {
    fn is_transient(&self) -> bool {
        cinedb_store::error::StoreError::is_transient(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// additional attempts after the first one
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Runs `operation` until it succeeds, fails with non-transient error or attempts are exhausted
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries && e.is_transient() => {
                    attempt += 1;
                    warn!(
                        "Attempt {attempt}/{} failed with transient error: {e}, retrying in {:?}",
                        self.retries + 1,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
