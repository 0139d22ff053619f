//! Concurrency gate for blocking upstream calls.
//!
//! Every call into the league client goes through [`ConcurrencyGate::execute`],
//! which caps the number of calls in flight, runs the call on Tokio's blocking
//! pool and gives up after a fixed deadline. Callers beyond the cap wait for
//! a permit in FIFO order instead of failing.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{BotError, Result};

pub struct ConcurrencyGate {
    permits: Arc<Semaphore>,
    max_permits: usize,
    timeout: Duration,
}

impl ConcurrencyGate {
    pub fn new(max_permits: usize, timeout: Duration) -> Self {
        let max_permits = max_permits.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            timeout,
        }
    }

    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Permits not currently held by a call
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run a blocking operation under a permit and the gate's deadline.
    ///
    /// The permit is released when this future resolves, whatever the
    /// outcome. On timeout the blocking thread is detached and left to
    /// finish on its own.
    pub async fn execute<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BotError::Internal {
                message: "concurrency gate is closed".to_string(),
            })?;
        debug!(
            "Gate permit acquired for '{}' ({} left)",
            operation,
            self.permits.available_permits()
        );

        let handle = tokio::task::spawn_blocking(f);

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(BotError::UpstreamFailure {
                message: format!("upstream call '{}' panicked: {}", operation, join_error),
            }),
            Err(_) => {
                warn!(
                    "Upstream call '{}' exceeded {}s, releasing its permit",
                    operation,
                    self.timeout.as_secs()
                );
                Err(BotError::UpstreamTimeout {
                    operation: operation.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

/// Shared gate type
pub type SharedGate = Arc<ConcurrencyGate>;

pub fn create_shared_gate(max_permits: usize, timeout: Duration) -> SharedGate {
    Arc::new(ConcurrencyGate::new(max_permits, timeout))
}
