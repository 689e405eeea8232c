//! Cancellation signal for awaiting long-running operations.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Fires when its token is cancelled or its deadline passes, whichever is
/// first. Clones share the same token.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that only fires on explicit [`CancelSignal::cancel`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: CancellationToken) -> Self {
        CancelSignal {
            token,
            deadline: None,
        }
    }

    /// Fires `timeout` from now. A zero timeout is already fired.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().and_timeout(timeout)
    }

    /// Add (or tighten) a deadline on this signal.
    pub fn and_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes once the signal fires.
    pub async fn fired(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Run one request of `operation` unless the signal fires first.
    ///
    /// Nothing is started when the signal has already fired. A request that
    /// loses the race is dropped, which aborts it on the client side.
    pub async fn race<T, F>(&self, operation: &str, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let cancelled = || Error::OperationCancelled {
            operation: operation.to_string(),
        };
        if self.is_fired() {
            log::warn!("cancelled: {operation} (signal fired before the request)");
            return Err(cancelled());
        }
        tokio::select! {
            biased;
            _ = self.fired() => {
                log::warn!("cancelled: {operation} while waiting for the response");
                Err(cancelled())
            }
            result = request => result,
        }
    }
}
