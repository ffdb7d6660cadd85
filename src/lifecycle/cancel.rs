//! Cooperative cancellation for scheduler passes.
//!
//! Thin split over [`CancellationToken`]: the owner holds a [`Cancellation`]
//! and hands out read-only [`CancelToken`]s. Child cancellations are
//! cancelled together with their parent.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Owner side of a cancellation signal.
#[derive(Debug, Default)]
pub struct Cancellation {
    token: CancellationToken,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cancellation that also fires when `self` is cancelled.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            inner: self.token.clone(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Observer side, cheap to clone into tasks.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    /// A token nobody can cancel.
    pub fn never() -> Self {
        Self {
            inner: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once cancelled.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }

    /// Sleep for `duration`. Returns false if cancelled first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.inner.cancelled() => false,
        }
    }
}
