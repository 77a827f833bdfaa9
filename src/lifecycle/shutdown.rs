//! Shutdown coordination for the provider.

use tokio_util::sync::CancellationToken;

/// Coordinator for cancellation of the watch worker.
///
/// Unlike a broadcast channel, a token that was triggered before a task
/// started waiting is still observed, and can be polled without awaiting.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown was triggered.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown is triggered.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}
