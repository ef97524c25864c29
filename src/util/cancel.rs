//! Cooperative cancellation shared between workers.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable cancellation flag.
///
/// Workers check the token before starting each unit of work. Proxy requests
/// already on the wire also watch it through [`CancelToken::cancelled`] and
/// are dropped as soon as it fires. Completed file writes are kept.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        let (state, _) = watch::channel(false);
        CancelToken {
            state: Arc::new(state),
        }
    }
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only ends on cancellation.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
