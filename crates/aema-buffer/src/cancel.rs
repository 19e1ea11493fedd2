//! Cancellation signals

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Owner side of a cancellation signal
#[derive(Debug)]
pub struct CancelSource {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelSource { tx: Arc::new(tx) }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Cancel once `after` has elapsed. Must be called inside a runtime.
    pub fn cancel_after(&self, after: Duration) {
        let tx = Arc::clone(&self.tx);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tx.send_replace(true);
        });
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        CancelToken { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the source is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
