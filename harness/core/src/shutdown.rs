use std::sync::Arc;

use tokio::sync::watch;

/// Sender half of the host-shutdown notification. Held by the deployment
/// handle and cloned into liveness monitors; fired either on explicit stop
/// or when a watched server process is observed dead.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Notify all tokens that the host is gone. Idempotent.
    pub fn fire(&self) {
        let _ = self.tx.send(true);
    }

    #[must_use]
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable receiver observing host shutdown.
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal fires. Resolves immediately if it already
    /// has, including when the signal side has been dropped after firing.
    pub async fn cancelled(&mut self) {
        // wait_for returns Err only if the sender is gone; treat that as
        // shutdown too, since the handle owning the signal no longer exists.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}
