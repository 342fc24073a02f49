//! One-way publication gate between the notary and node task groups
//!
//! Node instances may only start once every notary image has been published,
//! since nodes resolve notary identities at boot. The gate is a `watch`
//! channel that flips from closed to open exactly once.

use tokio::sync::watch;
use tracing::debug;

/// Create a closed gate and the handle that opens it
pub fn publication_gate() -> (GateOpener, PublicationGate) {
    let (tx, rx) = watch::channel(false);
    (GateOpener { tx }, PublicationGate { rx })
}

/// Opening side, owned by the notary task group
#[derive(Debug)]
pub struct GateOpener {
    tx: watch::Sender<bool>,
}

impl GateOpener {
    pub fn open(self) {
        debug!("Publication gate opened");
        self.tx.send_replace(true);
    }
}

impl Drop for GateOpener {
    // Waiters must not hang if the notary side unwinds before opening.
    fn drop(&mut self) {
        self.tx.send_replace(true);
    }
}

/// Waiting side, cloned into every node group task
#[derive(Debug, Clone)]
pub struct PublicationGate {
    rx: watch::Receiver<bool>,
}

impl PublicationGate {
    pub fn is_open(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the gate is open; returns immediately if it already is
    pub async fn wait(&mut self) {
        // An error here means the opener is gone, which also counts as open.
        let _ = self.rx.wait_for(|open| *open).await;
    }
}
