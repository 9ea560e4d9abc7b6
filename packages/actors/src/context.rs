//! Per-run context shared by every stage of the pool.

use pool_core::{RunEvent, RunId};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Handles every stage of a run needs: its id, the event stream and the
/// cancellation signal.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<RunEvent>,
}

impl RunContext {
    pub fn new(
        run_id: RunId,
        event_tx: broadcast::Sender<RunEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            cancel,
            event_tx,
        }
    }

    /// Broadcast an event. Dropped silently when nobody is subscribed.
    pub fn emit(&self, event: RunEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Stop the run early.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}
