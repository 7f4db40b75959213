//! Write serialization queue for batch operations
//!
//! Every batch goes through a single worker task, so the load → match → save
//! sequence of one batch never interleaves with another against the same
//! file. The worker also runs the post-write hooks before replying.

use crate::server::hooks::HookExecutor;
use crate::server::reconcile::{Batch, BatchOutcome, ReconcileError, Reconciler};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Pending batches allowed before senders wait
const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("write queue is closed")]
    Closed,

    #[error("write task panicked: {0}")]
    WorkerPanic(String),
}

type Reply = oneshot::Sender<Result<BatchOutcome, QueueError>>;

/// Commands that can be sent to the write worker
enum WriteCommand {
    Apply { batch: Batch, reply: Reply },
}

/// Handle for submitting batches to the write worker
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::Sender<WriteCommand>,
}

impl WriteQueue {
    /// Spawn the worker on the current tokio runtime
    pub fn new(reconciler: Arc<Reconciler>, hooks: Arc<HookExecutor>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_worker(rx, reconciler, hooks));
        Self { tx }
    }

    /// Submit a batch and wait for it to be applied
    pub async fn apply(&self, batch: Batch) -> Result<BatchOutcome, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Apply { batch, reply })
            .await
            .map_err(|_| QueueError::Closed)?;
        rx.await.map_err(|_| QueueError::Closed)?
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<WriteCommand>,
    reconciler: Arc<Reconciler>,
    hooks: Arc<HookExecutor>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Apply { batch, reply } => {
                let result = apply_blocking(Arc::clone(&reconciler), batch).await;

                match &result {
                    Ok(outcome) if outcome.written => hooks.run_success(outcome.entry_count).await,
                    Err(QueueError::Reconcile(err @ ReconcileError::StoreUnavailable(_))) => {
                        hooks.run_failure(&err.to_string()).await
                    }
                    _ => {}
                }

                if reply.send(result).is_err() {
                    debug!("Batch submitter went away before the reply");
                }
            }
        }
    }
    debug!("Write queue worker stopped");
}

/// File I/O is blocking; keep it off the async workers
async fn apply_blocking(
    reconciler: Arc<Reconciler>,
    batch: Batch,
) -> Result<BatchOutcome, QueueError> {
    match tokio::task::spawn_blocking(move || reconciler.apply(&batch)).await {
        Ok(result) => result.map_err(QueueError::from),
        Err(e) => {
            error!(error = %e, "Write task failed");
            Err(QueueError::WorkerPanic(e.to_string()))
        }
    }
}
