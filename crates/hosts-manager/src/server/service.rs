//! Service facade over the reconciler
//!
//! Reads go straight to the reconciler; batches are decoded, optionally
//! validated and queued. Every failure is turned into a
//! [`ServiceResponse::Error`] carrying a human-readable message.

use crate::server::messages::{validate_batch, BatchRequest, RequestError, ServiceResponse};
use crate::server::reconcile::{Batch, BatchOutcome, EntryEdit, ReconcileError, Reconciler};
use crate::server::write_queue::{QueueError, WriteQueue};
use hosts_manager_common::Entry;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ServiceError {
    /// True if the request itself was unacceptable, whatever the file holds
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::Request(_)
                | Self::Queue(QueueError::Reconcile(ReconcileError::UnwritableEntry { .. }))
        )
    }

    /// True if the request was rejected because the file changed underneath it
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Queue(QueueError::Reconcile(
                ReconcileError::EditCollision { .. } | ReconcileError::StoreInconsistent { .. }
            ))
        )
    }
}

pub struct HostsService {
    reconciler: Arc<Reconciler>,
    queue: WriteQueue,
    validate: bool,
}

impl HostsService {
    pub fn new(reconciler: Arc<Reconciler>, queue: WriteQueue, validate: bool) -> Self {
        Self {
            reconciler,
            queue,
            validate,
        }
    }

    /// Current entries with their line numbers
    pub async fn get_entries(&self) -> Result<Vec<Entry>, ServiceError> {
        let reconciler = Arc::clone(&self.reconciler);
        tokio::task::spawn_blocking(move || reconciler.get_entries())
            .await
            .map_err(|e| QueueError::WorkerPanic(e.to_string()))?
            .map_err(|e| ServiceError::Queue(e.into()))
    }

    pub async fn add_entries(&self, entries: Vec<Entry>) -> Result<BatchOutcome, ServiceError> {
        self.apply(Batch::Add(entries)).await
    }

    /// Edit entries; `original` and `changed` are paired by position
    pub async fn edit_entries(
        &self,
        original: Vec<Entry>,
        changed: Vec<Entry>,
    ) -> Result<BatchOutcome, ServiceError> {
        if original.len() != changed.len() {
            return Err(RequestError::MismatchedEdit {
                original: original.len(),
                changed: changed.len(),
            }
            .into());
        }
        let edits = original
            .into_iter()
            .zip(changed)
            .map(|(original, changed)| EntryEdit { original, changed })
            .collect();
        self.apply(Batch::Edit(edits)).await
    }

    pub async fn delete_entries(&self, entries: Vec<Entry>) -> Result<BatchOutcome, ServiceError> {
        self.apply(Batch::Delete(entries)).await
    }

    /// Decode and run a wire request
    pub async fn apply_request(&self, request: BatchRequest) -> Result<BatchOutcome, ServiceError> {
        let batch = request.into_batch()?;
        self.apply(batch).await
    }

    /// Like [`apply_request`](Self::apply_request), reporting as a response payload
    pub async fn submit(&self, request: BatchRequest) -> ServiceResponse {
        match self.apply_request(request).await {
            Ok(outcome) => ServiceResponse::Ok {
                applied: outcome.applied,
            },
            Err(e) => {
                warn!(error = %e, "Batch rejected");
                ServiceResponse::error(e)
            }
        }
    }

    /// List entries as a response payload
    pub async fn list(&self) -> ServiceResponse {
        match self.get_entries().await {
            Ok(entries) => ServiceResponse::Entries { entries },
            Err(e) => {
                warn!(error = %e, "Failed to read entries");
                ServiceResponse::error(e)
            }
        }
    }

    async fn apply(&self, batch: Batch) -> Result<BatchOutcome, ServiceError> {
        if self.validate {
            validate_batch(&batch)?;
        }
        Ok(self.queue.apply(batch).await?)
    }
}
