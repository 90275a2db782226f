//! # Deletion coalescer
//!
//! Delete requests arrive one small batch at a time from HTTP handlers.
//! Rather than issuing a storage write for each, they go through a bounded
//! queue to a single worker task that accumulates codes per owner and calls
//! `StorageBackend::delete_batch` when:
//!
//! - an owner's pending codes reach `batch_size` (that owner only)
//! - the `flush_interval` timer ticks (every owner)
//! - the cancellation token fires (every owner, once, then the worker exits)
//!
//! A full queue makes `enqueue` wait. Flush failures are logged and the
//! batch is dropped; nothing is retried.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::DeletionSettings;
use crate::database::StorageBackend;
use crate::models::DeleteRequest;

// =====================================
// Pending batches
// =====================================
/// Codes waiting to be flushed, keyed by owner. Only the worker touches it.
#[derive(Debug)]
pub(crate) struct PendingBatches {
    by_owner: HashMap<String, Vec<String>>,
    threshold: usize,
}

impl PendingBatches {
    pub(crate) fn new(threshold: usize) -> Self {
        Self {
            by_owner: HashMap::new(),
            threshold,
        }
    }

    /// Append `request`; returns the owner's batch once it reaches the threshold.
    pub(crate) fn push(&mut self, request: DeleteRequest) -> Option<(String, Vec<String>)> {
        let owner = request.user_id.clone();

        if self.append(request) >= self.threshold {
            self.by_owner.remove_entry(&owner)
        } else {
            None
        }
    }

    /// Append without the threshold check; returns the owner's pending count.
    pub(crate) fn append(&mut self, request: DeleteRequest) -> usize {
        if request.urls.is_empty() {
            return self.by_owner.get(&request.user_id).map_or(0, Vec::len);
        }

        let urls = self.by_owner.entry(request.user_id).or_default();
        urls.extend(request.urls);
        urls.len()
    }

    /// Take every non-empty batch, leaving the map empty.
    pub(crate) fn take_all(&mut self) -> Vec<(String, Vec<String>)> {
        self.by_owner
            .drain()
            .filter(|(_, urls)| !urls.is_empty())
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }
}

// =====================================
// Coalescer handle
// =====================================
/// Producer side of the deletion pipeline plus the worker it started.
#[derive(Debug)]
pub struct DeletionCoalescer {
    tx: mpsc::Sender<DeleteRequest>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeletionCoalescer {
    /// Start the worker. Must be called from within a Tokio runtime.
    ///
    /// Cancelling `cancel` (or calling [`shutdown`](Self::shutdown)) makes the
    /// worker drain the queue, flush once and stop.
    #[must_use]
    pub fn spawn(
        storage: Arc<dyn StorageBackend>,
        settings: DeletionSettings,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        let worker = tokio::spawn(run(storage, settings, rx, cancel.clone()));

        Self {
            tx,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue `request`, waiting while the queue is full.
    ///
    /// After shutdown the request is dropped with a warning.
    pub async fn enqueue(&self, request: DeleteRequest) {
        if let Err(mpsc::error::SendError(request)) = self.tx.send(request).await {
            warn!(
                user_id = %request.user_id,
                count = request.urls.len(),
                "Deletion worker stopped, request dropped"
            );
        }
    }

    /// Cancel the worker and wait for its final flush. Later calls return at once.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Deletion worker panicked");
            }
        }
    }
}

// =====================================
// Worker
// =====================================
async fn run(
    storage: Arc<dyn StorageBackend>,
    settings: DeletionSettings,
    mut rx: mpsc::Receiver<DeleteRequest>,
    cancel: CancellationToken,
) {
    let mut pending = PendingBatches::new(settings.batch_size);
    let mut ticker = interval_at(
        Instant::now() + settings.flush_interval,
        settings.flush_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(backend = storage.kind(), "Deletion worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                rx.close();
                // Everything buffered goes out in the single final flush.
                while let Ok(request) = rx.try_recv() {
                    pending.append(request);
                }
                break;
            }
            received = rx.recv() => match received {
                Some(request) => {
                    if let Some((owner, urls)) = pending.push(request) {
                        flush(storage.as_ref(), &owner, &urls).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                for (owner, urls) in pending.take_all() {
                    flush(storage.as_ref(), &owner, &urls).await;
                }
            }
        }
    }

    for (owner, urls) in pending.take_all() {
        flush(storage.as_ref(), &owner, &urls).await;
    }
    debug_assert!(pending.is_empty());

    debug!("Deletion worker stopped");
}

async fn flush(storage: &dyn StorageBackend, user_id: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }

    match storage.delete_batch(user_id, urls).await {
        Ok(()) => debug!(user_id, count = urls.len(), "Flushed deletions"),
        Err(e) => error!(user_id, count = urls.len(), error = %e, "Failed to flush deletions"),
    }
}
