//! Sync queue state machine and batch orchestration.
//!
//! [`SyncQueue`] exclusively owns the collection of queue items; every
//! `status`/`progress` mutation goes through its guarded transition methods.
//! Items move along `Pending → Syncing → Completed | Failed`, with
//! `Failed → Pending` only via [`SyncQueue::retry_failed`]. A batch run
//! operates on the snapshot of pending items taken at call time, so items
//! enqueued mid-run wait for the next batch.
//!
//! [`SyncService`] layers the single-writer and one-batch-in-flight
//! discipline on top for shared async use.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{SyncItemKind, SyncItemStatus, SyncQueueItem};

/// External transport contract consumed by the queue.
///
/// Failure (timeouts included) is reported as
/// [`AppError::TransmissionFailed`] and marks the item failed without
/// aborting the batch. Implementations must be idempotent under
/// at-least-once delivery: a retried item may be resent after a transport
/// timeout that actually landed.
pub trait Transmitter {
    fn transmit(&self, item: &SyncQueueItem) -> impl Future<Output = Result<()>> + Send;
}

/// Result of one batch run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Items left pending because the batch was cancelled between items.
    pub skipped: usize,
    pub duration_secs: f64,
}

impl SyncReport {
    /// Get summary message.
    pub fn summary(&self) -> String {
        let base = format!(
            "Synced: {}, Failed: {} (took {:.1}s)",
            self.succeeded, self.failed, self.duration_secs
        );
        if self.skipped > 0 {
            format!("{base} - {} skipped after cancel", self.skipped)
        } else {
            base
        }
    }
}

/// Ordered collection of records awaiting transmission.
#[derive(Debug, Default)]
pub struct SyncQueue {
    items: Vec<SyncQueueItem>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh pending item and return its id. Always succeeds.
    pub fn enqueue(&mut self, kind: SyncItemKind, class_name: impl Into<String>, date: NaiveDate) -> Uuid {
        let item = SyncQueueItem::new(kind, class_name, date);
        let id = item.id;
        debug!(item = %item.label(), "enqueued");
        self.items.push(item);
        id
    }

    /// Items in insertion order (display and sync order).
    pub fn items(&self) -> &[SyncQueueItem] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&SyncQueueItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.count(SyncItemStatus::Pending)
    }

    pub fn syncing_count(&self) -> usize {
        self.count(SyncItemStatus::Syncing)
    }

    pub fn completed_count(&self) -> usize {
        self.count(SyncItemStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(SyncItemStatus::Failed)
    }

    fn count(&self, status: SyncItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Snapshot of currently pending item ids, in insertion order.
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.items
            .iter()
            .filter(|i| i.status == SyncItemStatus::Pending)
            .map(|i| i.id)
            .collect()
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut SyncQueueItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::invalid_input(format!("no queue item with id {id}")))
    }

    /// Transition one pending item to syncing and return a snapshot of it
    /// for transmission.
    pub fn begin_sync(&mut self, id: Uuid) -> Result<SyncQueueItem> {
        let item = self.get_mut(id)?;
        if item.status != SyncItemStatus::Pending {
            return Err(AppError::invalid_state(format!(
                "cannot start syncing an item in {} state",
                item.status.as_str()
            )));
        }
        item.status = SyncItemStatus::Syncing;
        item.progress = Some(0);
        Ok(item.clone())
    }

    /// Update transmission progress for an in-flight item.
    pub fn set_progress(&mut self, id: Uuid, percent: u8) -> Result<()> {
        let item = self.get_mut(id)?;
        if item.status != SyncItemStatus::Syncing {
            return Err(AppError::invalid_state(format!(
                "progress only applies while syncing, item is {}",
                item.status.as_str()
            )));
        }
        item.progress = Some(percent.min(100));
        Ok(())
    }

    /// Mark an in-flight item completed.
    pub fn complete_sync(&mut self, id: Uuid) -> Result<()> {
        let item = self.get_mut(id)?;
        if item.status != SyncItemStatus::Syncing {
            return Err(AppError::invalid_state(format!(
                "cannot complete an item in {} state",
                item.status.as_str()
            )));
        }
        item.status = SyncItemStatus::Completed;
        item.progress = None;
        item.last_error = None;
        Ok(())
    }

    /// Mark an in-flight item failed, recording the transport error.
    pub fn fail_sync(&mut self, id: Uuid, reason: impl Into<String>) -> Result<()> {
        let item = self.get_mut(id)?;
        if item.status != SyncItemStatus::Syncing {
            return Err(AppError::invalid_state(format!(
                "cannot fail an item in {} state",
                item.status.as_str()
            )));
        }
        item.status = SyncItemStatus::Failed;
        item.progress = None;
        item.last_error = Some(reason.into());
        Ok(())
    }

    /// Move every failed item back to pending. Returns how many moved.
    ///
    /// Does not transmit anything; a following batch run picks them up. No
    /// backoff and no retry cap here.
    pub fn retry_failed(&mut self) -> usize {
        let mut moved = 0;
        for item in &mut self.items {
            if item.status == SyncItemStatus::Failed {
                item.status = SyncItemStatus::Pending;
                item.last_error = None;
                moved += 1;
            }
        }
        if moved > 0 {
            info!(moved, "failed items requeued");
        }
        moved
    }

    /// Sync every currently pending item, sequentially, in insertion order.
    pub async fn sync_all<T: Transmitter>(&mut self, transport: &T) -> SyncReport {
        self.run_batch(transport, &CancellationToken::new(), |_, _| {}).await
    }

    /// Sync with a progress callback reporting batch percentage and a
    /// per-item message.
    pub async fn sync_all_with_progress<T, F>(&mut self, transport: &T, on_progress: F) -> SyncReport
    where
        T: Transmitter,
        F: FnMut(f32, &str),
    {
        self.run_batch(transport, &CancellationToken::new(), on_progress).await
    }

    /// Sync with cancellation checked between items: items not yet started
    /// stay pending and are reported as skipped. The token is never checked
    /// mid-transmission, so no item is left stuck in the syncing state.
    pub async fn sync_all_cancellable<T: Transmitter>(
        &mut self,
        transport: &T,
        cancel: &CancellationToken,
    ) -> SyncReport {
        self.run_batch(transport, cancel, |_, _| {}).await
    }

    async fn run_batch<T, F>(&mut self, transport: &T, cancel: &CancellationToken, mut on_progress: F) -> SyncReport
    where
        T: Transmitter,
        F: FnMut(f32, &str),
    {
        let start = Instant::now();
        let batch = self.pending_ids();
        let total = batch.len();
        info!(items = total, "sync batch starting");

        let mut report = SyncReport::default();
        for (idx, id) in batch.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped = total - idx;
                warn!(skipped = report.skipped, "sync batch cancelled");
                break;
            }

            // begin_sync only fails if the item was tampered with between
            // snapshot and processing; a single-owner queue cannot hit it.
            let snapshot = match self.begin_sync(id) {
                Ok(item) => item,
                Err(e) => {
                    warn!(%id, error = %e, "skipping unprocessable item");
                    continue;
                }
            };

            on_progress(idx as f32 / total as f32, &format!("Syncing {}", snapshot.label()));

            match transport.transmit(&snapshot).await {
                Ok(()) => {
                    let _ = self.complete_sync(id);
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!(item = %snapshot.label(), error = %e, "transmission failed");
                    let _ = self.fail_sync(id, e.to_string());
                    report.failed += 1;
                }
            }
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        on_progress(1.0, &report.summary());
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "sync batch finished"
        );
        report
    }
}

/// Progress events from a background sync run.
#[derive(Debug, Clone)]
pub enum SyncProgress {
    Started,
    Progress { percent: f32, message: String },
    Completed { report: SyncReport, timestamp: chrono::DateTime<Local> },
    Error(String),
}

/// Shared-queue orchestration for async callers.
///
/// The queue sits behind one mutex (single-writer discipline) and batch runs
/// are serialized by a separate guard so at most one is in flight. The queue
/// lock is released around each transmission, so enqueues interleave freely
/// with a running batch; the new items simply miss that batch's snapshot.
pub struct SyncService<T> {
    queue: Arc<Mutex<SyncQueue>>,
    transport: T,
    batch_guard: Arc<Mutex<()>>,
}

impl<T: Transmitter> SyncService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            queue: Arc::new(Mutex::new(SyncQueue::new())),
            transport,
            batch_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Shared handle to the underlying queue.
    pub fn queue(&self) -> Arc<Mutex<SyncQueue>> {
        Arc::clone(&self.queue)
    }

    pub async fn enqueue(&self, kind: SyncItemKind, class_name: impl Into<String>, date: NaiveDate) -> Uuid {
        self.queue.lock().await.enqueue(kind, class_name, date)
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.lock().await.pending_count()
    }

    pub async fn failed_count(&self) -> usize {
        self.queue.lock().await.failed_count()
    }

    pub async fn retry_failed(&self) -> usize {
        self.queue.lock().await.retry_failed()
    }

    /// Run one batch over the shared queue.
    pub async fn sync_all(&self) -> SyncReport {
        self.sync_all_with_progress(|_, _| {}).await
    }

    /// Run one batch, reporting progress. Concurrent calls queue up on the
    /// batch guard and each run works on its own pending snapshot.
    pub async fn sync_all_with_progress<F>(&self, mut on_progress: F) -> SyncReport
    where
        F: FnMut(f32, &str),
    {
        let _in_flight = self.batch_guard.lock().await;
        let start = Instant::now();

        let batch = self.queue.lock().await.pending_ids();
        let total = batch.len();
        let mut report = SyncReport::default();

        for (idx, id) in batch.into_iter().enumerate() {
            let snapshot = match self.queue.lock().await.begin_sync(id) {
                Ok(item) => item,
                Err(e) => {
                    warn!(%id, error = %e, "skipping unprocessable item");
                    continue;
                }
            };

            on_progress(idx as f32 / total as f32, &format!("Syncing {}", snapshot.label()));

            // Queue lock is not held across the network round trip.
            let outcome = self.transport.transmit(&snapshot).await;

            let mut queue = self.queue.lock().await;
            match outcome {
                Ok(()) => {
                    let _ = queue.complete_sync(id);
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!(item = %snapshot.label(), error = %e, "transmission failed");
                    let _ = queue.fail_sync(id, e.to_string());
                    report.failed += 1;
                }
            }
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        on_progress(1.0, &report.summary());
        report
    }
}

/// Run a batch in the background and report progress via channel.
pub async fn run_sync_background<T: Transmitter>(service: Arc<SyncService<T>>, tx: mpsc::UnboundedSender<SyncProgress>) {
    let _ = tx.send(SyncProgress::Started);

    let report = service
        .sync_all_with_progress(|percent, message| {
            let _ = tx.send(SyncProgress::Progress {
                percent,
                message: message.to_string(),
            });
        })
        .await;

    if report.failed > 0 {
        let _ = tx.send(SyncProgress::Error(report.summary()));
    } else {
        let _ = tx.send(SyncProgress::Completed {
            report,
            timestamp: Local::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport double: succeeds unless the item id is on the fail list.
    struct ScriptedTransmitter {
        fail_ids: std::sync::Mutex<HashSet<Uuid>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransmitter {
        fn succeeding() -> Self {
            Self {
                fail_ids: std::sync::Mutex::new(HashSet::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(ids: impl IntoIterator<Item = Uuid>) -> Self {
            Self {
                fail_ids: std::sync::Mutex::new(ids.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transmitter for ScriptedTransmitter {
        async fn transmit(&self, item: &SyncQueueItem) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_ids.lock().unwrap().contains(&item.id) {
                Err(AppError::transmission("simulated outage"))
            } else {
                Ok(())
            }
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    fn queue_with(n: usize) -> (SyncQueue, Vec<Uuid>) {
        let mut queue = SyncQueue::new();
        let ids = (0..n)
            .map(|i| queue.enqueue(SyncItemKind::Attendance, format!("Class {i}"), date()))
            .collect();
        (queue, ids)
    }

    #[test]
    fn test_enqueue_preserves_insertion_order() {
        let (queue, ids) = queue_with(3);
        assert_eq!(queue.pending_count(), 3);
        let stored: Vec<_> = queue.items().iter().map(|i| i.id).collect();
        assert_eq!(stored, ids);
    }

    #[test]
    fn test_transition_guards() {
        let (mut queue, ids) = queue_with(1);
        let id = ids[0];

        // Completing or failing before syncing is a guard violation.
        assert!(matches!(queue.complete_sync(id), Err(AppError::InvalidState(_))));
        assert!(matches!(queue.fail_sync(id, "x"), Err(AppError::InvalidState(_))));

        let snapshot = queue.begin_sync(id).unwrap();
        assert_eq!(snapshot.status, SyncItemStatus::Syncing);
        assert_eq!(queue.get(id).unwrap().progress, Some(0));

        // Double begin is rejected.
        assert!(matches!(queue.begin_sync(id), Err(AppError::InvalidState(_))));

        queue.complete_sync(id).unwrap();
        let item = queue.get(id).unwrap();
        assert_eq!(item.status, SyncItemStatus::Completed);
        assert_eq!(item.progress, None);

        // No edge back out of completed.
        assert!(queue.begin_sync(id).is_err());
        assert!(queue.fail_sync(id, "x").is_err());
    }

    #[test]
    fn test_progress_only_while_syncing() {
        let (mut queue, ids) = queue_with(1);
        assert!(queue.set_progress(ids[0], 50).is_err());
        queue.begin_sync(ids[0]).unwrap();
        queue.set_progress(ids[0], 120).unwrap();
        assert_eq!(queue.get(ids[0]).unwrap().progress, Some(100));
    }

    #[tokio::test]
    async fn test_sync_all_accounts_for_every_batch_item() {
        let (mut queue, ids) = queue_with(4);
        let transport = ScriptedTransmitter::failing([ids[1], ids[3]]);

        let report = queue.sync_all(&transport).await;
        assert_eq!(report.succeeded + report.failed, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(queue.completed_count(), 2);
        assert_eq!(queue.failed_count(), 2);
        assert_eq!(queue.syncing_count(), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_partial_failure_then_retry_then_success() {
        // Queue has A and B pending; transport fails B.
        let mut queue = SyncQueue::new();
        let a = queue.enqueue(SyncItemKind::Attendance, "Class 10A", date());
        let b = queue.enqueue(SyncItemKind::Attendance, "Class 9B", date());

        let flaky = ScriptedTransmitter::failing([b]);
        queue.sync_all(&flaky).await;
        assert_eq!(queue.get(a).unwrap().status, SyncItemStatus::Completed);
        assert_eq!(queue.get(b).unwrap().status, SyncItemStatus::Failed);
        assert!(queue.get(b).unwrap().last_error.is_some());

        // Retry moves only B back to pending.
        assert_eq!(queue.retry_failed(), 1);
        assert_eq!(queue.failed_count(), 0);
        assert_eq!(queue.get(a).unwrap().status, SyncItemStatus::Completed);
        assert_eq!(queue.get(b).unwrap().status, SyncItemStatus::Pending);
        assert!(queue.get(b).unwrap().last_error.is_none());

        // Second run with a healthy transport completes B.
        let healthy = ScriptedTransmitter::succeeding();
        let report = queue.sync_all(&healthy).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(queue.get(b).unwrap().status, SyncItemStatus::Completed);
        // A was not resent.
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_failed_noop_without_failures() {
        let (mut queue, _) = queue_with(2);
        assert_eq!(queue.retry_failed(), 0);
        assert_eq!(queue.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_batch_leaves_rest_pending() {
        let (mut queue, _) = queue_with(3);
        let transport = ScriptedTransmitter::succeeding();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = queue.sync_all_cancellable(&transport, &cancel).await;
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.skipped, 3);
        assert_eq!(queue.pending_count(), 3);
        assert_eq!(queue.syncing_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_callback_reaches_completion() {
        let (mut queue, _) = queue_with(2);
        let transport = ScriptedTransmitter::succeeding();
        let mut updates = Vec::new();
        queue
            .sync_all_with_progress(&transport, |pct, msg| updates.push((pct, msg.to_string())))
            .await;
        assert!(updates.len() >= 3);
        assert_eq!(updates.last().unwrap().0, 1.0);
    }

    #[tokio::test]
    async fn test_service_enqueue_during_batch_misses_snapshot() {
        let service = SyncService::new(ScriptedTransmitter::succeeding());
        service.enqueue(SyncItemKind::Attendance, "Class 10A", date()).await;
        service.enqueue(SyncItemKind::Report, "Class 10A", date()).await;

        let report = service.sync_all().await;
        assert_eq!(report.succeeded, 2);

        // A later enqueue stays pending until the next run.
        service.enqueue(SyncItemKind::Attendance, "Class 9A", date()).await;
        assert_eq!(service.pending_count().await, 1);
        let report = service.sync_all().await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(service.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_background_run_reports_over_channel() {
        let service = Arc::new(SyncService::new(ScriptedTransmitter::succeeding()));
        service.enqueue(SyncItemKind::Attendance, "Class 10A", date()).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        run_sync_background(Arc::clone(&service), tx).await;

        let mut saw_started = false;
        let mut saw_completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                SyncProgress::Started => saw_started = true,
                SyncProgress::Completed { report, .. } => {
                    saw_completed = true;
                    assert_eq!(report.succeeded, 1);
                }
                SyncProgress::Progress { .. } => {}
                SyncProgress::Error(e) => panic!("unexpected error event: {e}"),
            }
        }
        assert!(saw_started && saw_completed);
    }
}
