//! Periodic feed poller.
//!
//! Drives the fetch → reconcile cycle on a fixed cadence. The first poll
//! happens once, immediately, before the periodic cadence begins. All
//! reconciliation runs under the store mutex, so one batch is fully applied
//! before the next is considered and out-of-band readers (handle
//! attachment, full-state reads) never observe a half-applied batch.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::feed::FeedSource;
use crate::reconcile::{reconcile, ReconcileAction};
use crate::store::SnapshotStore;

/// Status information for the poller.
#[derive(Clone, Debug, Default)]
pub struct PollerStatus {
    /// Last successful poll timestamp
    pub last_poll: Option<DateTime<Utc>>,
    /// Last error message (if any)
    pub last_error: Option<String>,
    /// Total number of successful polls
    pub poll_count: u64,
    /// Total number of errors
    pub error_count: u64,
}

/// Periodic poller wiring the feed source, the snapshot store, and the
/// presentation layer together.
///
/// `H` is the presentation layer's opaque handle type; the headless binary
/// uses `()`.
pub struct FeedPoller<H> {
    /// Feed collaborator; delivers complete batches or errors
    source: Arc<dyn FeedSource>,
    /// Shared store; the mutex serializes reconciliation
    store: Arc<Mutex<SnapshotStore<H>>>,
    /// Poll cadence
    poll_interval: Duration,
    /// Broadcast channel for reconciliation actions
    action_tx: broadcast::Sender<ReconcileAction<H>>,
    /// Status tracking
    status: Arc<Mutex<PollerStatus>>,
}

impl<H: Clone + Send + Sync + 'static> FeedPoller<H> {
    /// Creates a poller over a feed source and a shared store.
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<Mutex<SnapshotStore<H>>>,
        poll_interval: Duration,
    ) -> Self {
        let (action_tx, _) = broadcast::channel(1024);
        Self {
            source,
            store,
            poll_interval,
            action_tx,
            status: Arc::new(Mutex::new(PollerStatus::default())),
        }
    }

    /// Subscribe to reconciliation actions, emitted in batch order.
    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileAction<H>> {
        self.action_tx.subscribe()
    }

    /// Returns the shared store, for full-redraw fallback reads and handle
    /// attachment by the presentation layer.
    pub fn store(&self) -> Arc<Mutex<SnapshotStore<H>>> {
        Arc::clone(&self.store)
    }

    /// Returns a clone of the status tracker for external monitoring.
    pub fn status(&self) -> Arc<Mutex<PollerStatus>> {
        Arc::clone(&self.status)
    }

    /// Starts the polling loop (non-blocking).
    ///
    /// Returns a JoinHandle that can be aborted for shutdown. A fetch in
    /// flight at abort time is simply abandoned; no partial reconciliation
    /// can occur since the store is only touched once a complete batch is
    /// in hand.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_ms = self.poll_interval.as_millis() as u64,
                "Starting feed poller"
            );

            // First tick fires immediately: the baseline fetch happens once,
            // up front, before the cadence begins
            let mut ticker = interval(self.poll_interval);

            loop {
                ticker.tick().await;
                self.run_poll_cycle().await;
            }
        })
    }

    /// Runs one fetch → reconcile cycle and records the outcome.
    pub async fn run_poll_cycle(&self) {
        debug!("Polling feed");

        match self.poll_once().await {
            Ok(action_count) => {
                let mut status = self.status.lock().await;
                status.last_poll = Some(Utc::now());
                status.last_error = None;
                status.poll_count += 1;
                debug!(actions = action_count, "Poll cycle complete");
            }
            Err(e) => {
                error!(error = %e, "Poll cycle failed");
                let mut status = self.status.lock().await;
                status.last_error = Some(e.to_string());
                status.error_count += 1;
            }
        }
    }

    /// Fetches a batch, reconciles it, and broadcasts the resulting actions.
    ///
    /// On fetch failure the store is untouched — the reconciler only ever
    /// sees complete batches.
    async fn poll_once(&self) -> Result<usize> {
        let batch = self
            .source
            .fetch_batch()
            .await
            .context("Failed to fetch camera feed")?;

        let actions = {
            let mut store = self.store.lock().await;
            reconcile(&mut store, &batch).context("Reconciliation failed")?
        };

        if !actions.is_empty() {
            let created = actions
                .iter()
                .filter(|a| matches!(a, ReconcileAction::Created { .. }))
                .count();
            info!(
                created = created,
                updated = actions.len() - created,
                batch_size = batch.cameras.len(),
                "Applied feed batch"
            );
        }

        let count = actions.len();
        for action in actions {
            // No subscribers is fine; actions are best-effort notifications
            let _ = self.action_tx.send(action);
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, FeedBatch, ImageMetadata, Location};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    fn make_camera(id: &str, ts: &str) -> Camera {
        Camera {
            camera_id: id.to_string(),
            timestamp: ts.to_string(),
            image: format!("https://images.example.com/{}.jpg", id),
            location: Location {
                latitude: 1.3521,
                longitude: 103.8198,
            },
            image_metadata: ImageMetadata {
                height: 480,
                width: 640,
                md5: format!("md5-{}-{}", id, ts),
            },
        }
    }

    /// Scripted feed source: pops one result per fetch.
    struct ScriptedSource {
        batches: std::sync::Mutex<VecDeque<Result<FeedBatch>>>,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Result<FeedBatch>>) -> Self {
            Self {
                batches: std::sync::Mutex::new(batches.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl FeedSource for ScriptedSource {
        async fn fetch_batch(&self) -> Result<FeedBatch> {
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }
    }

    fn make_poller(batches: Vec<Result<FeedBatch>>) -> FeedPoller<u64> {
        FeedPoller::new(
            Arc::new(ScriptedSource::new(batches)),
            Arc::new(Mutex::new(SnapshotStore::new())),
            Duration::from_millis(20_000),
        )
    }

    #[tokio::test]
    async fn test_first_cycle_populates_store_and_broadcasts_creates() {
        let poller = make_poller(vec![Ok(FeedBatch {
            timestamp: "feed-t1".to_string(),
            cameras: vec![make_camera("1501", "t1"), make_camera("1502", "t1")],
        })]);
        let mut rx = poller.subscribe();

        poller.run_poll_cycle().await;

        let store = poller.store();
        assert_eq!(store.lock().await.len(), 2);

        let first = rx.try_recv().unwrap();
        assert!(matches!(first, ReconcileAction::Created { .. }));
        assert_eq!(first.camera_id(), "1501");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.camera_id(), "1502");

        let status = poller.status();
        let status = status.lock().await;
        assert_eq!(status.poll_count, 1);
        assert_eq!(status.error_count, 0);
        assert!(status.last_poll.is_some());
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_update_cycle_broadcasts_updated_with_handle() {
        let poller = make_poller(vec![
            Ok(FeedBatch {
                timestamp: "feed-t1".to_string(),
                cameras: vec![make_camera("1501", "t1")],
            }),
            Ok(FeedBatch {
                timestamp: "feed-t2".to_string(),
                cameras: vec![make_camera("1501", "t2")],
            }),
        ]);
        let mut rx = poller.subscribe();

        poller.run_poll_cycle().await;
        // Presentation layer attaches a marker after the create
        poller
            .store()
            .lock()
            .await
            .attach_handle("1501", 42)
            .unwrap();

        poller.run_poll_cycle().await;

        // Drain the create, then inspect the update
        let _ = rx.try_recv().unwrap();
        match rx.try_recv().unwrap() {
            ReconcileAction::Updated {
                camera,
                previous_handle,
            } => {
                assert_eq!(camera.timestamp, "t2");
                assert_eq!(previous_handle, Some(42));
            }
            other => panic!("expected Updated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_untouched() {
        let poller = make_poller(vec![
            Ok(FeedBatch {
                timestamp: "feed-t1".to_string(),
                cameras: vec![make_camera("1501", "t1")],
            }),
            Err(anyhow!("connection refused")),
        ]);

        poller.run_poll_cycle().await;
        poller.run_poll_cycle().await;

        let store = poller.store();
        let store = store.lock().await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.feed_timestamp(), Some("feed-t1"));

        let status = poller.status();
        let status = status.lock().await;
        assert_eq!(status.poll_count, 1);
        assert_eq!(status.error_count, 1);
        assert!(status
            .last_error
            .as_deref()
            .unwrap()
            .contains("Failed to fetch camera feed"));
    }

    #[tokio::test]
    async fn test_success_after_failure_clears_last_error() {
        let poller = make_poller(vec![
            Err(anyhow!("connection refused")),
            Ok(FeedBatch {
                timestamp: "feed-t1".to_string(),
                cameras: vec![make_camera("1501", "t1")],
            }),
        ]);

        poller.run_poll_cycle().await;
        poller.run_poll_cycle().await;

        let status = poller.status();
        let status = status.lock().await;
        assert_eq!(status.poll_count, 1);
        assert_eq!(status.error_count, 1);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_steady_state_no_op_broadcasts_nothing() {
        let batch = FeedBatch {
            timestamp: "feed-t1".to_string(),
            cameras: vec![make_camera("1501", "t1")],
        };
        let poller = make_poller(vec![Ok(batch.clone()), Ok(batch)]);
        let mut rx = poller.subscribe();

        poller.run_poll_cycle().await;
        poller.run_poll_cycle().await;

        // Only the initial create comes through
        let _ = rx.try_recv().unwrap();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
