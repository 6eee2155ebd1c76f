use anyhow::{Context, Result};
use camwatch::config::{load_config, CamwatchConfig};
use camwatch::feed::FeedClient;
use camwatch::poller::FeedPoller;
use camwatch::reconcile::ReconcileAction;
use camwatch::store::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camwatch=info".into()),
        )
        .init();

    info!("Camwatch starting...");

    // Load configuration from CAMWATCH_CONFIG if set, defaults otherwise
    let config = match std::env::var("CAMWATCH_CONFIG") {
        Ok(path) => load_config(&path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => CamwatchConfig::default(),
    };

    info!(
        feed_url = %config.feed.url,
        interval_ms = config.poller.interval_ms,
        "Configuration loaded"
    );

    let client = Arc::new(FeedClient::with_url(
        config.feed.url.clone(),
        config.feed.request_timeout_secs,
    ));

    // Headless run: no presentation layer attaches handles
    let store: Arc<Mutex<SnapshotStore<()>>> = Arc::new(Mutex::new(SnapshotStore::new()));

    let poller = FeedPoller::new(
        client,
        Arc::clone(&store),
        Duration::from_millis(config.poller.interval_ms),
    );

    // Log each reconciliation action in place of a map UI
    let mut actions = poller.subscribe();
    let logger_handle = tokio::spawn(async move {
        while let Ok(action) = actions.recv().await {
            match action {
                ReconcileAction::Created { camera } => {
                    info!(camera_id = %camera.camera_id, "Camera appeared");
                }
                ReconcileAction::Updated { camera, .. } => {
                    info!(
                        camera_id = %camera.camera_id,
                        timestamp = %camera.timestamp,
                        "Camera image updated"
                    );
                }
            }
        }
    });

    let poller_handle = poller.start();

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    // A fetch in flight is simply abandoned; no partial reconciliation
    poller_handle.abort();
    logger_handle.abort();

    let tracked = store.lock().await.len();
    info!(tracked_cameras = tracked, "Camwatch stopped");

    Ok(())
}
