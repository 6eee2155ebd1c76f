//! Traffic-camera feed client.
//!
//! Fetches the current camera set from the public traffic-images endpoint
//! and hands the reconciler a complete, typed batch. Transport and parse
//! failures stay in this layer; the reconciler is simply not invoked for a
//! failed tick.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::camera::{Camera, FeedBatch};

/// Default feed endpoint (public, no auth).
pub const DEFAULT_FEED_URL: &str = "https://api.data.gov.sg/v1/transport/traffic-images";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Top-level feed response.
#[derive(Debug, Deserialize)]
struct FeedResponse {
    items: Vec<FeedItem>,
    #[serde(default)]
    api_info: Option<ApiInfo>,
}

/// One feed item: the collection timestamp plus the full camera set.
#[derive(Debug, Deserialize)]
struct FeedItem {
    timestamp: String,
    cameras: Vec<Camera>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    status: String,
}

/// Source of camera batches consumed by the poller.
///
/// The poller assumes an all-or-nothing batch per tick: either a complete
/// camera set or an error it logs and skips. Implementations must not
/// deliver partial batches.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches one complete batch from the feed.
    async fn fetch_batch(&self) -> Result<FeedBatch>;
}

/// HTTP client for the traffic-images feed.
pub struct FeedClient {
    http_client: Client,
    url: String,
}

impl FeedClient {
    /// Create a client for the default public endpoint.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_FEED_URL.to_string(), DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Create a client with a custom URL (for testing with a mock server)
    /// and request timeout.
    pub fn with_url(url: String, request_timeout_secs: u64) -> Self {
        let http_client = Client::builder()
            .user_agent("camwatch/0.1")
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");
        Self { http_client, url }
    }

    /// Fetch the latest complete camera batch.
    ///
    /// Fails on any non-2xx status, on a malformed body, or on an empty
    /// `items` array — a batch is all-or-nothing. An unhealthy `api_info`
    /// status is logged but the batch is still returned.
    pub async fn fetch_latest(&self) -> Result<FeedBatch> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .context("Failed to send feed request")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Feed returned error status {}", status));
        }

        let feed: FeedResponse = response
            .json()
            .await
            .context("Failed to parse feed response")?;

        if let Some(api_info) = &feed.api_info {
            if api_info.status != "healthy" {
                warn!(status = %api_info.status, "Feed reports unhealthy API status");
            }
        }

        let item = feed
            .items
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Feed returned no items"))?;

        Ok(FeedBatch {
            timestamp: item.timestamp,
            cameras: item.cameras,
        })
    }
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_batch(&self) -> Result<FeedBatch> {
        self.fetch_latest().await
    }
}
