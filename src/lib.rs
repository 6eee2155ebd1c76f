// Camera entity model and feed batch
pub mod camera;

// Ordered snapshot store
pub mod store;

// Reconciliation engine
pub mod reconcile;

// Feed client and FeedSource trait
pub mod feed;

// Periodic poller
pub mod poller;

// Configuration
pub mod config;
