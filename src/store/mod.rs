//! Ordered snapshot of tracked cameras.
//!
//! The store owns the current camera collection in feed order plus a
//! secondary id index for O(1) lookup. It is initialized exactly once (the
//! first successful fetch becomes the baseline) and thereafter mutated in
//! place by the reconciler. Entries are never removed: cameras that
//! disappear from the feed stay tracked. Removal is deliberately deferred —
//! a clear-and-rebuild pass would force-close any open popup.

use std::collections::HashMap;
use std::fmt;

use crate::camera::{Camera, FeedBatch};


/// Store errors. When raised from the reconciler's own dispatch,
/// `DuplicateIdentity` and `NotFound` indicate an invariant violation rather
/// than a recoverable condition.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    AlreadyInitialized,
    DuplicateIdentity(String),
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyInitialized => {
                write!(f, "snapshot store is already initialized")
            }
            StoreError::DuplicateIdentity(id) => {
                write!(f, "camera '{}' is already tracked", id)
            }
            StoreError::NotFound(id) => {
                write!(f, "camera '{}' is not tracked", id)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// A camera tracked by the store together with its presentation handle.
///
/// The handle is owned and interpreted by the presentation layer alone. The
/// store never creates one; it only carries an attached handle forward when
/// camera content is replaced.
#[derive(Clone, Debug)]
pub struct TrackedCamera<H> {
    pub camera: Camera,
    pub handle: Option<H>,
}

/// In-memory snapshot store.
///
/// `H` is the presentation layer's opaque handle type (e.g., a map marker
/// reference). The store knows nothing about it beyond moving it around.
#[derive(Clone, Debug)]
pub struct SnapshotStore<H> {
    /// Tracked cameras in feed order
    cameras: Vec<TrackedCamera<H>>,
    /// Secondary index: camera_id -> position in `cameras`
    index: HashMap<String, usize>,
    /// Feed-level timestamp of the last applied batch (informational)
    feed_timestamp: Option<String>,
    initialized: bool,
}

impl<H> SnapshotStore<H> {
    /// Create a new, uninitialized store.
    pub fn new() -> Self {
        Self {
            cameras: Vec::new(),
            index: HashMap::new(),
            feed_timestamp: None,
            initialized: false,
        }
    }

    /// True once the first batch has been applied.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Store the first batch as the baseline, in batch order, without
    /// diffing.
    ///
    /// Called exactly once, on the first successful fetch. A duplicate id
    /// within the batch replaces the earlier occurrence in place (last entry
    /// wins, position preserved) so that id uniqueness holds from the start.
    pub fn initialize(&mut self, batch: &FeedBatch) -> Result<(), StoreError> {
        if self.initialized {
            return Err(StoreError::AlreadyInitialized);
        }

        for camera in &batch.cameras {
            match self.index.get(&camera.camera_id) {
                Some(&pos) => {
                    self.cameras[pos].camera = camera.clone();
                }
                None => {
                    self.index
                        .insert(camera.camera_id.clone(), self.cameras.len());
                    self.cameras.push(TrackedCamera {
                        camera: camera.clone(),
                        handle: None,
                    });
                }
            }
        }

        self.feed_timestamp = Some(batch.timestamp.clone());
        self.initialized = true;
        Ok(())
    }

    /// Look up a tracked camera by identity.
    pub fn find(&self, camera_id: &str) -> Option<&TrackedCamera<H>> {
        self.index.get(camera_id).map(|&pos| &self.cameras[pos])
    }

    /// Add a newly discovered camera with no handle.
    pub fn append(&mut self, camera: Camera) -> Result<(), StoreError> {
        if self.index.contains_key(&camera.camera_id) {
            return Err(StoreError::DuplicateIdentity(camera.camera_id));
        }

        self.index.insert(camera.camera_id.clone(), self.cameras.len());
        self.cameras.push(TrackedCamera {
            camera,
            handle: None,
        });
        Ok(())
    }

    /// Attach (or replace) the presentation handle for a tracked camera.
    ///
    /// This is the collaborator's explicit association step after a create
    /// or update. Returns the displaced handle, if any.
    pub fn attach_handle(
        &mut self,
        camera_id: &str,
        handle: H,
    ) -> Result<Option<H>, StoreError> {
        let pos = *self
            .index
            .get(camera_id)
            .ok_or_else(|| StoreError::NotFound(camera_id.to_string()))?;
        Ok(self.cameras[pos].handle.replace(handle))
    }

    /// Record the feed-level timestamp of the latest applied batch.
    pub fn record_feed_timestamp(&mut self, timestamp: &str) {
        self.feed_timestamp = Some(timestamp.to_string());
    }

    /// Feed-level timestamp of the last applied batch.
    pub fn feed_timestamp(&self) -> Option<&str> {
        self.feed_timestamp.as_deref()
    }

    /// All tracked cameras in feed order, for full-redraw fallback reads.
    pub fn cameras(&self) -> &[TrackedCamera<H>] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

impl<H: Clone> SnapshotStore<H> {
    /// Replace the content of a tracked camera in place, preserving its
    /// position and carrying its handle onto the replacement.
    ///
    /// Returns a clone of the carried handle so the caller can report it to
    /// the presentation layer alongside the update.
    pub fn replace_content(
        &mut self,
        camera_id: &str,
        camera: Camera,
    ) -> Result<Option<H>, StoreError> {
        let pos = *self
            .index
            .get(camera_id)
            .ok_or_else(|| StoreError::NotFound(camera_id.to_string()))?;

        let tracked = &mut self.cameras[pos];
        tracked.camera = camera;
        Ok(tracked.handle.clone())
    }
}

impl<H> Default for SnapshotStore<H> {
    fn default() -> Self {
        Self::new()
    }
}
