//! Reconciliation engine.
//!
//! Takes the current snapshot and a freshly fetched batch and computes the
//! minimal set of create/update mutations, leaving unchanged cameras (and
//! their presentation handles) untouched. This is what lets a map UI refresh
//! every poll without flicker and without force-closing an open popup.

use crate::camera::{Camera, FeedBatch};
use crate::store::{SnapshotStore, StoreError};


/// One reconciliation action, emitted in batch order for the presentation
/// layer to consume.
#[derive(Clone, Debug)]
pub enum ReconcileAction<H> {
    /// A camera id seen for the first time. The presentation layer should
    /// build a marker and attach its handle via
    /// [`SnapshotStore::attach_handle`].
    Created { camera: Camera },

    /// An already-tracked camera whose change token differs. The handle was
    /// carried onto the replacement; `previous_handle` hands the
    /// presentation layer the old reference so it can keep, move, or
    /// recreate the visual representation.
    Updated {
        camera: Camera,
        previous_handle: Option<H>,
    },
}

impl<H> ReconcileAction<H> {
    /// Identity of the camera this action concerns.
    pub fn camera_id(&self) -> &str {
        match self {
            ReconcileAction::Created { camera } => &camera.camera_id,
            ReconcileAction::Updated { camera, .. } => &camera.camera_id,
        }
    }
}

/// Reconcile a fetched batch against the store.
///
/// Deterministic single pass over `batch.cameras` in input order:
/// - the first call initializes the store from the batch and emits one
///   `Created` per stored camera;
/// - thereafter each incoming camera yields at most one action: `Created`
///   for a new identity, `Updated` when the change token differs, nothing
///   when it matches.
///
/// Cameras tracked by the store but absent from the batch are left untouched
/// and produce no action; the tracked set never shrinks.
///
/// A duplicate id within one batch resolves last-entry-wins: the second
/// occurrence is dispatched against the store state the first occurrence
/// already produced.
///
/// Store errors escaping this controlled dispatch are invariant violations
/// and propagate unretried. The batch itself is never mutated.
pub fn reconcile<H: Clone>(
    store: &mut SnapshotStore<H>,
    batch: &FeedBatch,
) -> Result<Vec<ReconcileAction<H>>, StoreError> {
    if !store.is_initialized() {
        store.initialize(batch)?;
        return Ok(store
            .cameras()
            .iter()
            .map(|tracked| ReconcileAction::Created {
                camera: tracked.camera.clone(),
            })
            .collect());
    }

    let mut actions = Vec::new();

    for incoming in &batch.cameras {
        let unchanged = store
            .find(&incoming.camera_id)
            .map(|existing| existing.camera.timestamp == incoming.timestamp);

        match unchanged {
            None => {
                store.append(incoming.clone())?;
                actions.push(ReconcileAction::Created {
                    camera: incoming.clone(),
                });
            }
            Some(true) => {
                // Unchanged: stored entry, handle included, stays as-is
            }
            Some(false) => {
                let previous_handle =
                    store.replace_content(&incoming.camera_id, incoming.clone())?;
                actions.push(ReconcileAction::Updated {
                    camera: incoming.clone(),
                    previous_handle,
                });
            }
        }
    }

    store.record_feed_timestamp(&batch.timestamp);
    Ok(actions)
}
