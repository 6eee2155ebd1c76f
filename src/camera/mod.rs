use serde::{Deserialize, Serialize};

/// Camera represents one traffic camera as reported by the feed.
///
/// Field names follow the feed's JSON. `camera_id` is the stable identity
/// key; `timestamp` is an opaque change token compared for equality only,
/// never parsed as a time value. A `Camera` carries no presentation state,
/// so derived equality can never depend on anything the presentation layer
/// owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Stable identity key (e.g., "1501"); unique within a snapshot
    pub camera_id: String,

    /// Opaque change token; differs iff the camera's content changed upstream
    pub timestamp: String,

    /// Image URL
    pub image: String,

    /// Camera position
    pub location: Location,

    /// Image dimensions and checksum
    pub image_metadata: ImageMetadata,
}

/// Camera position in decimal degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Dimensions and checksum of the camera's current image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub height: u32,
    pub width: u32,
    pub md5: String,
}

/// One fetch cycle's complete camera set, treated as atomic input to
/// reconciliation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedBatch {
    /// Feed-level timestamp; informational only, never drives reconciliation
    pub timestamp: String,

    /// Cameras in feed order; order is preserved for deterministic output
    pub cameras: Vec<Camera>,
}
