pub mod error;
pub mod service;

pub use error::MergeServiceError;
pub use service::MergeService;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Silence inserted between segments when the caller does not specify one.
pub const DEFAULT_GAP_SECONDS: f64 = 0.5;

/// Request for POST /api/merge-audio
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeAudioRequest {
    pub podcast_id: Uuid,
    #[serde(default)]
    pub version_tag: Option<String>,
    #[serde(default)]
    pub gap_seconds: Option<f64>,
}

/// The merged artifact handed back to the controller.
#[derive(Debug, Clone)]
pub struct MergedAudio {
    pub audio: Vec<u8>,
    pub duration_seconds: f64,
    pub segment_count: usize,
}
