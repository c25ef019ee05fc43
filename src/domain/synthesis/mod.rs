pub mod engine;
pub mod error;
pub mod model;
pub mod reporter;

pub use engine::{RetryPolicy, SynthesisEngine};
pub use error::SynthesisServiceError;
pub use model::{SegmentResult, SynthesisTask, TaskStatus};
pub use reporter::StatusReporter;

use crate::infrastructure::tts::SynthesisParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request for POST /api/synthesize
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub podcast_id: Uuid,
    pub segments: Vec<SegmentInput>,
    #[serde(default, rename = "async")]
    pub run_async: bool,
    pub tts_provider: String,
    #[serde(default)]
    pub synthesis_params: Option<SynthesisParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentInput {
    pub segment_index: i32,
    pub text: String,
    #[serde(default)]
    pub speaker_persona_id: Option<i32>,
    pub speaker_name: String,
}

/// Polling payload for a task, and the snapshot returned by synchronous
/// synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    pub task_id: Uuid,
    pub podcast_id: Uuid,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub progress: ProgressView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SegmentResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub completed: i32,
    pub total: i32,
    pub percentage: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_segment_index: Option<i32>,
}

impl From<&SynthesisTask> for TaskStatusResponse {
    fn from(task: &SynthesisTask) -> Self {
        let (success, results, error) = match task.status {
            TaskStatus::Completed => (Some(task.success()), Some(task.results.clone()), None),
            TaskStatus::Failed => (None, None, task.error_message.clone()),
            _ => (None, None, None),
        };

        Self {
            task_id: task.id,
            podcast_id: task.podcast_id,
            status: task.status,
            success,
            progress: ProgressView {
                completed: task.progress_completed,
                total: task.progress_total,
                percentage: task.percentage(),
                current_segment_index: task.current_segment_index,
            },
            created_at: task.created_at,
            updated_at: task.updated_at,
            results,
            error,
        }
    }
}

/// Request for POST /api/continue-synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueSynthesisRequest {
    pub podcast_id: Uuid,
    #[serde(default)]
    pub tts_provider: Option<String>,
    #[serde(default)]
    pub synthesis_params: Option<SynthesisParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueSynthesisResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    pub segments_to_process: i32,
    pub podcast_id: Uuid,
}

/// Request for POST /api/resynthesize-segment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResynthesizeSegmentRequest {
    pub podcast_id: Uuid,
    pub segment_id: Uuid,
    #[serde(default)]
    pub tts_provider: Option<String>,
    #[serde(default)]
    pub synthesis_params: Option<SynthesisParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResynthesizeSegmentResponse {
    pub success: bool,
    pub message: String,
    pub segment_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
