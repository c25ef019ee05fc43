use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one segment within a task. Exactly one of `audio_file_url`
/// and `error` is set once the segment's attempt finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentResult {
    pub segment_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SegmentResult {
    pub fn ok(segment_index: i32, audio_file_url: String) -> Self {
        Self {
            segment_index,
            audio_file_url: Some(audio_file_url),
            error: None,
        }
    }

    pub fn err(segment_index: i32, error: String) -> Self {
        Self {
            segment_index,
            audio_file_url: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.audio_file_url.is_some() && self.error.is_none()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TaskTransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    #[error("task already holds {have} of {total} results")]
    ResultOverflow { have: usize, total: i32 },
    #[error("segment {index} is not after the last recorded segment")]
    OutOfOrder { index: i32 },
}

/// The persisted unit of work for one batch of segments.
///
/// Status only ever moves forward (pending → processing → completed|failed)
/// and the transition methods reject anything else; the repository enforces
/// an optimistic version check on write so a stale snapshot cannot clobber a
/// newer one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisTask {
    pub id: Uuid,
    pub podcast_id: Uuid,
    pub status: TaskStatus,
    pub progress_completed: i32,
    pub progress_total: i32,
    pub current_segment_index: Option<i32>,
    pub results: Vec<SegmentResult>,
    pub error_message: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SynthesisTask {
    pub fn new(podcast_id: Uuid, total_segments: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            podcast_id,
            status: TaskStatus::Pending,
            progress_completed: 0,
            progress_total: total_segments as i32,
            current_segment_index: None,
            results: Vec::new(),
            error_message: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// pending → processing
    pub fn begin_processing(&mut self) -> Result<(), TaskTransitionError> {
        if self.status != TaskStatus::Pending {
            return Err(TaskTransitionError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Processing,
            });
        }
        self.status = TaskStatus::Processing;
        Ok(())
    }

    /// Mark which segment the engine is about to attempt.
    pub fn set_current_segment(&mut self, index: i32) -> Result<(), TaskTransitionError> {
        if self.status != TaskStatus::Processing {
            return Err(TaskTransitionError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Processing,
            });
        }
        self.current_segment_index = Some(index);
        Ok(())
    }

    /// Append one segment outcome and bump the progress counter.
    ///
    /// Results must arrive in strictly ascending segment index order and
    /// never exceed the declared total.
    pub fn record_result(&mut self, result: SegmentResult) -> Result<(), TaskTransitionError> {
        if self.status != TaskStatus::Processing {
            return Err(TaskTransitionError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Processing,
            });
        }
        if self.results.len() as i32 >= self.progress_total {
            return Err(TaskTransitionError::ResultOverflow {
                have: self.results.len(),
                total: self.progress_total,
            });
        }
        if let Some(last) = self.results.last() {
            if result.segment_index <= last.segment_index {
                return Err(TaskTransitionError::OutOfOrder {
                    index: result.segment_index,
                });
            }
        }
        self.results.push(result);
        self.progress_completed = self.results.len() as i32;
        Ok(())
    }

    /// processing → completed. Requires every segment to have been attempted;
    /// "completed" means processing finished, not that all audio succeeded.
    pub fn complete(&mut self) -> Result<(), TaskTransitionError> {
        if self.status != TaskStatus::Processing {
            return Err(TaskTransitionError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Completed,
            });
        }
        if self.progress_completed != self.progress_total {
            return Err(TaskTransitionError::ResultOverflow {
                have: self.results.len(),
                total: self.progress_total,
            });
        }
        self.status = TaskStatus::Completed;
        self.current_segment_index = None;
        Ok(())
    }

    /// {pending, processing} → failed. Engine-level faults only; a single
    /// segment's synthesis failure is recorded via [`Self::record_result`].
    pub fn fail(&mut self, message: String) -> Result<(), TaskTransitionError> {
        if self.status.is_terminal() {
            return Err(TaskTransitionError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Failed,
            });
        }
        self.status = TaskStatus::Failed;
        self.error_message = Some(message);
        Ok(())
    }

    /// At least one segment produced audio.
    pub fn success(&self) -> bool {
        self.results.iter().any(|r| r.is_ok())
    }

    pub fn percentage(&self) -> i32 {
        if self.progress_total == 0 {
            return 0;
        }
        ((100.0 * self.progress_completed as f64) / self.progress_total as f64).round() as i32
    }
}
