use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::synthesis::{
        ContinueSynthesisRequest, ContinueSynthesisResponse, ResynthesizeSegmentRequest,
        ResynthesizeSegmentResponse, StatusReporter, SynthesisEngine, SynthesizeRequest,
        TaskStatusResponse,
    },
    error::{AppError, AppResult},
};

/// A single segment's script text is capped to keep one vendor call bounded.
const MAX_SEGMENT_CHARS: usize = 10_000;

pub struct SynthesisController {
    engine: Arc<SynthesisEngine>,
    reporter: Arc<StatusReporter>,
}

impl SynthesisController {
    pub fn new(engine: Arc<SynthesisEngine>, reporter: Arc<StatusReporter>) -> Self {
        Self { engine, reporter }
    }

    /// POST /api/synthesize - Synthesize a batch of script segments
    pub async fn synthesize(
        State(controller): State<Arc<SynthesisController>>,
        Json(request): Json<SynthesizeRequest>,
    ) -> AppResult<(StatusCode, Json<TaskStatusResponse>)> {
        if request.segments.is_empty() {
            return Err(AppError::BadRequest("Segments cannot be empty".to_string()));
        }
        for segment in &request.segments {
            if segment.text.len() > MAX_SEGMENT_CHARS {
                return Err(AppError::PayloadTooLarge(format!(
                    "Segment {} exceeds {} characters",
                    segment.segment_index, MAX_SEGMENT_CHARS
                )));
            }
        }

        let run_async = request.run_async;
        let snapshot = controller
            .engine
            .clone()
            .synthesize(request)
            .await
            .map_err(AppError::from)?;

        // Async mode hands back a pending task to poll; sync mode the final
        // snapshot.
        let status = if run_async {
            StatusCode::ACCEPTED
        } else {
            StatusCode::OK
        };

        Ok((status, Json(snapshot)))
    }

    /// GET /api/synthesis-status/:taskId - Poll a task
    pub async fn get_status(
        State(controller): State<Arc<SynthesisController>>,
        Path(task_id): Path<Uuid>,
    ) -> AppResult<Json<TaskStatusResponse>> {
        let status = controller
            .reporter
            .get_status(task_id)
            .await
            .map_err(AppError::from)?;

        Ok(Json(status))
    }

    /// POST /api/continue-synthesis - Synthesize only segments lacking audio
    pub async fn continue_synthesis(
        State(controller): State<Arc<SynthesisController>>,
        Json(request): Json<ContinueSynthesisRequest>,
    ) -> AppResult<Json<ContinueSynthesisResponse>> {
        let response = controller
            .engine
            .clone()
            .continue_synthesis(request)
            .await
            .map_err(AppError::from)?;

        Ok(Json(response))
    }

    /// POST /api/resynthesize-segment - Re-run one segment synchronously
    pub async fn resynthesize_segment(
        State(controller): State<Arc<SynthesisController>>,
        Json(request): Json<ResynthesizeSegmentRequest>,
    ) -> AppResult<Json<ResynthesizeSegmentResponse>> {
        let response = controller
            .engine
            .clone()
            .resynthesize_segment(request)
            .await
            .map_err(AppError::from)?;

        Ok(Json(response))
    }
}
