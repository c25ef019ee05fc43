use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::{
    domain::merge::{MergeAudioRequest, MergeService, DEFAULT_GAP_SECONDS},
    domain::podcast::DEFAULT_VERSION_TAG,
    error::{AppError, AppResult},
};

pub struct MergeController {
    merge_service: Arc<MergeService>,
}

impl MergeController {
    pub fn new(merge_service: Arc<MergeService>) -> Self {
        Self { merge_service }
    }

    /// POST /api/merge-audio - Combine synthesized segments into one file
    pub async fn merge_audio(
        State(controller): State<Arc<MergeController>>,
        Json(request): Json<MergeAudioRequest>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let version_tag = request
            .version_tag
            .unwrap_or_else(|| DEFAULT_VERSION_TAG.to_string());
        let gap_seconds = request.gap_seconds.unwrap_or(DEFAULT_GAP_SECONDS);

        let merged = controller
            .merge_service
            .merge(request.podcast_id, &version_tag, gap_seconds)
            .await
            .map_err(AppError::from)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "audio/wav".parse().unwrap());
        headers.insert(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"podcast-{}.wav\"", request.podcast_id)
                .parse()
                .unwrap(),
        );
        headers.insert(
            "X-Duration-Seconds",
            format!("{:.3}", merged.duration_seconds).parse().unwrap(),
        );
        headers.insert(
            "X-Segment-Count",
            merged.segment_count.to_string().parse().unwrap(),
        );

        Ok((StatusCode::OK, headers, Body::from(merged.audio)))
    }
}
