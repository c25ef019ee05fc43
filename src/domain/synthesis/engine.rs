use super::error::SynthesisServiceError;
use super::model::{SegmentResult, SynthesisTask};
use super::{
    ContinueSynthesisRequest, ContinueSynthesisResponse, ResynthesizeSegmentRequest,
    ResynthesizeSegmentResponse, SegmentInput, SynthesizeRequest, TaskStatusResponse,
};
use crate::domain::persona::PersonaResolver;
use crate::domain::podcast::{SegmentAudio, DEFAULT_VERSION_TAG};
use crate::infrastructure::repositories::{
    PodcastRepository, SegmentAudioRepository, TaskRepository,
};
use crate::infrastructure::storage::AudioStorage;
use crate::infrastructure::tts::{
    ProviderKind, SynthesisParams, SynthesizedAudio, TtsProvider, TtsProviderFactory,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Provider used when continue/resynthesize requests do not name one.
const DEFAULT_PROVIDER: ProviderKind = ProviderKind::ElevenLabs;

/// Per-segment synthesis policy: bounded retries with exponential backoff
/// and a hard per-call timeout so a stalled vendor call cannot wedge a task
/// forever.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// A segment ready for synthesis: persona resolved, text cleaned.
#[derive(Debug, Clone)]
struct ResolvedSegment {
    /// Stored segment row, when the request maps onto one.
    segment_id: Option<Uuid>,
    index: i32,
    voice_id: String,
    text: String,
}

/// Drives a batch of script segments from submission to a terminal task
/// state.
///
/// Segments are processed strictly in ascending index order, one at a time.
/// A provider failure for one segment is recorded and processing continues;
/// only an engine-level fault (task row unwritable) aborts the batch into
/// `failed`.
pub struct SynthesisEngine {
    task_repo: Arc<dyn TaskRepository>,
    podcast_repo: Arc<dyn PodcastRepository>,
    segment_audio_repo: Arc<dyn SegmentAudioRepository>,
    resolver: Arc<PersonaResolver>,
    providers: Arc<TtsProviderFactory>,
    storage: Arc<dyn AudioStorage>,
    retry: RetryPolicy,
}

impl SynthesisEngine {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        podcast_repo: Arc<dyn PodcastRepository>,
        segment_audio_repo: Arc<dyn SegmentAudioRepository>,
        resolver: Arc<PersonaResolver>,
        providers: Arc<TtsProviderFactory>,
        storage: Arc<dyn AudioStorage>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            task_repo,
            podcast_repo,
            segment_audio_repo,
            resolver,
            providers,
            storage,
            retry,
        }
    }

    /// Accept a batch of segments and either run it to a terminal state
    /// (sync) or hand back the pending task immediately and process in the
    /// background (async).
    pub async fn synthesize(
        self: Arc<Self>,
        request: SynthesizeRequest,
    ) -> Result<TaskStatusResponse, SynthesisServiceError> {
        if request.segments.is_empty() {
            return Err(SynthesisServiceError::Invalid(
                "segments must not be empty".to_string(),
            ));
        }

        let provider_kind: ProviderKind = request
            .tts_provider
            .parse()
            .map_err(SynthesisServiceError::Invalid)?;
        let provider = self
            .providers
            .provider(provider_kind)
            .map_err(|e| SynthesisServiceError::Dependency(e.to_string()))?;
        let params = request.synthesis_params.unwrap_or_default();

        let batch = self
            .resolve_batch(request.podcast_id, request.segments)
            .await?;
        if batch.is_empty() {
            return Err(SynthesisServiceError::Invalid(
                "no synthesizable segments: every segment was skipped".to_string(),
            ));
        }

        let task = SynthesisTask::new(request.podcast_id, batch.len());
        self.task_repo.insert(&task).await?;

        tracing::info!(
            task_id = %task.id,
            podcast_id = %task.podcast_id,
            segments = batch.len(),
            provider = provider.name(),
            run_async = request.run_async,
            "Synthesis task created"
        );

        if request.run_async {
            let engine = Arc::clone(&self);
            let task_id = task.id;
            tokio::spawn(async move {
                if let Err(e) = engine
                    .process_segments(task_id, batch, provider, params)
                    .await
                {
                    tracing::error!(task_id = %task_id, error = %e, "Background synthesis run failed");
                }
            });
            return Ok(TaskStatusResponse::from(&task));
        }

        self.process_segments(task.id, batch, provider, params)
            .await?;
        let task = self.load_task(task.id).await?;
        Ok(TaskStatusResponse::from(&task))
    }

    /// Build a batch from every stored segment of the podcast that has no
    /// audio yet. Zero eligible segments is a success response with no task
    /// row, not an error.
    pub async fn continue_synthesis(
        self: Arc<Self>,
        request: ContinueSynthesisRequest,
    ) -> Result<ContinueSynthesisResponse, SynthesisServiceError> {
        let podcast_id = request.podcast_id;
        self.podcast_repo
            .find_by_id(podcast_id)
            .await?
            .ok_or_else(|| SynthesisServiceError::NotFound(format!("podcast {podcast_id}")))?;

        let segments = self.podcast_repo.list_segments(podcast_id).await?;
        let segment_ids: Vec<Uuid> = segments.iter().map(|s| s.id).collect();
        let with_audio: HashSet<Uuid> = self
            .segment_audio_repo
            .segment_ids_with_audio(&segment_ids)
            .await?
            .into_iter()
            .collect();

        let pending: Vec<SegmentInput> = segments
            .iter()
            .filter(|s| !with_audio.contains(&s.id))
            .map(|s| SegmentInput {
                segment_index: s.idx,
                text: s.text.clone(),
                speaker_persona_id: s.speaker_persona_id,
                speaker_name: s.speaker_name.clone(),
            })
            .collect();

        if pending.is_empty() {
            tracing::info!(podcast_id = %podcast_id, "All segments already have audio, nothing to do");
            return Ok(ContinueSynthesisResponse {
                success: true,
                message: "All segments already have audio".to_string(),
                task_id: None,
                segments_to_process: 0,
                podcast_id,
            });
        }

        let synth_request = SynthesizeRequest {
            podcast_id,
            segments: pending,
            run_async: true,
            tts_provider: request
                .tts_provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.as_str().to_string()),
            synthesis_params: request.synthesis_params,
        };

        match self.synthesize(synth_request).await {
            Ok(snapshot) => Ok(ContinueSynthesisResponse {
                success: true,
                message: format!(
                    "Queued {} segment(s) for synthesis",
                    snapshot.progress.total
                ),
                task_id: Some(snapshot.task_id),
                segments_to_process: snapshot.progress.total,
                podcast_id,
            }),
            // Everything pending was skipped (no persona); no task exists.
            Err(SynthesisServiceError::Invalid(message)) => Ok(ContinueSynthesisResponse {
                success: false,
                message,
                task_id: None,
                segments_to_process: 0,
                podcast_id,
            }),
            Err(e) => Err(e),
        }
    }

    /// Single-segment batch built from a stored segment, always synchronous:
    /// the caller gets a definitive success or failure, never a pending
    /// status.
    pub async fn resynthesize_segment(
        self: Arc<Self>,
        request: ResynthesizeSegmentRequest,
    ) -> Result<ResynthesizeSegmentResponse, SynthesisServiceError> {
        let segment_id = request.segment_id;
        let segment = self
            .podcast_repo
            .find_segment(segment_id)
            .await?
            .ok_or_else(|| SynthesisServiceError::NotFound(format!("segment {segment_id}")))?;

        if segment.podcast_id != request.podcast_id {
            return Err(SynthesisServiceError::Invalid(format!(
                "segment {segment_id} does not belong to podcast {}",
                request.podcast_id
            )));
        }

        let synth_request = SynthesizeRequest {
            podcast_id: request.podcast_id,
            segments: vec![SegmentInput {
                segment_index: segment.idx,
                text: segment.text.clone(),
                speaker_persona_id: segment.speaker_persona_id,
                speaker_name: segment.speaker_name.clone(),
            }],
            run_async: false,
            tts_provider: request
                .tts_provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.as_str().to_string()),
            synthesis_params: request.synthesis_params,
        };

        match self.synthesize(synth_request).await {
            Ok(snapshot) => {
                let result = snapshot.results.as_ref().and_then(|r| r.first());
                Ok(match result {
                    Some(r) if r.is_ok() => ResynthesizeSegmentResponse {
                        success: true,
                        message: "Segment re-synthesized".to_string(),
                        segment_id,
                        task_id: Some(snapshot.task_id),
                        audio_file_url: r.audio_file_url.clone(),
                        error: None,
                    },
                    Some(r) => ResynthesizeSegmentResponse {
                        success: false,
                        message: "Segment synthesis failed".to_string(),
                        segment_id,
                        task_id: Some(snapshot.task_id),
                        audio_file_url: None,
                        error: r.error.clone(),
                    },
                    None => ResynthesizeSegmentResponse {
                        success: false,
                        message: "Segment produced no result".to_string(),
                        segment_id,
                        task_id: Some(snapshot.task_id),
                        audio_file_url: None,
                        error: None,
                    },
                })
            }
            // The segment was skipped at resolution time (no persona).
            Err(SynthesisServiceError::Invalid(message)) => Ok(ResynthesizeSegmentResponse {
                success: false,
                message,
                segment_id,
                task_id: None,
                audio_file_url: None,
                error: None,
            }),
            Err(e) => Err(e),
        }
    }

    /// Resolve personas and clean text, dropping segments that cannot be
    /// synthesized. Skipped segments never appear in task results.
    async fn resolve_batch(
        &self,
        podcast_id: Uuid,
        mut inputs: Vec<SegmentInput>,
    ) -> Result<Vec<ResolvedSegment>, SynthesisServiceError> {
        inputs.sort_by_key(|s| s.segment_index);

        let stored_by_index: HashMap<i32, Uuid> = self
            .podcast_repo
            .list_segments(podcast_id)
            .await?
            .into_iter()
            .map(|s| (s.idx, s.id))
            .collect();

        let mut batch = Vec::with_capacity(inputs.len());
        for input in inputs {
            let text = clean_text(&input.text);
            if text.is_empty() {
                tracing::warn!(
                    segment_index = input.segment_index,
                    "Skipping segment with empty text"
                );
                continue;
            }

            let persona = self
                .resolver
                .resolve_speaker(&input.speaker_name, input.speaker_persona_id)
                .await?;
            let Some(persona) = persona else {
                tracing::info!(
                    segment_index = input.segment_index,
                    speaker_name = %input.speaker_name,
                    "Skipping segment without a resolvable persona"
                );
                continue;
            };
            let Some(voice_id) = persona.voice_id() else {
                continue;
            };

            batch.push(ResolvedSegment {
                segment_id: stored_by_index.get(&input.segment_index).copied(),
                index: input.segment_index,
                voice_id: voice_id.to_string(),
                text,
            });
        }

        Ok(batch)
    }

    async fn process_segments(
        &self,
        task_id: Uuid,
        batch: Vec<ResolvedSegment>,
        provider: Arc<dyn TtsProvider>,
        params: SynthesisParams,
    ) -> Result<(), SynthesisServiceError> {
        match self.run_batch(task_id, &batch, provider.as_ref(), &params).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail_task(task_id, &e).await;
                Err(e)
            }
        }
    }

    async fn run_batch(
        &self,
        task_id: Uuid,
        batch: &[ResolvedSegment],
        provider: &dyn TtsProvider,
        params: &SynthesisParams,
    ) -> Result<(), SynthesisServiceError> {
        let mut task = self.load_task(task_id).await?;
        task.begin_processing()?;
        self.task_repo.update(&mut task).await?;

        for segment in batch {
            task.set_current_segment(segment.index)?;
            self.task_repo.update(&mut task).await?;

            let result = match self
                .synthesize_segment(task_id, segment, provider, params)
                .await
            {
                Ok(audio_url) => SegmentResult::ok(segment.index, audio_url),
                Err(message) => {
                    tracing::warn!(
                        task_id = %task_id,
                        segment_index = segment.index,
                        error = %message,
                        "Segment synthesis failed, continuing with next segment"
                    );
                    SegmentResult::err(segment.index, message)
                }
            };

            task.record_result(result)?;
            self.task_repo.update(&mut task).await?;

            tracing::info!(
                task_id = %task_id,
                completed = task.progress_completed,
                total = task.progress_total,
                "Segment attempt recorded"
            );
        }

        task.complete()?;
        self.task_repo.update(&mut task).await?;

        tracing::info!(
            task_id = %task_id,
            success = task.success(),
            "Synthesis task completed"
        );

        Ok(())
    }

    /// One segment attempt: call the provider (with retry and timeout),
    /// store the audio, append the segment_audios version row. Any failure
    /// here is a per-segment error, not an engine fault.
    async fn synthesize_segment(
        &self,
        task_id: Uuid,
        segment: &ResolvedSegment,
        provider: &dyn TtsProvider,
        params: &SynthesisParams,
    ) -> Result<String, String> {
        let audio = self.call_with_retry(segment, provider, params).await?;

        let file_name = format!("{}_{}.wav", task_id, segment.index);
        let audio_url = self
            .storage
            .store(&file_name, &audio.audio)
            .await
            .map_err(|e| format!("failed to store audio: {e}"))?;

        if let Some(segment_id) = segment.segment_id {
            let row = SegmentAudio {
                id: Uuid::new_v4(),
                segment_id,
                version_tag: DEFAULT_VERSION_TAG.to_string(),
                audio_url: audio_url.clone(),
                params: serde_json::to_value(params).unwrap_or_default(),
                created_at: Utc::now(),
            };
            self.segment_audio_repo
                .insert(&row)
                .await
                .map_err(|e| format!("failed to record segment audio: {e}"))?;
        }

        Ok(audio_url)
    }

    async fn call_with_retry(
        &self,
        segment: &ResolvedSegment,
        provider: &dyn TtsProvider,
        params: &SynthesisParams,
    ) -> Result<SynthesizedAudio, String> {
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            let call = provider.synthesize(&segment.text, &segment.voice_id, params);
            match tokio::time::timeout(self.retry.call_timeout, call).await {
                Ok(Ok(audio)) => return Ok(audio),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!(
                        "synthesis call timed out after {}s",
                        self.retry.call_timeout.as_secs()
                    )
                }
            }

            tracing::warn!(
                segment_index = segment.index,
                attempt,
                max_attempts = self.retry.max_attempts,
                error = %last_error,
                "Segment synthesis attempt failed"
            );

            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.retry.backoff_for(attempt)).await;
            }
        }

        Err(last_error)
    }

    /// Best effort: the task row may be unreachable for the same reason the
    /// batch aborted.
    async fn fail_task(&self, task_id: Uuid, error: &SynthesisServiceError) {
        match self.task_repo.find_by_id(task_id).await {
            Ok(Some(mut task)) if !task.status.is_terminal() => {
                if task.fail(error.to_string()).is_ok() {
                    if let Err(e) = self.task_repo.update(&mut task).await {
                        tracing::error!(
                            task_id = %task_id,
                            error = %e,
                            "Could not persist failed task state"
                        );
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Could not load task to mark failed");
            }
        }
    }

    async fn load_task(&self, task_id: Uuid) -> Result<SynthesisTask, SynthesisServiceError> {
        self.task_repo
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| SynthesisServiceError::NotFound(format!("synthesis task {task_id}")))
    }
}

/// Normalize script text before synthesis: collapse whitespace runs.
fn clean_text(text: &str) -> String {
    let whitespace_pattern = regex::Regex::new(r"\s+").unwrap();
    whitespace_pattern.replace_all(text, " ").trim().to_string()
}
