use super::error::MergeServiceError;
use super::MergedAudio;
use crate::infrastructure::repositories::{PodcastRepository, SegmentAudioRepository};
use crate::infrastructure::storage::AudioStorage;
use hound::{WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

/// Combines per-segment WAV artifacts into one downloadable file, inserting
/// a fixed silence gap between segments.
///
/// Runs entirely outside the task engine: it only reads `segment_audios`
/// rows under the requested version tag and never touches task state.
pub struct MergeService {
    podcast_repo: Arc<dyn PodcastRepository>,
    segment_audio_repo: Arc<dyn SegmentAudioRepository>,
    storage: Arc<dyn AudioStorage>,
}

impl MergeService {
    pub fn new(
        podcast_repo: Arc<dyn PodcastRepository>,
        segment_audio_repo: Arc<dyn SegmentAudioRepository>,
        storage: Arc<dyn AudioStorage>,
    ) -> Self {
        Self {
            podcast_repo,
            segment_audio_repo,
            storage,
        }
    }

    /// Merge every synthesized segment of `podcast_id` carrying
    /// `version_tag`, in segment order, with `gap_seconds` of silence
    /// between consecutive segments.
    ///
    /// Fails fast, before decoding anything, when zero eligible segments
    /// exist.
    pub async fn merge(
        &self,
        podcast_id: Uuid,
        version_tag: &str,
        gap_seconds: f64,
    ) -> Result<MergedAudio, MergeServiceError> {
        if !(0.0..=60.0).contains(&gap_seconds) {
            return Err(MergeServiceError::Invalid(format!(
                "gap must be between 0 and 60 seconds, got {gap_seconds}"
            )));
        }

        self.podcast_repo
            .find_by_id(podcast_id)
            .await?
            .ok_or_else(|| MergeServiceError::NotFound(format!("podcast {podcast_id}")))?;

        let segments = self.podcast_repo.list_segments(podcast_id).await?;

        let mut artifacts = Vec::new();
        for segment in &segments {
            if let Some(audio) = self
                .segment_audio_repo
                .latest_for_segment(segment.id, version_tag)
                .await?
            {
                artifacts.push(audio);
            }
        }

        if artifacts.is_empty() {
            return Err(MergeServiceError::NoEligibleSegments);
        }

        let mut readers = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let bytes = self.storage.load(&artifact.audio_url).await?;
            let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| {
                MergeServiceError::InvalidAudio(format!("{}: {e}", artifact.audio_url))
            })?;
            readers.push(reader);
        }

        let spec = readers[0].spec();
        for (reader, artifact) in readers.iter().zip(&artifacts) {
            if reader.spec() != spec {
                return Err(MergeServiceError::InvalidAudio(format!(
                    "{} does not match the format of the first segment",
                    artifact.audio_url
                )));
            }
        }

        let segment_seconds: f64 = readers
            .iter()
            .map(|r| r.duration() as f64 / spec.sample_rate as f64)
            .sum();
        let estimated_seconds =
            segment_seconds + gap_seconds * (readers.len().saturating_sub(1)) as f64;

        tracing::info!(
            podcast_id = %podcast_id,
            version_tag,
            segment_count = readers.len(),
            gap_seconds,
            estimated_seconds,
            "Merging segment audio"
        );

        let audio = write_merged(readers, spec, gap_seconds)?;

        Ok(MergedAudio {
            audio,
            duration_seconds: estimated_seconds,
            segment_count: artifacts.len(),
        })
    }
}

fn write_merged(
    readers: Vec<WavReader<Cursor<Vec<u8>>>>,
    spec: WavSpec,
    gap_seconds: f64,
) -> Result<Vec<u8>, MergeServiceError> {
    let gap_frames = (gap_seconds * spec.sample_rate as f64).round() as usize;
    let gap_samples = gap_frames * spec.channels as usize;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| MergeServiceError::InvalidAudio(e.to_string()))?;

        let last = readers.len() - 1;
        for (i, mut reader) in readers.into_iter().enumerate() {
            for sample in reader.samples::<i16>() {
                let sample = sample.map_err(|e| MergeServiceError::InvalidAudio(e.to_string()))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| MergeServiceError::InvalidAudio(e.to_string()))?;
            }

            if i < last {
                for _ in 0..gap_samples {
                    writer
                        .write_sample(0i16)
                        .map_err(|e| MergeServiceError::InvalidAudio(e.to_string()))?;
                }
            }
        }

        writer
            .finalize()
            .map_err(|e| MergeServiceError::InvalidAudio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::podcast::{Podcast, PodcastSegment, SegmentAudio, DEFAULT_VERSION_TAG};
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakePodcasts {
        podcasts: Vec<Podcast>,
        segments: Vec<PodcastSegment>,
    }

    #[async_trait]
    impl PodcastRepository for FakePodcasts {
        async fn find_by_id(&self, podcast_id: Uuid) -> AppResult<Option<Podcast>> {
            Ok(self.podcasts.iter().find(|p| p.id == podcast_id).cloned())
        }

        async fn list_segments(&self, podcast_id: Uuid) -> AppResult<Vec<PodcastSegment>> {
            let mut segments: Vec<PodcastSegment> = self
                .segments
                .iter()
                .filter(|s| s.podcast_id == podcast_id)
                .cloned()
                .collect();
            segments.sort_by_key(|s| s.idx);
            Ok(segments)
        }

        async fn find_segment(&self, segment_id: Uuid) -> AppResult<Option<PodcastSegment>> {
            Ok(self.segments.iter().find(|s| s.id == segment_id).cloned())
        }
    }

    struct FakeAudios {
        rows: Vec<SegmentAudio>,
    }

    #[async_trait]
    impl SegmentAudioRepository for FakeAudios {
        async fn insert(&self, _audio: &SegmentAudio) -> AppResult<()> {
            unimplemented!("merge never writes audio rows")
        }

        async fn latest_for_segment(
            &self,
            segment_id: Uuid,
            version_tag: &str,
        ) -> AppResult<Option<SegmentAudio>> {
            Ok(self
                .rows
                .iter()
                .filter(|a| a.segment_id == segment_id && a.version_tag == version_tag)
                .max_by_key(|a| a.created_at)
                .cloned())
        }

        async fn segment_ids_with_audio(&self, _segment_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
            unimplemented!("unused by merge")
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl AudioStorage for MemoryStorage {
        async fn store(&self, file_name: &str, bytes: &[u8]) -> AppResult<String> {
            let url = format!("/audio/{file_name}");
            self.files
                .lock()
                .unwrap()
                .insert(url.clone(), bytes.to_vec());
            Ok(url)
        }

        async fn load(&self, audio_url: &str) -> AppResult<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(audio_url)
                .cloned()
                .ok_or_else(|| AppError::NotFound(audio_url.to_string()))
        }
    }

    const SAMPLE_RATE: u32 = 8000;

    fn wav_with_frames(frames: usize) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                writer.write_sample((i % 100) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    struct Setup {
        service: MergeService,
        podcast_id: Uuid,
    }

    async fn setup(frame_counts: &[usize], version_tag: &str) -> Setup {
        let podcast_id = Uuid::new_v4();
        let now = Utc::now();
        let storage = Arc::new(MemoryStorage::default());

        let mut segments = Vec::new();
        let mut rows = Vec::new();
        for (i, frames) in frame_counts.iter().enumerate() {
            let segment_id = Uuid::new_v4();
            segments.push(PodcastSegment {
                id: segment_id,
                podcast_id,
                idx: i as i32,
                speaker_name: "Alice".to_string(),
                speaker_persona_id: Some(1),
                text: "hello".to_string(),
            });

            let url = storage
                .store(&format!("seg-{i}.wav"), &wav_with_frames(*frames))
                .await
                .unwrap();
            rows.push(SegmentAudio {
                id: Uuid::new_v4(),
                segment_id,
                version_tag: version_tag.to_string(),
                audio_url: url,
                params: serde_json::Value::Null,
                created_at: now,
            });
        }

        let service = MergeService::new(
            Arc::new(FakePodcasts {
                podcasts: vec![Podcast {
                    id: podcast_id,
                    title: "Show".to_string(),
                    created_at: now,
                    updated_at: now,
                }],
                segments,
            }),
            Arc::new(FakeAudios { rows }),
            storage,
        );

        Setup {
            service,
            podcast_id,
        }
    }

    #[tokio::test]
    async fn it_merges_segments_with_gap_between_them() {
        // 0.5 s + 0.25 s of audio with a 0.5 s gap = 1.25 s total.
        let s = setup(&[4000, 2000], DEFAULT_VERSION_TAG).await;

        let merged = s
            .service
            .merge(s.podcast_id, DEFAULT_VERSION_TAG, 0.5)
            .await
            .unwrap();

        assert_eq!(merged.segment_count, 2);
        assert!((merged.duration_seconds - 1.25).abs() < 1e-9);

        let reader = WavReader::new(Cursor::new(merged.audio)).unwrap();
        assert_eq!(reader.duration(), 4000 + 4000 + 2000);
    }

    #[tokio::test]
    async fn it_inserts_no_gap_after_the_last_segment() {
        let s = setup(&[1000], DEFAULT_VERSION_TAG).await;

        let merged = s
            .service
            .merge(s.podcast_id, DEFAULT_VERSION_TAG, 0.5)
            .await
            .unwrap();

        let reader = WavReader::new(Cursor::new(merged.audio)).unwrap();
        assert_eq!(reader.duration(), 1000);
        assert!((merged.duration_seconds - 0.125).abs() < 1e-9);
    }

    #[tokio::test]
    async fn it_fails_fast_with_zero_eligible_segments() {
        // Audio exists only under "default"; merging "final" finds nothing.
        let s = setup(&[1000], DEFAULT_VERSION_TAG).await;

        let err = s
            .service
            .merge(s.podcast_id, "final", 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeServiceError::NoEligibleSegments));
    }

    #[tokio::test]
    async fn it_rejects_negative_gap() {
        let s = setup(&[1000], DEFAULT_VERSION_TAG).await;
        let err = s
            .service
            .merge(s.podcast_id, DEFAULT_VERSION_TAG, -1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn it_reports_not_found_for_unknown_podcast() {
        let s = setup(&[1000], DEFAULT_VERSION_TAG).await;
        let err = s
            .service
            .merge(Uuid::new_v4(), DEFAULT_VERSION_TAG, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeServiceError::NotFound(_)));
    }
}
