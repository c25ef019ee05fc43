use crate::domain::podcast::SegmentAudio;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Append-only store of per-segment audio versions.
#[async_trait]
pub trait SegmentAudioRepository: Send + Sync {
    async fn insert(&self, audio: &SegmentAudio) -> AppResult<()>;
    /// Newest audio row for a (segment, version tag) pair.
    async fn latest_for_segment(
        &self,
        segment_id: Uuid,
        version_tag: &str,
    ) -> AppResult<Option<SegmentAudio>>;
    /// Which of the given segments already have audio, under any tag.
    async fn segment_ids_with_audio(&self, segment_ids: &[Uuid]) -> AppResult<Vec<Uuid>>;
}

pub struct PgSegmentAudioRepository {
    pool: Arc<DbPool>,
}

impl PgSegmentAudioRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SegmentAudioRepository for PgSegmentAudioRepository {
    async fn insert(&self, audio: &SegmentAudio) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO segment_audios (id, segment_id, version_tag, audio_url, params, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(audio.id)
        .bind(audio.segment_id)
        .bind(&audio.version_tag)
        .bind(&audio.audio_url)
        .bind(&audio.params)
        .bind(audio.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn latest_for_segment(
        &self,
        segment_id: Uuid,
        version_tag: &str,
    ) -> AppResult<Option<SegmentAudio>> {
        let pool = self.pool.as_ref();
        let audio = sqlx::query_as::<_, SegmentAudio>(
            r#"
            SELECT * FROM segment_audios
            WHERE segment_id = $1 AND version_tag = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(segment_id)
        .bind(version_tag)
        .fetch_optional(pool)
        .await?;

        Ok(audio)
    }

    async fn segment_ids_with_audio(&self, segment_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let pool = self.pool.as_ref();
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT DISTINCT segment_id FROM segment_audios WHERE segment_id = ANY($1)",
        )
        .bind(segment_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
