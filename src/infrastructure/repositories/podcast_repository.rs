use crate::domain::podcast::{Podcast, PodcastSegment};
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait PodcastRepository: Send + Sync {
    async fn find_by_id(&self, podcast_id: Uuid) -> AppResult<Option<Podcast>>;
    /// Segments ordered by ascending index.
    async fn list_segments(&self, podcast_id: Uuid) -> AppResult<Vec<PodcastSegment>>;
    async fn find_segment(&self, segment_id: Uuid) -> AppResult<Option<PodcastSegment>>;
}

pub struct PgPodcastRepository {
    pool: Arc<DbPool>,
}

impl PgPodcastRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PodcastRepository for PgPodcastRepository {
    async fn find_by_id(&self, podcast_id: Uuid) -> AppResult<Option<Podcast>> {
        let pool = self.pool.as_ref();
        let podcast = sqlx::query_as::<_, Podcast>("SELECT * FROM podcasts WHERE id = $1")
            .bind(podcast_id)
            .fetch_optional(pool)
            .await?;

        Ok(podcast)
    }

    async fn list_segments(&self, podcast_id: Uuid) -> AppResult<Vec<PodcastSegment>> {
        let pool = self.pool.as_ref();
        let segments = sqlx::query_as::<_, PodcastSegment>(
            "SELECT * FROM podcast_segments WHERE podcast_id = $1 ORDER BY idx",
        )
        .bind(podcast_id)
        .fetch_all(pool)
        .await?;

        Ok(segments)
    }

    async fn find_segment(&self, segment_id: Uuid) -> AppResult<Option<PodcastSegment>> {
        let pool = self.pool.as_ref();
        let segment =
            sqlx::query_as::<_, PodcastSegment>("SELECT * FROM podcast_segments WHERE id = $1")
                .bind(segment_id)
                .fetch_optional(pool)
                .await?;

        Ok(segment)
    }
}
