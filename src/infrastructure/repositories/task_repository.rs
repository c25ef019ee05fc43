use crate::domain::synthesis::model::{SegmentResult, SynthesisTask, TaskStatus};
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Persistence for synthesis tasks.
///
/// The task row has exactly one writer (the engine run that owns the task),
/// but `update` still enforces an optimistic version check so a stale
/// snapshot can never overwrite a newer one.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &SynthesisTask) -> AppResult<()>;
    async fn find_by_id(&self, task_id: Uuid) -> AppResult<Option<SynthesisTask>>;
    /// Write the task back. On success the in-memory version and
    /// `updated_at` are advanced; a version mismatch yields a conflict.
    async fn update(&self, task: &mut SynthesisTask) -> AppResult<()>;
}

pub struct PgTaskRepository {
    pool: Arc<DbPool>,
}

impl PgTaskRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

/// Raw row shape; status and results are stored as text/jsonb.
#[derive(FromRow)]
struct TaskRow {
    id: Uuid,
    podcast_id: Uuid,
    status: String,
    progress_completed: i32,
    progress_total: i32,
    current_segment_index: Option<i32>,
    results: serde_json::Value,
    error_message: Option<String>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn into_task(self) -> AppResult<SynthesisTask> {
        let status = TaskStatus::from_str(&self.status).map_err(AppError::Internal)?;
        let results: Vec<SegmentResult> = serde_json::from_value(self.results)
            .map_err(|e| AppError::Internal(format!("corrupt task results: {e}")))?;

        Ok(SynthesisTask {
            id: self.id,
            podcast_id: self.podcast_id,
            status,
            progress_completed: self.progress_completed,
            progress_total: self.progress_total,
            current_segment_index: self.current_segment_index,
            results,
            error_message: self.error_message,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert(&self, task: &SynthesisTask) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let results = serde_json::to_value(&task.results)
            .map_err(|e| AppError::Internal(format!("cannot serialize task results: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO synthesis_tasks
                (id, podcast_id, status, progress_completed, progress_total,
                 current_segment_index, results, error_message, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(task.id)
        .bind(task.podcast_id)
        .bind(task.status.as_str())
        .bind(task.progress_completed)
        .bind(task.progress_total)
        .bind(task.current_segment_index)
        .bind(results)
        .bind(&task.error_message)
        .bind(task.version)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, task_id: Uuid) -> AppResult<Option<SynthesisTask>> {
        let pool = self.pool.as_ref();
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM synthesis_tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(pool)
            .await?;

        row.map(TaskRow::into_task).transpose()
    }

    async fn update(&self, task: &mut SynthesisTask) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let results = serde_json::to_value(&task.results)
            .map_err(|e| AppError::Internal(format!("cannot serialize task results: {e}")))?;
        let now = Utc::now();
        let next_version = task.version + 1;

        let outcome = sqlx::query(
            r#"
            UPDATE synthesis_tasks
            SET status = $2,
                progress_completed = $3,
                progress_total = $4,
                current_segment_index = $5,
                results = $6,
                error_message = $7,
                version = $8,
                updated_at = $9
            WHERE id = $1 AND version = $10
            "#,
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(task.progress_completed)
        .bind(task.progress_total)
        .bind(task.current_segment_index)
        .bind(results)
        .bind(&task.error_message)
        .bind(next_version)
        .bind(now)
        .bind(task.version)
        .execute(pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "synthesis task {} was modified concurrently",
                task.id
            )));
        }

        task.version = next_version;
        task.updated_at = now;

        Ok(())
    }
}
