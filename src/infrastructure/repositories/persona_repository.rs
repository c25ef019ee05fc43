use crate::domain::persona::Persona;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only access to the persona store. The synthesis pipeline never
/// writes personas; persona CRUD lives elsewhere.
#[async_trait]
pub trait PersonaRepository: Send + Sync {
    async fn list_active(&self) -> AppResult<Vec<Persona>>;
    async fn find_by_id(&self, persona_id: i32) -> AppResult<Option<Persona>>;
}

pub struct PgPersonaRepository {
    pool: Arc<DbPool>,
}

impl PgPersonaRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonaRepository for PgPersonaRepository {
    async fn list_active(&self) -> AppResult<Vec<Persona>> {
        let pool = self.pool.as_ref();
        let personas = sqlx::query_as::<_, Persona>(
            "SELECT * FROM personas WHERE is_active = TRUE ORDER BY persona_id",
        )
        .fetch_all(pool)
        .await?;

        Ok(personas)
    }

    async fn find_by_id(&self, persona_id: i32) -> AppResult<Option<Persona>> {
        let pool = self.pool.as_ref();
        let persona = sqlx::query_as::<_, Persona>("SELECT * FROM personas WHERE persona_id = $1")
            .bind(persona_id)
            .fetch_optional(pool)
            .await?;

        Ok(persona)
    }
}
