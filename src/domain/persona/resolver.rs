use crate::domain::persona::Persona;
use crate::error::AppResult;
use crate::infrastructure::repositories::PersonaRepository;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Persona list freshness window.
const PERSONA_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const CACHE_KEY: u8 = 0;

/// Maps script speakers to TTS personas.
///
/// Keeps a single time-boxed copy of the active persona list so resolving a
/// whole script does not refetch per segment. The cache can be dropped
/// explicitly via [`PersonaResolver::invalidate`] after persona edits.
pub struct PersonaResolver {
    persona_repo: Arc<dyn PersonaRepository>,
    cache: Cache<u8, Arc<Vec<Persona>>>,
}

impl PersonaResolver {
    pub fn new(persona_repo: Arc<dyn PersonaRepository>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(PERSONA_CACHE_TTL)
            .build();

        Self {
            persona_repo,
            cache,
        }
    }

    /// Resolve a speaker to a persona with a usable voice identifier.
    ///
    /// An explicit persona id wins over name matching. Name matching is
    /// case-insensitive against the cached active persona list. Returns
    /// `None` when nothing matches or the match carries no voice id; callers
    /// treat that as a per-segment skip, not a failure.
    pub async fn resolve_speaker(
        &self,
        speaker_name: &str,
        explicit_persona_id: Option<i32>,
    ) -> AppResult<Option<Persona>> {
        if let Some(persona_id) = explicit_persona_id {
            let persona = self.persona_repo.find_by_id(persona_id).await?;
            return Ok(match persona {
                Some(p) if p.voice_id().is_some() => Some(p),
                Some(p) => {
                    tracing::warn!(
                        persona_id = p.persona_id,
                        persona_name = %p.name,
                        "Persona has no voice identifier, skipping"
                    );
                    None
                }
                None => {
                    tracing::warn!(persona_id, "Requested persona does not exist");
                    None
                }
            });
        }

        let personas = self.active_personas().await?;
        let matched = personas
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(speaker_name) && p.voice_id().is_some())
            .cloned();

        if matched.is_none() {
            tracing::warn!(speaker_name, "No persona matches speaker");
        }

        Ok(matched)
    }

    /// List personas declaring support for `language_code`, up to `limit`.
    ///
    /// Fail-open: when no persona declares the language, the unfiltered
    /// active list is returned instead of an empty one, so synthesis does not
    /// hard-fail on a missing language tag alone.
    pub async fn list_by_language(
        &self,
        language_code: &str,
        limit: usize,
    ) -> AppResult<Vec<Persona>> {
        let personas = self.active_personas().await?;

        let filtered: Vec<Persona> = personas
            .iter()
            .filter(|p| p.supports_language(language_code))
            .take(limit)
            .cloned()
            .collect();

        if !filtered.is_empty() {
            return Ok(filtered);
        }

        tracing::warn!(
            language_code,
            available = personas.len(),
            "No persona declares language support, falling back to unfiltered list"
        );

        Ok(personas.iter().take(limit).cloned().collect())
    }

    /// Drop the cached persona list, forcing a refetch on next use.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&CACHE_KEY).await;
    }

    async fn active_personas(&self) -> AppResult<Arc<Vec<Persona>>> {
        if let Some(cached) = self.cache.get(&CACHE_KEY).await {
            return Ok(cached);
        }

        let personas = Arc::new(self.persona_repo.list_active().await?);
        tracing::debug!(count = personas.len(), "Persona list refreshed");
        self.cache.insert(CACHE_KEY, personas.clone()).await;

        Ok(personas)
    }
}
