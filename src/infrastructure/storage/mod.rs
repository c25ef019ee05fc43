use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::PathBuf;

/// Public URL prefix under which stored audio is served.
pub const AUDIO_URL_PREFIX: &str = "/audio/";

/// Where synthesized audio bytes live.
///
/// `store` returns the public URL the artifact is reachable under; that URL
/// is what lands in `segment_audios.audio_url` and in task results.
#[async_trait]
pub trait AudioStorage: Send + Sync {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> AppResult<String>;
    async fn load(&self, audio_url: &str) -> AppResult<Vec<u8>>;
}

/// Filesystem-backed storage, served by the HTTP layer under `/audio`.
pub struct LocalAudioStorage {
    root: PathBuf,
}

impl LocalAudioStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, file_name: &str) -> AppResult<PathBuf> {
        // Reject anything that could escape the audio directory.
        if file_name.contains('/') || file_name.contains("..") {
            return Err(AppError::BadRequest(format!(
                "invalid audio file name: {file_name}"
            )));
        }
        Ok(self.root.join(file_name))
    }
}

#[async_trait]
impl AudioStorage for LocalAudioStorage {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        let path = self.path_for(file_name)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("cannot create audio dir: {e}")))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("cannot write audio file: {e}")))?;

        tracing::debug!(file = %path.display(), size = bytes.len(), "Audio artifact stored");

        Ok(format!("{AUDIO_URL_PREFIX}{file_name}"))
    }

    async fn load(&self, audio_url: &str) -> AppResult<Vec<u8>> {
        let file_name = audio_url
            .strip_prefix(AUDIO_URL_PREFIX)
            .ok_or_else(|| AppError::BadRequest(format!("unexpected audio url: {audio_url}")))?;
        let path = self.path_for(file_name)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(format!(
                "audio artifact {audio_url} does not exist"
            ))),
            Err(e) => Err(AppError::Internal(format!("cannot read audio file: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn temp_storage() -> LocalAudioStorage {
        LocalAudioStorage::new(std::env::temp_dir().join(format!("podforge-{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn it_stores_and_loads_round_trip() {
        let storage = temp_storage();
        let url = storage.store("seg-0.wav", b"RIFF-data").await.unwrap();
        assert_eq!(url, "/audio/seg-0.wav");

        let bytes = storage.load(&url).await.unwrap();
        assert_eq!(bytes, b"RIFF-data");
    }

    #[tokio::test]
    async fn it_reports_not_found_for_missing_artifact() {
        let storage = temp_storage();
        let err = storage.load("/audio/nope.wav").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn it_rejects_path_traversal() {
        let storage = temp_storage();
        assert!(storage.store("../evil.wav", b"x").await.is_err());
        assert!(storage.load("/audio/../evil.wav").await.is_err());
    }
}
