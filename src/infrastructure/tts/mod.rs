pub mod elevenlabs;
pub mod volcengine;

pub use elevenlabs::ElevenLabsProvider;
pub use volcengine::VolcengineProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::infrastructure::config::Config;

/// Tuning knobs forwarded to the provider. Unknown-to-a-provider fields are
/// ignored by that provider's adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisParams {
    pub speed: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub emotion: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    #[serde(default)]
    pub with_timestamps: bool,
}

/// Per-character alignment, when the provider returns one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharTimestamp {
    pub char: String,
    pub start_sec: f32,
    pub end_sec: f32,
}

/// A playable artifact produced by one synthesis call. Audio is always a
/// complete WAV payload regardless of what the vendor emits on the wire.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub audio: Vec<u8>,
    pub timestamps: Option<Vec<CharTimestamp>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TtsProviderError {
    #[error("{provider} returned HTTP {status}: {message}")]
    Http {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} credentials are not configured")]
    MissingCredentials { provider: &'static str },

    #[error("{provider} returned a malformed payload: {source}")]
    Malformed {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("request to TTS provider failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// One capability contract over heterogeneous synthesis back-ends.
///
/// Adapters are stateless per call: no retry, no caching. Retries and
/// timeouts belong to the caller. Every provider-side failure is normalized
/// into [`TtsProviderError`]; adapters never fail silently.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synthesize `text` with the provider voice `voice_id`.
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        params: &SynthesisParams,
    ) -> Result<SynthesizedAudio, TtsProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    ElevenLabs,
    Volcengine,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ElevenLabs => "elevenlabs",
            ProviderKind::Volcengine => "volcengine",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "elevenlabs" => Ok(ProviderKind::ElevenLabs),
            "volcengine" => Ok(ProviderKind::Volcengine),
            other => Err(format!("unknown TTS provider: {other}")),
        }
    }
}

/// Registry of configured providers, resolved once per task.
pub struct TtsProviderFactory {
    providers: HashMap<ProviderKind, Arc<dyn TtsProvider>>,
}

impl TtsProviderFactory {
    /// Build adapters for every provider the configuration carries
    /// credentials for. A provider without credentials is simply absent and
    /// surfaces as an error when a task asks for it.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let mut providers: HashMap<ProviderKind, Arc<dyn TtsProvider>> = HashMap::new();

        if let Some(api_key) = &config.elevenlabs_api_key {
            providers.insert(
                ProviderKind::ElevenLabs,
                Arc::new(ElevenLabsProvider::new(
                    client.clone(),
                    api_key.clone(),
                    config.elevenlabs_model.clone(),
                )),
            );
        }

        if let (Some(app_id), Some(access_token)) =
            (&config.volcengine_app_id, &config.volcengine_access_token)
        {
            providers.insert(
                ProviderKind::Volcengine,
                Arc::new(VolcengineProvider::new(
                    client,
                    app_id.clone(),
                    access_token.clone(),
                    config.volcengine_cluster.clone(),
                )),
            );
        }

        tracing::info!(
            elevenlabs = providers.contains_key(&ProviderKind::ElevenLabs),
            volcengine = providers.contains_key(&ProviderKind::Volcengine),
            "TTS providers configured"
        );

        Self { providers }
    }

    /// Registry from pre-built providers.
    pub fn from_providers(providers: HashMap<ProviderKind, Arc<dyn TtsProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider(&self, kind: ProviderKind) -> Result<Arc<dyn TtsProvider>, TtsProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(TtsProviderError::MissingCredentials {
                provider: kind.as_str(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_parses_provider_names_case_insensitively() {
        assert_eq!(
            "ElevenLabs".parse::<ProviderKind>().unwrap(),
            ProviderKind::ElevenLabs
        );
        assert_eq!(
            "volcengine".parse::<ProviderKind>().unwrap(),
            ProviderKind::Volcengine
        );
        assert!("polly".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn it_reports_missing_credentials_for_unconfigured_provider() {
        let factory = TtsProviderFactory::from_providers(HashMap::new());
        let err = factory.provider(ProviderKind::ElevenLabs).err().unwrap();
        assert!(matches!(
            err,
            TtsProviderError::MissingCredentials {
                provider: "elevenlabs"
            }
        ));
    }
}
