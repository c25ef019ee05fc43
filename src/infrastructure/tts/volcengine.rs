use super::{CharTimestamp, SynthesisParams, SynthesizedAudio, TtsProvider, TtsProviderError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const PROVIDER_NAME: &str = "volcengine";
const DEFAULT_BASE_URL: &str = "https://openspeech.bytedance.com";

/// Volcengine success code for a finished one-shot synthesis.
const CODE_SUCCESS: i32 = 3000;

/// Volcengine (Doubao/openspeech) implementation of the TTS provider
/// contract. One-shot `query` synthesis against `/api/v1/tts`; audio comes
/// back base64-encoded in the JSON envelope, timestamps (when requested)
/// ride in the `addition.frontend` field.
pub struct VolcengineProvider {
    client: reqwest::Client,
    app_id: String,
    access_token: String,
    cluster: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct VolcResponse {
    code: i32,
    #[serde(default)]
    message: String,
    data: Option<String>,
    addition: Option<VolcAddition>,
}

#[derive(Debug, Deserialize)]
struct VolcAddition {
    frontend: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Frontend {
    #[serde(default)]
    words: Vec<FrontendWord>,
}

#[derive(Debug, Deserialize)]
struct FrontendWord {
    word: String,
    start_time: f32,
    end_time: f32,
}

impl VolcengineProvider {
    pub fn new(
        client: reqwest::Client,
        app_id: String,
        access_token: String,
        cluster: String,
    ) -> Self {
        Self {
            client,
            app_id,
            access_token,
            cluster,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    fn build_body(&self, text: &str, voice_id: &str, params: &SynthesisParams) -> serde_json::Value {
        let mut audio = json!({
            "voice_type": voice_id,
            "encoding": "wav",
            "speed_ratio": params.speed.unwrap_or(1.0),
            "volume_ratio": params.volume.unwrap_or(1.0),
            "pitch_ratio": params.pitch.unwrap_or(1.0),
        });
        if let Some(emotion) = &params.emotion {
            audio["emotion"] = json!(emotion);
        }

        let mut request = json!({
            "reqid": Uuid::new_v4().to_string(),
            "text": text,
            "operation": "query",
        });
        if params.with_timestamps {
            request["with_frontend"] = json!(1);
            request["frontend_type"] = json!("unitTson");
        }

        json!({
            "app": {
                "appid": self.app_id,
                "token": self.access_token,
                "cluster": self.cluster,
            },
            "user": { "uid": "podforge" },
            "audio": audio,
            "request": request,
        })
    }

    fn parse_timestamps(frontend: &str) -> Result<Vec<CharTimestamp>, TtsProviderError> {
        let frontend: Frontend =
            serde_json::from_str(frontend).map_err(|e| TtsProviderError::Malformed {
                provider: PROVIDER_NAME,
                source: anyhow::Error::from(e),
            })?;

        Ok(frontend
            .words
            .into_iter()
            .map(|w| CharTimestamp {
                char: w.word,
                start_sec: w.start_time,
                end_sec: w.end_time,
            })
            .collect())
    }
}

#[async_trait]
impl TtsProvider for VolcengineProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        params: &SynthesisParams,
    ) -> Result<SynthesizedAudio, TtsProviderError> {
        let url = format!("{}/api/v1/tts", self.base_url);

        tracing::info!(
            voice_type = voice_id,
            cluster = %self.cluster,
            with_timestamps = params.with_timestamps,
            text_length = text.len(),
            "Calling Volcengine TTS"
        );

        let response = self
            .client
            .post(&url)
            // Volcengine's non-standard bearer scheme, semicolon included
            .header("Authorization", format!("Bearer;{}", self.access_token))
            .json(&self.build_body(text, voice_id, params))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                voice_type = voice_id,
                message = %message,
                "Volcengine synthesis failed"
            );
            return Err(TtsProviderError::Http {
                provider: PROVIDER_NAME,
                status: status.as_u16(),
                message,
            });
        }

        let payload: VolcResponse =
            response.json().await.map_err(|e| TtsProviderError::Malformed {
                provider: PROVIDER_NAME,
                source: anyhow::Error::from(e),
            })?;

        if payload.code != CODE_SUCCESS {
            tracing::error!(
                code = payload.code,
                message = %payload.message,
                voice_type = voice_id,
                "Volcengine returned error code"
            );
            return Err(TtsProviderError::Http {
                provider: PROVIDER_NAME,
                status: status.as_u16(),
                message: format!("code {}: {}", payload.code, payload.message),
            });
        }

        let data = payload.data.ok_or_else(|| TtsProviderError::Malformed {
            provider: PROVIDER_NAME,
            source: anyhow::anyhow!("success response carried no audio data"),
        })?;

        let audio = BASE64.decode(data).map_err(|e| TtsProviderError::Malformed {
            provider: PROVIDER_NAME,
            source: anyhow::Error::from(e),
        })?;

        let timestamps = payload
            .addition
            .and_then(|a| a.frontend)
            .map(|f| Self::parse_timestamps(&f))
            .transpose()?;

        tracing::debug!(audio_size = audio.len(), "Volcengine audio received");

        Ok(SynthesizedAudio { audio, timestamps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider() -> VolcengineProvider {
        VolcengineProvider::new(
            reqwest::Client::new(),
            "app-1".into(),
            "token-1".into(),
            "volcano_tts".into(),
        )
    }

    #[test]
    fn it_builds_body_with_credentials_and_defaults() {
        let body = provider().build_body("你好", "zh_female_1", &SynthesisParams::default());

        assert_eq!(body["app"]["appid"], "app-1");
        assert_eq!(body["app"]["cluster"], "volcano_tts");
        assert_eq!(body["audio"]["voice_type"], "zh_female_1");
        assert_eq!(body["audio"]["encoding"], "wav");
        assert_eq!(body["audio"]["speed_ratio"], 1.0);
        assert_eq!(body["request"]["operation"], "query");
        assert!(body["request"].get("with_frontend").is_none());
    }

    #[test]
    fn it_forwards_tuning_and_timestamp_flags() {
        let params = SynthesisParams {
            speed: Some(1.3),
            pitch: Some(0.9),
            volume: Some(1.1),
            emotion: Some("happy".into()),
            with_timestamps: true,
            ..Default::default()
        };
        let body = provider().build_body("text", "voice", &params);

        assert_eq!(body["audio"]["speed_ratio"], 1.3);
        assert_eq!(body["audio"]["pitch_ratio"], 0.9);
        assert_eq!(body["audio"]["volume_ratio"], 1.1);
        assert_eq!(body["audio"]["emotion"], "happy");
        assert_eq!(body["request"]["with_frontend"], 1);
        assert_eq!(body["request"]["frontend_type"], "unitTson");
    }

    #[test]
    fn it_parses_frontend_words_into_timestamps() {
        let frontend = r#"{"words":[{"word":"你","start_time":0.0,"end_time":0.25},{"word":"好","start_time":0.25,"end_time":0.5}]}"#;
        let timestamps = VolcengineProvider::parse_timestamps(frontend).unwrap();

        assert_eq!(timestamps.len(), 2);
        assert_eq!(timestamps[0].char, "你");
        assert_eq!(timestamps[1].end_sec, 0.5);
    }

    #[test]
    fn it_rejects_unparseable_frontend_payload() {
        let err = VolcengineProvider::parse_timestamps("not json").unwrap_err();
        assert!(matches!(err, TtsProviderError::Malformed { .. }));
    }
}
