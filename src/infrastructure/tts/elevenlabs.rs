use super::{CharTimestamp, SynthesisParams, SynthesizedAudio, TtsProvider, TtsProviderError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;

const PROVIDER_NAME: &str = "elevenlabs";
const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Raw PCM keeps the adapter codec-free; the WAV header is added locally.
const OUTPUT_FORMAT: &str = "pcm_22050";
const SAMPLE_RATE: u32 = 22050;

/// ElevenLabs implementation of the TTS provider contract.
///
/// Plain synthesis posts to `/v1/text-to-speech/{voice}`; when per-character
/// alignment is requested the `/with-timestamps` variant is used, which
/// returns base64 audio plus character timing arrays.
pub struct ElevenLabsProvider {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TimestampResponse {
    audio_base64: String,
    alignment: Option<Alignment>,
}

#[derive(Debug, Deserialize)]
struct Alignment {
    characters: Vec<String>,
    character_start_times_seconds: Vec<f32>,
    character_end_times_seconds: Vec<f32>,
}

impl ElevenLabsProvider {
    pub fn new(client: reqwest::Client, api_key: String, model_id: String) -> Self {
        Self {
            client,
            api_key,
            model_id,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    fn build_body(&self, text: &str, params: &SynthesisParams) -> serde_json::Value {
        let mut voice_settings = json!({
            "stability": params.stability.unwrap_or(0.5),
            "similarity_boost": params.similarity_boost.unwrap_or(0.75),
        });
        if let Some(speed) = params.speed {
            voice_settings["speed"] = json!(speed);
        }

        json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": voice_settings,
        })
    }

    fn convert_alignment(alignment: Alignment) -> Result<Vec<CharTimestamp>, TtsProviderError> {
        let Alignment {
            characters,
            character_start_times_seconds,
            character_end_times_seconds,
        } = alignment;

        if characters.len() != character_start_times_seconds.len()
            || characters.len() != character_end_times_seconds.len()
        {
            return Err(TtsProviderError::Malformed {
                provider: PROVIDER_NAME,
                source: anyhow::anyhow!(
                    "alignment arrays disagree: {} chars, {} starts, {} ends",
                    characters.len(),
                    character_start_times_seconds.len(),
                    character_end_times_seconds.len()
                ),
            });
        }

        Ok(characters
            .into_iter()
            .zip(character_start_times_seconds)
            .zip(character_end_times_seconds)
            .map(|((char, start_sec), end_sec)| CharTimestamp {
                char,
                start_sec,
                end_sec,
            })
            .collect())
    }

    /// Wrap raw 16-bit mono PCM into a WAV container.
    fn pcm_to_wav(pcm: &[u8]) -> Result<Vec<u8>, TtsProviderError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).map_err(|e| TtsProviderError::Malformed {
                    provider: PROVIDER_NAME,
                    source: anyhow::Error::from(e),
                })?;
            for chunk in pcm.chunks_exact(2) {
                let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
                writer
                    .write_sample(sample)
                    .map_err(|e| TtsProviderError::Malformed {
                        provider: PROVIDER_NAME,
                        source: anyhow::Error::from(e),
                    })?;
            }
            writer.finalize().map_err(|e| TtsProviderError::Malformed {
                provider: PROVIDER_NAME,
                source: anyhow::Error::from(e),
            })?;
        }

        Ok(cursor.into_inner())
    }
}

#[async_trait]
impl TtsProvider for ElevenLabsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        params: &SynthesisParams,
    ) -> Result<SynthesizedAudio, TtsProviderError> {
        let path_suffix = if params.with_timestamps {
            "/with-timestamps"
        } else {
            ""
        };
        let url = format!(
            "{}/v1/text-to-speech/{}{}?output_format={}",
            self.base_url, voice_id, path_suffix, OUTPUT_FORMAT
        );

        tracing::info!(
            voice_id,
            model_id = %self.model_id,
            with_timestamps = params.with_timestamps,
            text_length = text.len(),
            "Calling ElevenLabs text-to-speech"
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&self.build_body(text, params))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                voice_id,
                message = %message,
                "ElevenLabs synthesis failed"
            );
            return Err(TtsProviderError::Http {
                provider: PROVIDER_NAME,
                status: status.as_u16(),
                message,
            });
        }

        if params.with_timestamps {
            let payload: TimestampResponse =
                response.json().await.map_err(|e| TtsProviderError::Malformed {
                    provider: PROVIDER_NAME,
                    source: anyhow::Error::from(e),
                })?;

            let pcm = BASE64.decode(payload.audio_base64).map_err(|e| {
                TtsProviderError::Malformed {
                    provider: PROVIDER_NAME,
                    source: anyhow::Error::from(e),
                }
            })?;

            let timestamps = payload
                .alignment
                .map(Self::convert_alignment)
                .transpose()?;

            return Ok(SynthesizedAudio {
                audio: Self::pcm_to_wav(&pcm)?,
                timestamps,
            });
        }

        let pcm = response.bytes().await?;
        tracing::debug!(audio_size = pcm.len(), "ElevenLabs audio received");

        Ok(SynthesizedAudio {
            audio: Self::pcm_to_wav(&pcm)?,
            timestamps: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_builds_body_with_default_voice_settings() {
        let provider = ElevenLabsProvider::new(
            reqwest::Client::new(),
            "key".into(),
            "eleven_multilingual_v2".into(),
        );
        let body = provider.build_body("hello", &SynthesisParams::default());

        assert_eq!(body["text"], "hello");
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["stability"], 0.5);
        assert_eq!(body["voice_settings"]["similarity_boost"], 0.75);
        assert!(body["voice_settings"].get("speed").is_none());
    }

    #[test]
    fn it_forwards_tuning_params_into_voice_settings() {
        let provider =
            ElevenLabsProvider::new(reqwest::Client::new(), "key".into(), "model".into());
        let params = SynthesisParams {
            speed: Some(1.2),
            stability: Some(0.9),
            similarity_boost: Some(0.4),
            ..Default::default()
        };
        let body = provider.build_body("hi", &params);

        assert_eq!(body["voice_settings"]["speed"], 1.2);
        assert_eq!(body["voice_settings"]["stability"], 0.9);
        assert_eq!(body["voice_settings"]["similarity_boost"], 0.4);
    }

    #[test]
    fn it_converts_alignment_arrays_to_timestamps() {
        let alignment = Alignment {
            characters: vec!["h".into(), "i".into()],
            character_start_times_seconds: vec![0.0, 0.1],
            character_end_times_seconds: vec![0.1, 0.2],
        };

        let timestamps = ElevenLabsProvider::convert_alignment(alignment).unwrap();
        assert_eq!(timestamps.len(), 2);
        assert_eq!(timestamps[1].char, "i");
        assert_eq!(timestamps[1].start_sec, 0.1);
        assert_eq!(timestamps[1].end_sec, 0.2);
    }

    #[test]
    fn it_rejects_mismatched_alignment_arrays() {
        let alignment = Alignment {
            characters: vec!["h".into(), "i".into()],
            character_start_times_seconds: vec![0.0],
            character_end_times_seconds: vec![0.1, 0.2],
        };

        let err = ElevenLabsProvider::convert_alignment(alignment).unwrap_err();
        assert!(matches!(err, TtsProviderError::Malformed { .. }));
    }

    #[test]
    fn it_wraps_pcm_into_a_readable_wav() {
        // 22050 samples of silence = exactly one second
        let pcm = vec![0u8; (SAMPLE_RATE as usize) * 2];
        let wav = ElevenLabsProvider::pcm_to_wav(&pcm).unwrap();

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(reader.duration(), SAMPLE_RATE);
    }
}
