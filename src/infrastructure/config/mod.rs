use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Bearer token expected on /api routes
    pub service_token: String,
    // ElevenLabs
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_model: String,
    // Volcengine
    pub volcengine_app_id: Option<String>,
    pub volcengine_access_token: Option<String>,
    pub volcengine_cluster: String,
    // Synthesized audio lands here and is served under /audio
    pub audio_dir: String,
    // Per-segment synthesis policy
    pub tts_call_timeout_secs: u64,
    pub tts_max_attempts: u32,
    pub tts_backoff_base_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            service_token: env::var("SERVICE_TOKEN")?,
            elevenlabs_api_key: env::var("ELEVENLABS_API_KEY").ok(),
            elevenlabs_model: env::var("ELEVENLABS_MODEL")
                .unwrap_or_else(|_| "eleven_multilingual_v2".to_string()),
            volcengine_app_id: env::var("VOLCENGINE_APP_ID").ok(),
            volcengine_access_token: env::var("VOLCENGINE_ACCESS_TOKEN").ok(),
            volcengine_cluster: env::var("VOLCENGINE_CLUSTER")
                .unwrap_or_else(|_| "volcano_tts".to_string()),
            audio_dir: env::var("AUDIO_DIR").unwrap_or_else(|_| "./audio".to_string()),
            tts_call_timeout_secs: env::var("TTS_CALL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            tts_max_attempts: env::var("TTS_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            tts_backoff_base_ms: env::var("TTS_BACKOFF_BASE_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
