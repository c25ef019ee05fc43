use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podforge_backend::domain::merge::MergeService;
use podforge_backend::domain::persona::PersonaResolver;
use podforge_backend::domain::synthesis::{RetryPolicy, StatusReporter, SynthesisEngine};
use podforge_backend::infrastructure::config::{Config, LogFormat};
use podforge_backend::infrastructure::db::{check_connection, create_pool};
use podforge_backend::infrastructure::http::start_http_server;
use podforge_backend::infrastructure::repositories::{
    PgPersonaRepository, PgPodcastRepository, PgSegmentAudioRepository, PgTaskRepository,
};
use podforge_backend::infrastructure::storage::LocalAudioStorage;
use podforge_backend::infrastructure::tts::TtsProviderFactory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting PodForge Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories (inject db pool)
    tracing::info!("Instantiating repositories...");
    let persona_repo = Arc::new(PgPersonaRepository::new(pool.clone()));
    let podcast_repo = Arc::new(PgPodcastRepository::new(pool.clone()));
    let segment_audio_repo = Arc::new(PgSegmentAudioRepository::new(pool.clone()));
    let task_repo = Arc::new(PgTaskRepository::new(pool.clone()));

    // 2. Instantiate TTS providers and audio storage
    tracing::info!("Instantiating TTS providers...");
    let http_client = reqwest::Client::new();
    let providers = Arc::new(TtsProviderFactory::from_config(&config, http_client));
    let storage = Arc::new(LocalAudioStorage::new(config.audio_dir.clone()));

    // 3. Instantiate services (inject repositories and providers)
    tracing::info!("Instantiating services...");
    let resolver = Arc::new(PersonaResolver::new(persona_repo.clone()));
    let retry = RetryPolicy {
        max_attempts: config.tts_max_attempts,
        base_backoff: std::time::Duration::from_millis(config.tts_backoff_base_ms),
        call_timeout: std::time::Duration::from_secs(config.tts_call_timeout_secs),
    };
    let engine = Arc::new(SynthesisEngine::new(
        task_repo.clone(),
        podcast_repo.clone(),
        segment_audio_repo.clone(),
        resolver,
        providers,
        storage.clone(),
        retry,
    ));
    let reporter = Arc::new(StatusReporter::new(task_repo.clone()));
    let merge_service = Arc::new(MergeService::new(
        podcast_repo.clone(),
        segment_audio_repo.clone(),
        storage,
    ));

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let synthesis_controller = Arc::new(
        podforge_backend::controllers::SynthesisController::new(engine, reporter),
    );
    let merge_controller =
        Arc::new(podforge_backend::controllers::MergeController::new(merge_service));

    // Start HTTP server with all routes
    start_http_server(pool, config, synthesis_controller, merge_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "podforge_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "podforge_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
