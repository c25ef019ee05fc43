use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::{
    controllers::{health, MergeController, SynthesisController},
    infrastructure::auth::{auth_middleware, request_id_middleware},
};

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    synthesis_controller: Arc<SynthesisController>,
    merge_controller: Arc<MergeController>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Synthesis routes (need auth)
    let synthesis_routes = Router::new()
        .route("/api/synthesize", post(SynthesisController::synthesize))
        .route(
            "/api/synthesis-status/:taskId",
            get(SynthesisController::get_status),
        )
        .route(
            "/api/continue-synthesis",
            post(SynthesisController::continue_synthesis),
        )
        .route(
            "/api/resynthesize-segment",
            post(SynthesisController::resynthesize_segment),
        )
        .with_state(synthesis_controller.clone())
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    // Merge route (needs auth)
    let merge_routes = Router::new()
        .route("/api/merge-audio", post(MergeController::merge_audio))
        .with_state(merge_controller.clone())
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    // Build application routes
    let app = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool.clone())
        .merge(synthesis_routes)
        .merge(merge_routes)
        // Synthesized artifacts are served straight off the audio directory
        .nest_service("/audio", ServeDir::new(&config.audio_dir))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
