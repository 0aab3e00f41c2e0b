//! Toyo Chat exchange server
//!
//! Serves `POST /api/ask`, relaying conversations to the completion provider.

use std::net::SocketAddr;
use std::sync::Arc;
use toyo_chat::api::{create_router, AppState};
use toyo_chat::config::Config;
use toyo_chat::llm::{LlmService, LoggingService, OpenAIService};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toyo_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;
    tracing::info!(config = ?config, "Loaded configuration");

    let preamble = config.preamble_source();
    if config.preamble_text.is_none() && !config.preamble_path.is_file() {
        tracing::warn!(
            path = %config.preamble_path.display(),
            "Lecture file not found; requests will use the fallback preamble until it appears"
        );
    }

    // Provider
    let provider = OpenAIService::new(
        config.provider_api_key.clone(),
        &config.provider_base_url,
        config.provider_timeout,
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(provider)));
    tracing::info!(model = %llm.model_id(), "Provider initialized");

    // Create router
    let state = AppState::new(llm, preamble);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Toyo Chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
