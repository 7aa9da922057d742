mod ai;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod portfolio;
mod resumes;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::portfolio::slug::RandomSuffix;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize Gemini client; runs in fallback mode without a key
    let ai = GeminiClient::new(config.gemini_api_key.clone());
    if ai.is_configured() {
        info!("Gemini client initialized (default model: {})", ai::DEFAULT_MODEL);
    } else {
        info!("GEMINI_API_KEY not set; AI endpoints will serve template responses");
    }

    let cors = build_cors(&config)?;

    // Build app state
    let state = AppState {
        db,
        ai,
        config: config.clone(),
        suffixes: Arc::new(RandomSuffix),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Restricts CORS to CLIENT_URL when configured, otherwise stays open
/// for local development.
fn build_cors(config: &Config) -> Result<CorsLayer> {
    Ok(match &config.client_url {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    })
}
