use std::sync::Arc;

use sqlx::PgPool;

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::portfolio::slug::SuffixSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub ai: GeminiClient,
    pub config: Config,
    /// Random-token source for the synthetic slug fallback. Injected so
    /// tests can pin the output.
    pub suffixes: Arc<dyn SuffixSource>,
}
