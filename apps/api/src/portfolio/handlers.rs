use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::extract::AuthUser;
use crate::errors::AppError;
use crate::models::portfolio::{PortfolioContent, PortfolioRow, PortfolioWithResume, PublicPortfolio};
use crate::portfolio::publish::{self, PgPortfolioStore};
use crate::state::AppState;

/// GET /api/portfolio
/// The caller's portfolio with the featured resume embedded, or `null`
/// before the first save.
pub async fn handle_get_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Option<PortfolioWithResume>>, AppError> {
    let portfolio = match publish::find_by_owner(&state.db, user.id).await? {
        Some(row) => Some(publish::with_featured_resume(&state.db, row).await?),
        None => None,
    };
    Ok(Json(portfolio))
}

/// PUT /api/portfolio
/// Lazy upsert: the record is created the first time content is saved.
pub async fn handle_upsert_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
    Json(content): Json<PortfolioContent>,
) -> Result<Json<PortfolioWithResume>, AppError> {
    let row = publish::upsert_content(&state.db, user.id, &content).await?;
    Ok(Json(publish::with_featured_resume(&state.db, row).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub slug: Option<String>,
    #[serde(flatten)]
    pub content: PortfolioContent,
}

/// POST /api/portfolio/publish
pub async fn handle_publish(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PortfolioRow>, AppError> {
    let store = PgPortfolioStore { pool: &state.db };
    let portfolio = publish::publish(
        &store,
        &user,
        req.slug.as_deref(),
        &req.content,
        state.suffixes.as_ref(),
    )
    .await?;
    Ok(Json(portfolio))
}

/// POST /api/portfolio/unpublish
pub async fn handle_unpublish(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PortfolioRow>, AppError> {
    let store = PgPortfolioStore { pool: &state.db };
    let portfolio = publish::unpublish(&store, user.id).await?;
    Ok(Json(portfolio))
}

/// GET /api/portfolio/public/:slug — no auth.
pub async fn handle_get_public(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPortfolio>, AppError> {
    let portfolio = publish::public_lookup(&state.db, &slug).await?;
    Ok(Json(portfolio))
}
