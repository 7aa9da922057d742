pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers as ai;
use crate::auth::handlers as auth;
use crate::portfolio::handlers as portfolio;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/auth/register", post(auth::handle_register))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/profile", get(auth::handle_profile))
        // Resumes
        .route(
            "/api/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route(
            "/api/resumes/:id",
            get(resumes::handle_get_resume)
                .put(resumes::handle_update_resume)
                .delete(resumes::handle_delete_resume),
        )
        // Portfolio
        .route(
            "/api/portfolio",
            get(portfolio::handle_get_portfolio).put(portfolio::handle_upsert_portfolio),
        )
        .route("/api/portfolio/publish", post(portfolio::handle_publish))
        .route("/api/portfolio/unpublish", post(portfolio::handle_unpublish))
        .route("/api/portfolio/public/:slug", get(portfolio::handle_get_public))
        // AI assist
        .route("/api/ai/improve", post(ai::handle_improve))
        .route("/api/ai/portfolio-intro", post(ai::handle_portfolio_intro))
        .with_state(state)
}
