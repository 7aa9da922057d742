use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::token;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

/// Authenticated caller, resolved from a bearer token. Extracting this
/// in a handler signature is what makes the route require auth.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let raw_token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

        let user_id =
            token::verify(raw_token, &state.config.jwt_secret).map_err(|_| AppError::Unauthorized)?;

        // Token subjects must still exist; a deleted account's tokens die with it.
        let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

        let user = user.ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            name: user.name,
            email: user.email,
        })
    }
}
