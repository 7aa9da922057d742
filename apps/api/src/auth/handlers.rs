use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::extract::AuthUser;
use crate::auth::{password, token};
use crate::errors::AppError;
use crate::models::user::{UserIdentity, UserRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserIdentity,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserIdentity,
}

fn require_field(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = require_field(req.name, "name")?;
    let email = require_field(req.email, "email")?;
    let plain = require_field(req.password, "password")?;

    let password_hash = password::hash(&plain)?;

    // The unique constraint on email is authoritative; no pre-check.
    let inserted = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await;

    let user = match inserted {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    let token = token::issue(user.id, &state.config.jwt_secret, state.config.jwt_expires_in_hours)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = require_field(req.email, "email")?;
    let plain = require_field(req.password, "password")?;

    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;

    // Same response for unknown email and bad password.
    let user = user.ok_or(AppError::Unauthorized)?;
    if !password::verify(&plain, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let token = token::issue(user.id, &state.config.jwt_secret, state.config.jwt_expires_in_hours)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/auth/profile
pub async fn handle_profile(user: AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: UserIdentity {
            id: user.id,
            name: user.name,
            email: user.email,
        },
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
