use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::types::Json as Jsonb;
use uuid::Uuid;

use crate::auth::extract::AuthUser;
use crate::errors::AppError;
use crate::models::resume::{
    AiMetadata, Education, Experience, PersonalInfo, ResumeProject, ResumeRow,
};
use crate::state::AppState;

/// Writable resume fields. Absent fields keep their stored values on
/// update; on create they start from defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInput {
    pub title: Option<String>,
    pub personal_info: Option<PersonalInfo>,
    pub experiences: Option<Vec<Experience>>,
    pub education: Option<Vec<Education>>,
    pub skills: Option<Vec<String>>,
    pub projects: Option<Vec<ResumeProject>>,
    pub ai_metadata: Option<AiMetadata>,
}

/// GET /api/resumes — the caller's resumes, most recently edited first.
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let resumes = sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(resumes))
}

/// GET /api/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume: Option<ResumeRow> =
        sqlx::query_as("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?;

    resume
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

/// POST /api/resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ResumeInput>,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let title = input
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("title is required".to_string()))?;

    let resume = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes
            (user_id, title, personal_info, experiences, education, skills, projects, ai_metadata)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, '{}'::text[]), $7, $8)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(title)
    .bind(input.personal_info.map(Jsonb))
    .bind(input.experiences.map(Jsonb))
    .bind(input.education.map(Jsonb))
    .bind(&input.skills)
    .bind(input.projects.map(Jsonb))
    .bind(input.ai_metadata.map(Jsonb))
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(resume)))
}

/// PUT /api/resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ResumeInput>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume: Option<ResumeRow> = sqlx::query_as(
        r#"
        UPDATE resumes SET
            title = COALESCE($3, title),
            personal_info = COALESCE($4, personal_info),
            experiences = COALESCE($5, experiences),
            education = COALESCE($6, education),
            skills = COALESCE($7, skills),
            projects = COALESCE($8, projects),
            ai_metadata = COALESCE($9, ai_metadata),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.id)
    .bind(&input.title)
    .bind(input.personal_info.map(Jsonb))
    .bind(input.experiences.map(Jsonb))
    .bind(input.education.map(Jsonb))
    .bind(&input.skills)
    .bind(input.projects.map(Jsonb))
    .bind(input.ai_metadata.map(Jsonb))
    .fetch_optional(&state.db)
    .await?;

    resume
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

/// DELETE /api/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let deleted: Option<Uuid> =
        sqlx::query_scalar("DELETE FROM resumes WHERE id = $1 AND user_id = $2 RETURNING id")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?;

    if deleted.is_none() {
        return Err(AppError::NotFound("Resume not found".to_string()));
    }

    Ok(Json(json!({ "message": "Resume deleted successfully" })))
}
