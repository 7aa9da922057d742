use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ai::prompts;
use crate::auth::extract::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImproveRequest {
    pub prompt: Option<String>,
    pub context: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntroRequest {
    #[serde(default)]
    pub skills: Vec<String>,
    pub profession: Option<String>,
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiContentResponse {
    pub content: String,
    pub is_fallback: bool,
}

/// Template response served when no API key is configured or the model
/// returned nothing.
fn fallback_response(prompt: &str) -> String {
    let preview: String = prompt.chars().take(120).collect();
    let ellipsis = if prompt.chars().count() > 120 { "..." } else { "" };

    [
        "AI key unavailable. Returning a template response.".to_string(),
        format!("Input preview: {preview}{ellipsis}"),
        String::new(),
        "\u{2022} Quantified accomplishment that highlights impact and includes key metrics."
            .to_string(),
        "\u{2022} Action-oriented statement describing responsibilities and outcomes.".to_string(),
        "\u{2022} Collaboration or leadership example showcasing soft skills.".to_string(),
    ]
    .join("\n")
}

fn build_intro_prompt(profession: &str, skills: &[String], tone: &str) -> String {
    let mut lines = vec![
        format!("Profession: {profession}"),
        format!("Tone: {tone}"),
    ];
    if !skills.is_empty() {
        lines.push(format!("Key skills: {}", skills.join(", ")));
    }
    lines.push(String::new());
    lines.push(
        "Write a concise 3-sentence professional bio suitable for portfolio landing page. \
         Highlight differentiation and include subtle call-to-action."
            .to_string(),
    );
    lines.join("\n")
}

/// POST /api/ai/improve
pub async fn handle_improve(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<ImproveRequest>,
) -> Result<Json<AiContentResponse>, AppError> {
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;

    let system = req.context.as_deref().unwrap_or(prompts::IMPROVE_SYSTEM);

    let generated = state
        .ai
        .generate(&prompt, system, req.model.as_deref())
        .await
        .map_err(|e| AppError::Ai(e.to_string()))?;

    Ok(Json(match generated {
        Some(content) => AiContentResponse {
            content,
            is_fallback: false,
        },
        None => AiContentResponse {
            content: fallback_response(&prompt),
            is_fallback: true,
        },
    }))
}

/// POST /api/ai/portfolio-intro
pub async fn handle_portfolio_intro(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<IntroRequest>,
) -> Result<Json<AiContentResponse>, AppError> {
    let profession = req
        .profession
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Profession is required".to_string()))?;

    let tone = req.tone.as_deref().unwrap_or("professional");
    let prompt = build_intro_prompt(&profession, &req.skills, tone);

    let generated = state
        .ai
        .generate(&prompt, prompts::INTRO_SYSTEM, None)
        .await
        .map_err(|e| AppError::Ai(e.to_string()))?;

    Ok(Json(match generated {
        Some(content) => AiContentResponse {
            content,
            is_fallback: false,
        },
        None => AiContentResponse {
            content: fallback_response(&prompt),
            is_fallback: true,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_truncates_long_prompts() {
        let long = "x".repeat(200);
        let out = fallback_response(&long);
        assert!(out.contains("AI key unavailable"));
        assert!(out.contains(&format!("{}...", "x".repeat(120))));
    }

    #[test]
    fn fallback_keeps_short_prompts_whole() {
        let out = fallback_response("improve my summary");
        assert!(out.contains("Input preview: improve my summary\n"));
        assert!(!out.contains("improve my summary..."));
    }

    #[test]
    fn intro_prompt_skips_empty_skills_line() {
        let with = build_intro_prompt("Engineer", &["Rust".to_string()], "bold");
        assert!(with.contains("Key skills: Rust"));

        let without = build_intro_prompt("Engineer", &[], "bold");
        assert!(!without.contains("Key skills"));
        assert!(without.starts_with("Profession: Engineer\nTone: bold"));
    }
}
