//! Gemini client — the single point of entry for generative-text calls.
//!
//! The API key is optional. Without one, `generate` returns `Ok(None)`
//! and the handlers serve a static template response instead, so the
//! rest of the application never needs to care whether AI is configured.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod handlers;
pub mod prompts;

const API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<OwnedPart>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct OwnedPart {
    text: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Calls the generateContent endpoint. `Ok(None)` means either no
    /// API key is configured or the model returned nothing usable —
    /// callers fall back to template text in both cases.
    pub async fn generate(
        &self,
        prompt: &str,
        system: &str,
        model: Option<&str>,
    ) -> Result<Option<String>, AiError> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };

        let model = model.unwrap_or(DEFAULT_MODEL);
        let url = format!("{API_ENDPOINT}/{model}:generateContent?key={api_key}");

        let body = GenerateRequest {
            system_instruction: Content {
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        debug!("Calling Gemini model {model}");

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(text)
    }
}
