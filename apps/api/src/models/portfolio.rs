use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::resume::ResumeRow;

/// One portfolio per user. `slug` is only meaningful to the outside world
/// while `is_published` is true; unpublishing keeps the value as a memo so
/// republishing can reuse the same URL.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub social_links: Option<Json<SocialLinks>>,
    pub skills: Vec<String>,
    pub projects: Option<Json<Vec<PortfolioProject>>>,
    pub featured_resume_id: Option<Uuid>,
    pub theme: Option<Json<Theme>>,
    pub slug: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub palette: Option<Palette>,
    pub layout: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub accent: Option<String>,
}

/// Content fields a caller may send on upsert or publish. Absent fields
/// leave the stored values untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioContent {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub social_links: Option<SocialLinks>,
    pub skills: Option<Vec<String>>,
    pub projects: Option<Vec<PortfolioProject>>,
    pub featured_resume: Option<Uuid>,
    pub theme: Option<Theme>,
}

/// Owner-facing view: the record with the featured resume embedded, the
/// way saves and fetches return it to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioWithResume {
    #[serde(flatten)]
    pub portfolio: PortfolioRow,
    pub featured_resume: Option<ResumeRow>,
}

/// Public view of a published portfolio: the record plus the owner's
/// display name and the featured resume, resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPortfolio {
    #[serde(flatten)]
    pub portfolio: PortfolioRow,
    pub owner_name: String,
    pub featured_resume: Option<ResumeRow>,
}
