use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The identity shape returned to clients and attached to requests.
#[derive(Debug, Clone, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<UserRow> for UserIdentity {
    fn from(row: UserRow) -> Self {
        UserIdentity {
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}
