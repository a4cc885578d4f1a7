use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VideoPlanRow {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub videos: Value,
    pub completion_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
