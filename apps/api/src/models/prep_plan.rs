use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrepPlanRow {
    pub id: Uuid,
    pub user_id: String,
    pub job_id: String,
    pub job_title: String,
    pub company_name: String,
    pub duration_weeks: i32,
    pub plan: Value,
    pub parsed_skills: Option<Value>,
    pub created_at: DateTime<Utc>,
}
