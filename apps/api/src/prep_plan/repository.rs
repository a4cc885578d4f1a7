use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::job::Job;
use crate::models::prep_plan::PrepPlanRow;
use crate::prep_plan::generator::PrepPlan;
use crate::prep_plan::jd_parser::ParsedSkills;

pub async fn insert_plan(
    pool: &PgPool,
    user_id: &str,
    job: &Job,
    plan: &PrepPlan,
    parsed: Option<&ParsedSkills>,
) -> Result<PrepPlanRow, sqlx::Error> {
    let row: PrepPlanRow = sqlx::query_as(
        r#"
        INSERT INTO prep_plans
            (id, user_id, job_id, job_title, company_name, duration_weeks, plan, parsed_skills)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&job.id)
    .bind(&job.title)
    .bind(&job.company_name)
    .bind(plan.overview.estimated_time_weeks as i32)
    .bind(Json(plan))
    .bind(parsed.map(Json))
    .fetch_one(pool)
    .await?;

    info!("Saved prep plan {} for {user_id} (job {})", row.id, job.id);
    Ok(row)
}

/// The user's plans, newest first.
pub async fn list_plans(pool: &PgPool, user_id: &str) -> Result<Vec<PrepPlanRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM prep_plans WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn find_plan(pool: &PgPool, id: Uuid) -> Result<Option<PrepPlanRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM prep_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_plan(pool: &PgPool, id: Uuid, plan: &PrepPlan) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE prep_plans SET plan = $2 WHERE id = $1")
        .bind(id)
        .bind(Json(plan))
        .execute(pool)
        .await?;
    Ok(())
}

/// Rebuilds the plan stored in a row. `None` when the payload is unreadable.
pub fn plan_from_row(row: &PrepPlanRow) -> Option<PrepPlan> {
    let mut plan: PrepPlan = serde_json::from_value(row.plan.clone())
        .map_err(|e| warn!("Stored prep plan {} is unreadable: {e}", row.id))
        .ok()?;
    plan.refresh_overview();
    Some(plan)
}
