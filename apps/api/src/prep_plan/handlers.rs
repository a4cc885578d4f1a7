use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::backend::bearer_token;
use crate::errors::AppError;
use crate::models::job::Job;
use crate::models::prep_plan::PrepPlanRow;
use crate::prep_plan::generator::{generate_prep_plan, validate_weeks, PrepPlan, DEFAULT_WEEKS};
use crate::prep_plan::jd_parser::{parse_job_description, ParsedSkills};
use crate::prep_plan::repository;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub job_id: String,
    #[serde(default)]
    pub duration_weeks: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job: Job,
    pub parsed_skills: ParsedSkills,
    pub plan: PrepPlan,
    pub progress: f64,
}

/// POST /api/v1/prep-plans/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let weeks = validate_weeks(req.duration_weeks.unwrap_or(DEFAULT_WEEKS))?;

    let job_value = state
        .backend
        .get_job(&req.job_id, bearer_token(&headers))
        .await?;
    let job = Job::from_feed_value(&job_value)
        .ok_or_else(|| AppError::Upstream(format!("Job {} came back without an id", req.job_id)))?;

    let parsed = parse_job_description(&state.ai, &state.store, &job).await?;
    let plan = generate_prep_plan(&job, Some(&parsed), weeks);
    info!(
        "Generated {}-week prep plan for job {} ({} topics)",
        weeks, job.id, plan.overview.total_topics
    );

    Ok(Json(GenerateResponse {
        job,
        parsed_skills: parsed,
        progress: plan.progress_percent(),
        plan,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPrepPlan {
    pub id: Uuid,
    pub user_id: String,
    pub job_id: String,
    pub job_title: String,
    pub company_name: String,
    pub duration_weeks: i32,
    pub plan: PrepPlan,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

impl SavedPrepPlan {
    fn from_row(row: PrepPlanRow) -> Option<Self> {
        let plan = repository::plan_from_row(&row)?;
        Some(Self {
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            job_title: row.job_title,
            company_name: row.company_name,
            duration_weeks: row.duration_weeks,
            progress: plan.progress_percent(),
            plan,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePrepPlanRequest {
    pub user_id: String,
    pub job: Job,
    pub plan: PrepPlan,
    #[serde(default)]
    pub parsed_skills: Option<ParsedSkills>,
    /// Topic ids the learner already finished before saving.
    #[serde(default)]
    pub completed_topics: Option<BTreeSet<u32>>,
}

/// POST /api/v1/prep-plans
pub async fn handle_save_plan(
    State(state): State<AppState>,
    Json(req): Json<SavePrepPlanRequest>,
) -> Result<(StatusCode, Json<SavedPrepPlan>), AppError> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::Validation("userId is required".to_string()));
    }
    if req.plan.phases.is_empty() {
        return Err(AppError::Validation("A prep plan needs at least one phase".to_string()));
    }
    validate_weeks(req.plan.overview.estimated_time_weeks)?;

    let mut plan = req.plan;
    match &req.completed_topics {
        Some(completed) => plan.apply_completed(completed),
        None => plan.refresh_overview(),
    }

    let row = repository::insert_plan(
        &state.db,
        &req.user_id,
        &req.job,
        &plan,
        req.parsed_skills.as_ref(),
    )
    .await?;
    let saved = SavedPrepPlan::from_row(row)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("saved prep plan is unreadable")))?;
    Ok((StatusCode::CREATED, Json(saved)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: String,
}

/// GET /api/v1/prep-plans?user_id=
pub async fn handle_list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SavedPrepPlan>>, AppError> {
    let plans = repository::list_plans(&state.db, &query.user_id)
        .await?
        .into_iter()
        .filter_map(SavedPrepPlan::from_row)
        .collect();
    Ok(Json(plans))
}

/// PATCH /api/v1/prep-plans/:id/topics/:topic_id
/// Flips a topic between done and not done.
pub async fn handle_toggle_topic(
    State(state): State<AppState>,
    Path((id, topic_id)): Path<(Uuid, u32)>,
) -> Result<Json<SavedPrepPlan>, AppError> {
    let mut row = repository::find_plan(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prep plan {id} not found")))?;
    let mut plan = repository::plan_from_row(&row)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("prep plan {id} is unreadable")))?;

    plan.toggle_topic(topic_id)?;
    repository::update_plan(&state.db, id, &plan).await?;

    row.plan = serde_json::to_value(&plan).map_err(|e| AppError::Internal(e.into()))?;
    let saved = SavedPrepPlan::from_row(row)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("prep plan {id} is unreadable")))?;
    Ok(Json(saved))
}
