use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::ai_client::SHORTLIST_PATH;
use crate::backend::bearer_token;
use crate::errors::AppError;
use crate::models::application::{Application, ApplicationStatus};
use crate::models::first_str;
use crate::models::job::Job;
use crate::shortlist::normalize::{ai_entries, join, AiCandidate, ProcessedWith, RankedCandidate};
use crate::shortlist::quick_score::quick_score;
use crate::shortlist::ranking::{filter, rank, summary, ScoreFilter, ShortlistSummary};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ShortlistQuery {
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistResponse {
    pub job_id: String,
    pub job_title: String,
    pub processed_with: ProcessedWith,
    pub filter: ScoreFilter,
    pub summary: ShortlistSummary,
    pub candidates: Vec<RankedCandidate>,
}

fn shortlist_request(job: &Job, applications: &[Application]) -> Value {
    json!({
        "jobId": job.id,
        "job": {
            "id": job.id,
            "title": job.title,
            "department": job.department,
            "level": job.level,
            "description": job.description,
            "requirements": job.requirements,
        },
        "candidates": applications.iter().map(|app| json!({
            "_id": app.id,
            "applicantName": app.applicant.name,
            "applicantEmail": app.applicant.email,
            "skills": app.applicant.skills,
            "resumeText": app.applicant.resume_text,
            "resumeUrl": app.resume_path,
            "appliedAt": app.applied_at,
            "status": app.status,
        })).collect::<Vec<_>>(),
    })
}

/// Scores every application locally, in the same shape the AI returns.
fn quick_scored(job: &Job, applications: &[Application]) -> Vec<AiCandidate> {
    applications
        .iter()
        .map(|app| AiCandidate {
            candidate_id: app.id.clone(),
            assessment: quick_score(&app.applicant, &job.requirements, &job.title)
                .into_assessment(),
        })
        .collect()
}

/// POST /api/v1/shortlist/:job_id?filter=high
pub async fn handle_shortlist(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<ShortlistQuery>,
    headers: HeaderMap,
) -> Result<Json<ShortlistResponse>, AppError> {
    let score_filter: ScoreFilter = query
        .filter
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(AppError::Validation)?;
    let token = bearer_token(&headers);

    let job_value = state.backend.get_job(&job_id, token).await?;
    let job = Job::from_feed_value(&job_value)
        .ok_or_else(|| AppError::Upstream(format!("Job {job_id} came back without an id")))?;

    let applications: Vec<Application> = state
        .backend
        .list_applications(&job_id, token)
        .await?
        .iter()
        .filter_map(Application::from_value)
        .collect();

    let (ai, processed_with) = if applications.is_empty() {
        (Vec::new(), ProcessedWith::Ai)
    } else {
        match state
            .ai
            .call_value(SHORTLIST_PATH, &shortlist_request(&job, &applications))
            .await
        {
            Ok(response) => (ai_entries(&response), ProcessedWith::Ai),
            Err(e) => {
                warn!("Shortlisting service failed for job {job_id}, using quick scores: {e}");
                (quick_scored(&job, &applications), ProcessedWith::QuickScore)
            }
        }
    };

    let ranked = rank(join(applications, ai));
    info!(
        "Shortlisted {} candidate(s) for job {job_id} ({processed_with:?})",
        ranked.len()
    );

    Ok(Json(ShortlistResponse {
        job_id,
        job_title: job.title,
        processed_with,
        filter: score_filter,
        summary: summary(&ranked),
        candidates: filter(&ranked, score_filter),
    }))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub application_id: String,
    pub status: ApplicationStatus,
}

/// PATCH /api/v1/shortlist/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let requested: ApplicationStatus = req.status.parse().map_err(AppError::Validation)?;

    let body = state
        .backend
        .update_application_status(&application_id, requested.as_str(), bearer_token(&headers))
        .await?;

    let status = first_str(&body, &["status", "application.status", "data.status"])
        .and_then(|s| s.parse().ok())
        .unwrap_or(requested);

    info!("Application {application_id} moved to {status}");
    Ok(Json(StatusUpdateResponse {
        application_id,
        status,
    }))
}
