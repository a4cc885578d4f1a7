use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::persistence::StoreKey;
use crate::state::AppState;
use crate::video_plan::completion::{evaluate, quality_score, CompletionAttempt, CompletionRecord, WatchMetrics};
use crate::video_plan::payout::{calculate_payout, Payout, PayoutRequest};
use crate::video_plan::plan::{PlanSummary, Video, VideoPlan, WatchedSet};
use crate::video_plan::repository::{self, CompletionMap};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPlanResponse {
    pub plan: VideoPlan,
    pub watched_videos: WatchedSet,
    pub summary: PlanSummary,
    /// Player embed id per video URL. Non-YouTube videos are left out.
    pub embed_ids: BTreeMap<String, String>,
}

impl VideoPlanResponse {
    fn new(plan: VideoPlan, watched_videos: WatchedSet) -> Self {
        let summary = plan.summary(&watched_videos);
        let embed_ids = plan
            .videos
            .iter()
            .filter_map(|v| Some((v.url.clone(), v.youtube_id()?)))
            .collect();
        Self {
            plan,
            watched_videos,
            summary,
            embed_ids,
        }
    }
}

/// Loads the selected plan, falling back to the saved custom plan.
async fn load_plan(state: &AppState, user_id: &str) -> Result<(VideoPlan, WatchedSet), AppError> {
    let selected: Option<VideoPlan> = state
        .store
        .get_json(&StoreKey::SelectedVideoPlan(user_id.to_string()))
        .await?;

    let plan = match selected {
        Some(plan) => plan,
        None => {
            let row = repository::find_plan(&state.db, user_id)
                .await?
                .filter(|row| row.videos.as_array().is_some_and(|v| !v.is_empty()))
                .ok_or_else(|| AppError::NotFound(format!("No video plan for user {user_id}")))?;
            repository::plan_from_row(&row)
        }
    };

    let mut watched: WatchedSet = state
        .store
        .get_json(&StoreKey::WatchedVideos(user_id.to_string()))
        .await?
        .unwrap_or_default();
    plan.prune_watched(&mut watched);

    Ok((plan, watched))
}

async fn store_plan(state: &AppState, user_id: &str, plan: &VideoPlan) -> Result<(), AppError> {
    state
        .store
        .set_json(&StoreKey::SelectedVideoPlan(user_id.to_string()), plan)
        .await?;
    Ok(())
}

async fn store_watched(state: &AppState, user_id: &str, watched: &WatchedSet) -> Result<(), AppError> {
    state
        .store
        .set_json(&StoreKey::WatchedVideos(user_id.to_string()), watched)
        .await?;
    Ok(())
}

/// GET /api/v1/video-plans/:user_id
pub async fn handle_get_plan(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<VideoPlanResponse>, AppError> {
    let (plan, watched) = load_plan(&state, &user_id).await?;
    Ok(Json(VideoPlanResponse::new(plan, watched)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePlanRequest {
    pub title: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    pub videos: Vec<Video>,
}

/// PUT /api/v1/video-plans/:user_id
pub async fn handle_save_plan(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<SavePlanRequest>,
) -> Result<Json<VideoPlanResponse>, AppError> {
    if req.videos.is_empty() {
        return Err(AppError::Validation("A video plan needs at least one video".into()));
    }

    let mut plan = VideoPlan::new(req.title, req.videos);
    plan.job_id = req.job_id;
    plan.job_title = req.job_title;
    plan.company_name = req.company_name;

    repository::save_plan(&state.db, &user_id, &plan).await?;
    store_plan(&state, &user_id, &plan).await?;

    let mut watched: WatchedSet = state
        .store
        .get_json(&StoreKey::WatchedVideos(user_id.clone()))
        .await?
        .unwrap_or_default();
    plan.prune_watched(&mut watched);
    store_watched(&state, &user_id, &watched).await?;

    Ok(Json(VideoPlanResponse::new(plan, watched)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteVideoRequest {
    pub video_url: String,
    pub actual_progress: f64,
    /// Score computed by the player. When absent it is derived from `metrics`.
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub metrics: Option<WatchMetrics>,
    #[serde(default)]
    pub high_speed_warnings: u32,
    #[serde(default)]
    pub force: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteVideoResponse {
    pub record: CompletionRecord,
    #[serde(flatten)]
    pub plan: VideoPlanResponse,
}

/// POST /api/v1/video-plans/:user_id/complete
pub async fn handle_complete_video(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<CompleteVideoRequest>,
) -> Result<Json<CompleteVideoResponse>, AppError> {
    let (plan, mut watched) = load_plan(&state, &user_id).await?;
    if !plan.contains(&req.video_url) {
        return Err(AppError::NotFound(format!(
            "Video {} is not part of this plan",
            req.video_url
        )));
    }

    let quality = req
        .quality_score
        .or_else(|| req.metrics.as_ref().map(quality_score))
        .unwrap_or(0.0);

    let record = evaluate(&CompletionAttempt {
        actual_progress: req.actual_progress,
        quality_score: quality,
        high_speed_warnings: req.high_speed_warnings,
        force: req.force,
    })
    .map_err(|blocked| AppError::Validation(blocked.to_string()))?;

    repository::record_completion(&state.db, &user_id, &req.video_url, &record).await?;
    watched.insert(req.video_url.clone());
    store_watched(&state, &user_id, &watched).await?;

    info!(
        "Video {} completed by {user_id} (quality {:.0})",
        req.video_url, record.quality_score
    );
    Ok(Json(CompleteVideoResponse {
        record,
        plan: VideoPlanResponse::new(plan, watched),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUrlRequest {
    pub video_url: String,
}

/// POST /api/v1/video-plans/:user_id/toggle
pub async fn handle_toggle_watched(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<VideoUrlRequest>,
) -> Result<Json<VideoPlanResponse>, AppError> {
    let (plan, mut watched) = load_plan(&state, &user_id).await?;

    let completions: CompletionMap = if watched.contains(&req.video_url) {
        CompletionMap::new()
    } else {
        repository::find_completions(&state.db, &user_id).await?
    };
    plan.toggle_watched(
        &mut watched,
        &req.video_url,
        completions.contains_key(&req.video_url),
    )?;
    store_watched(&state, &user_id, &watched).await?;

    Ok(Json(VideoPlanResponse::new(plan, watched)))
}

#[derive(Deserialize)]
pub struct RemoveVideoQuery {
    pub url: String,
}

/// DELETE /api/v1/video-plans/:user_id/videos?url=
pub async fn handle_remove_video(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RemoveVideoQuery>,
) -> Result<Json<VideoPlanResponse>, AppError> {
    let (mut plan, mut watched) = load_plan(&state, &user_id).await?;
    plan.remove_video(&mut watched, &query.url)?;

    store_plan(&state, &user_id, &plan).await?;
    store_watched(&state, &user_id, &watched).await?;
    repository::save_plan(&state.db, &user_id, &plan).await?;
    repository::remove_completion(&state.db, &user_id, &query.url).await?;
    info!("Removed {} from the video plan of {user_id}", query.url);

    Ok(Json(VideoPlanResponse::new(plan, watched)))
}

/// POST /api/v1/video-plans/payout
pub async fn handle_payout(
    State(state): State<AppState>,
    Json(req): Json<PayoutRequest>,
) -> Result<Json<Payout>, AppError> {
    Ok(Json(calculate_payout(&req, state.config.dev_mode)?))
}
