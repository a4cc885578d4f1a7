use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::ai_client::{ANALYZE_INTERVIEW_PATH, GENERATE_QUESTION_PATH};
use crate::errors::AppError;
use crate::interview::session::{InterviewAnalysis, InterviewSession, InterviewStatus};
use crate::persistence::StoreKey;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewView {
    pub id: Uuid,
    pub status: InterviewStatus,
    pub current_question: Option<String>,
    /// 1-based number of the current question.
    pub question_number: u32,
    pub total_questions: u32,
    pub answered: usize,
    pub progress: f64,
    pub analysis: Option<InterviewAnalysis>,
}

impl From<&InterviewSession> for InterviewView {
    fn from(session: &InterviewSession) -> Self {
        Self {
            id: session.id,
            status: session.status,
            current_question: session.current_question().map(|q| q.text.clone()),
            question_number: (session.current_index + 1).min(session.total_questions),
            total_questions: session.total_questions,
            answered: session.answers.len(),
            progress: session.progress_percent(),
            analysis: session.analysis.clone(),
        }
    }
}

fn session_key(id: Uuid) -> StoreKey {
    StoreKey::InterviewSession(id.to_string())
}

async fn load_session(state: &AppState, id: Uuid) -> Result<InterviewSession, AppError> {
    state
        .store
        .get_json(&session_key(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))
}

async fn save_session(state: &AppState, session: &InterviewSession) -> Result<(), AppError> {
    state.store.set_json(&session_key(session.id), session).await?;
    Ok(())
}

/// Fetches the next question when the session is waiting for one.
async fn fill_question(state: &AppState, session: &mut InterviewSession) -> Result<(), AppError> {
    if session.needs_question() {
        let response = state
            .ai
            .call_value(GENERATE_QUESTION_PATH, &session.question_request())
            .await?;
        session.push_question(&response)?;
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInterviewRequest {
    pub job_description: String,
    #[serde(default)]
    pub total_questions: Option<u32>,
}

/// POST /api/v1/interviews
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewView>), AppError> {
    let mut session = InterviewSession::new(&req.job_description, req.total_questions)?;
    fill_question(&state, &mut session).await?;
    save_session(&state, &session).await?;

    info!(
        "Started interview {} ({} questions)",
        session.id, session.total_questions
    );
    Ok((StatusCode::CREATED, Json(InterviewView::from(&session))))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewView>, AppError> {
    let session = load_session(&state, id).await?;
    Ok(Json(InterviewView::from(&session)))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub answer: String,
}

/// POST /api/v1/interviews/:id/answer
/// Records the answer and fetches the next question, if any remain.
pub async fn handle_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<InterviewView>, AppError> {
    let mut session = load_session(&state, id).await?;
    if session.needs_question() {
        // The candidate has not seen this question yet, so the answer is dropped.
        fill_question(&state, &mut session).await?;
        save_session(&state, &session).await?;
        info!("Interview {id}: question regenerated, answer not recorded");
        return Ok(Json(InterviewView::from(&session)));
    }
    session.record_answer(&req.answer)?;
    save_session(&state, &session).await?;

    fill_question(&state, &mut session).await?;
    save_session(&state, &session).await?;
    Ok(Json(InterviewView::from(&session)))
}

/// POST /api/v1/interviews/:id/analyze
/// Ends the question loop if it is still running.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewView>, AppError> {
    let mut session = load_session(&state, id).await?;
    session.finish()?;

    let response = state
        .ai
        .call_value(ANALYZE_INTERVIEW_PATH, &session.analysis_request(Utc::now()))
        .await?;
    session.set_analysis(&response)?;
    save_session(&state, &session).await?;

    info!(
        "Analyzed interview {id} ({} answer(s))",
        session.answers.len()
    );
    Ok(Json(InterviewView::from(&session)))
}
