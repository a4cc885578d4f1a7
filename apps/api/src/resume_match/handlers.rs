use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai_client::RESUME_RAG_PATH;
use crate::errors::AppError;
use crate::persistence::StoreKey;
use crate::resume_match::analysis::{
    missing_skills_panel, normalize_analysis, welcome_message, AnalyzeRequest, MatchAnalysis,
    SkillsPanel,
};
use crate::resume_match::chat::{
    chat_reply, lookup_chat, register_chat, remove_chat, replace_chat, session_key,
    AnalysisContext, ChatMessage, ChatSession, ChatSessionView, SharedChat,
};
use crate::resume_match::upload::{
    extract_text, fetch_resume, store_resume, validate_pdf, ResumeUpload, UploadError,
};
use crate::state::AppState;

/// What survives a restart: the transcript and the job context.
#[derive(Serialize, Deserialize)]
struct StoredChat {
    context: AnalysisContext,
    messages: Vec<ChatMessage>,
}

impl From<&ChatSession> for StoredChat {
    fn from(chat: &ChatSession) -> Self {
        Self {
            context: chat.context().clone(),
            messages: chat.messages().to_vec(),
        }
    }
}

fn chat_store_key(user_id: &str, context_id: &str) -> StoreKey {
    StoreKey::ChatSession {
        user_id: user_id.to_string(),
        context_id: context_id.to_string(),
    }
}

/// Writes a snapshot taken while the chat was locked. No lock is held here.
async fn persist_chat(
    state: &AppState,
    user_id: &str,
    context_id: &str,
    stored: &StoredChat,
) -> Result<(), AppError> {
    state
        .store
        .set_json(&chat_store_key(user_id, context_id), stored)
        .await?;
    Ok(())
}

/// Returns the live session, restoring it from the store after a restart.
async fn live_session(
    state: &AppState,
    user_id: &str,
    context_id: &str,
) -> Result<SharedChat, AppError> {
    let key = session_key(user_id, context_id);
    if let Some(chat) = lookup_chat(&state.chats, &key).await {
        return Ok(chat);
    }

    let stored: Option<StoredChat> = state
        .store
        .get_json(&chat_store_key(user_id, context_id))
        .await?;
    let stored = stored.ok_or_else(|| {
        AppError::NotFound(format!("No chat session for {user_id}/{context_id}"))
    })?;
    let restored = ChatSession::restore(key, stored.context, stored.messages);
    Ok(register_chat(&state.chats, restored).await)
}

/// POST /api/v1/resume-match/upload
/// Multipart body with a single `resume` PDF field.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeUpload>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("resume") {
            continue;
        }
        let original_name = field.file_name().unwrap_or("resume.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;

        validate_pdf(content_type.as_deref(), &bytes)?;
        let upload = store_resume(
            &state.s3,
            &state.config.s3_bucket,
            &original_name,
            bytes,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(upload)));
    }

    Err(UploadError::Missing.into())
}

#[derive(Debug, Default, Deserialize)]
pub struct ResumeQuery {
    #[serde(default)]
    pub download: bool,
}

/// GET /api/v1/resume-match/resumes/:filename
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<ResumeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = fetch_resume(&state.s3, &state.config.s3_bucket, &filename).await?;
    let disposition = if query.download {
        format!("attachment; filename=\"{filename}\"")
    } else {
        format!("inline; filename=\"{filename}\"")
    };

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: MatchAnalysis,
    pub missing_skills_panel: SkillsPanel,
    pub chat: Option<ChatSessionView>,
}

/// POST /api/v1/resume-match/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if req.job_title.trim().is_empty() {
        return Err(AppError::Validation("Job title is required".to_string()));
    }

    let bytes = fetch_resume(&state.s3, &state.config.s3_bucket, &req.resume_filename).await?;
    let resume_text = extract_text(bytes).await?;
    if resume_text.is_empty() {
        return Err(AppError::Validation(
            "No readable text found in the resume".to_string(),
        ));
    }

    let response = state
        .ai
        .call_value(RESUME_RAG_PATH, &req.to_body(&resume_text))
        .await?;
    let analysis = normalize_analysis(&response);
    let panel = missing_skills_panel(&analysis);
    info!(
        "Resume {} scored {:.0} against '{}'",
        req.resume_filename, analysis.overall_score, req.job_title
    );

    let chat = match &req.user_id {
        Some(user_id) => {
            let context_id = req
                .job_id
                .clone()
                .unwrap_or_else(|| req.resume_filename.clone());
            let mut session = ChatSession::new(
                session_key(user_id, &context_id),
                AnalysisContext {
                    job_title: req.job_title.clone(),
                    overall_score: Some(analysis.overall_score),
                    missing_skills: analysis.missing_skills.clone(),
                },
            );
            session.push_assistant(&welcome_message(&req.job_title));
            persist_chat(&state, user_id, &context_id, &StoredChat::from(&session)).await?;

            let view = session.view();
            if let Some(previous) = replace_chat(&state.chats, session).await {
                previous.lock().await.stop();
            }
            Some(view)
        }
        None => None,
    };

    Ok(Json(AnalyzeResponse {
        analysis,
        missing_skills_panel: panel,
        chat,
    }))
}

/// GET /api/v1/resume-match/chat/:user_id/:context_id
pub async fn handle_get_chat(
    State(state): State<AppState>,
    Path((user_id, context_id)): Path<(String, String)>,
) -> Result<Json<ChatSessionView>, AppError> {
    let chat = live_session(&state, &user_id, &context_id).await?;
    let mut chat = chat.lock().await;
    chat.sync(Instant::now());
    Ok(Json(chat.view()))
}

/// DELETE /api/v1/resume-match/chat/:user_id/:context_id
/// Drops the conversation, cancelling any request still in flight.
pub async fn handle_clear_chat(
    State(state): State<AppState>,
    Path((user_id, context_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    if let Some(chat) = remove_chat(&state.chats, &session_key(&user_id, &context_id)).await {
        chat.lock().await.stop();
    }
    state
        .store
        .clear(&chat_store_key(&user_id, &context_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ChatQuestion {
    pub question: String,
}

/// POST /api/v1/resume-match/chat/:user_id/:context_id/messages
///
/// A later question or an explicit stop cancels this request; the caller then
/// gets a 409 and the reply is discarded.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path((user_id, context_id)): Path<(String, String)>,
    Json(body): Json<ChatQuestion>,
) -> Result<Json<ChatSessionView>, AppError> {
    let question = body.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }

    let shared = live_session(&state, &user_id, &context_id).await?;
    let (request, payload) = {
        let mut chat = shared.lock().await;
        let request = chat.begin_request(&question);
        (request, chat.request_body(&question))
    };

    let outcome = tokio::select! {
        _ = request.token.cancelled() => None,
        result = state.ai.call_value(RESUME_RAG_PATH, &payload) => Some(result),
    };

    let (view, stored) = {
        let mut chat = shared.lock().await;
        // A cleared or re-analyzed chat no longer owns this request.
        let key = session_key(&user_id, &context_id);
        let current = lookup_chat(&state.chats, &key)
            .await
            .is_some_and(|live| Arc::ptr_eq(&live, &shared));
        let recorded = match outcome {
            _ if !current => false,
            None => false,
            Some(Ok(response)) => chat.finish_request(&request, &chat_reply(&response)),
            Some(Err(e)) => {
                warn!("Chat request for {user_id}/{context_id} failed: {e}");
                chat.fail_request(&request)
            }
        };
        if !recorded {
            return Err(AppError::Cancelled);
        }
        (chat.view(), StoredChat::from(&*chat))
    };

    persist_chat(&state, &user_id, &context_id, &stored).await?;
    Ok(Json(view))
}

#[derive(Debug, Clone, Copy)]
enum ChatControl {
    Stop,
    Pause,
    Resume,
    Skip,
}

async fn control_chat(
    state: AppState,
    user_id: String,
    context_id: String,
    control: ChatControl,
) -> Result<Json<ChatSessionView>, AppError> {
    let chat = live_session(&state, &user_id, &context_id).await?;
    let mut chat = chat.lock().await;
    chat.sync(Instant::now());

    match control {
        ChatControl::Stop => {
            if chat.stop() {
                info!("Stopped chat request for {user_id}/{context_id}");
            }
        }
        ChatControl::Pause => chat.pause(),
        ChatControl::Resume => chat.resume(),
        ChatControl::Skip => chat.skip(),
    }
    Ok(Json(chat.view()))
}

/// POST /api/v1/resume-match/chat/:user_id/:context_id/stop
pub async fn handle_stop(
    State(state): State<AppState>,
    Path((user_id, context_id)): Path<(String, String)>,
) -> Result<Json<ChatSessionView>, AppError> {
    control_chat(state, user_id, context_id, ChatControl::Stop).await
}

/// POST /api/v1/resume-match/chat/:user_id/:context_id/pause
pub async fn handle_pause(
    State(state): State<AppState>,
    Path((user_id, context_id)): Path<(String, String)>,
) -> Result<Json<ChatSessionView>, AppError> {
    control_chat(state, user_id, context_id, ChatControl::Pause).await
}

/// POST /api/v1/resume-match/chat/:user_id/:context_id/resume
pub async fn handle_resume(
    State(state): State<AppState>,
    Path((user_id, context_id)): Path<(String, String)>,
) -> Result<Json<ChatSessionView>, AppError> {
    control_chat(state, user_id, context_id, ChatControl::Resume).await
}

/// POST /api/v1/resume-match/chat/:user_id/:context_id/skip
pub async fn handle_skip(
    State(state): State<AppState>,
    Path((user_id, context_id)): Path<(String, String)>,
) -> Result<Json<ChatSessionView>, AppError> {
    control_chat(state, user_id, context_id, ChatControl::Skip).await
}
