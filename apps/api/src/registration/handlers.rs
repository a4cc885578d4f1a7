use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::persistence::StoreKey;
use crate::registration::submit::RegistrationFlow;
use crate::registration::wizard::{Wizard, WizardEvent, WizardState, COMPLETED_REDIRECT};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSessionResponse {
    pub session_id: String,
    pub step_index: Option<u8>,
    pub wizard: Wizard,
    /// Set once registration completes.
    pub redirect: Option<&'static str>,
}

impl RegistrationSessionResponse {
    fn new(session_id: String, wizard: Wizard) -> Self {
        let redirect = matches!(wizard.state, WizardState::Completed { .. })
            .then_some(COMPLETED_REDIRECT);
        Self {
            session_id,
            step_index: wizard.state.step_index(),
            wizard: wizard.redacted(),
            redirect,
        }
    }
}

async fn load_wizard(state: &AppState, session_id: &str) -> Result<Wizard, AppError> {
    state
        .store
        .get_json::<Wizard>(&StoreKey::RegistrationSession(session_id.to_string()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Registration session {session_id} not found")))
}

/// POST /api/v1/registration/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RegistrationSessionResponse>), AppError> {
    let session_id = Uuid::new_v4().to_string();
    let wizard = Wizard::new();
    state
        .store
        .set_json(&StoreKey::RegistrationSession(session_id.clone()), &wizard)
        .await?;

    info!("Started registration session {session_id}");
    Ok((
        StatusCode::CREATED,
        Json(RegistrationSessionResponse::new(session_id, wizard)),
    ))
}

/// GET /api/v1/registration/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<RegistrationSessionResponse>, AppError> {
    let wizard = load_wizard(&state, &session_id).await?;
    Ok(Json(RegistrationSessionResponse::new(session_id, wizard)))
}

/// POST /api/v1/registration/sessions/:id/events
pub async fn handle_session_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(event): Json<WizardEvent>,
) -> Result<Json<RegistrationSessionResponse>, AppError> {
    let mut wizard = load_wizard(&state, &session_id).await?;

    let flow = RegistrationFlow::new(state.auth.clone(), state.store.clone());
    flow.handle(&mut wizard, event).await?;

    state
        .store
        .set_json(
            &StoreKey::RegistrationSession(session_id.clone()),
            &wizard.for_storage(),
        )
        .await?;

    Ok(Json(RegistrationSessionResponse::new(session_id, wizard)))
}
