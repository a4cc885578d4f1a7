use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::persistence::StoreKey;
use crate::state::AppState;

pub const DEFAULT_PANEL_WIDTH: u8 = 50;
const MIN_PANEL_WIDTH: u8 = 20;
const MAX_PANEL_WIDTH: u8 = 80;

/// Width of the resizable left panel, as a percentage of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelWidth {
    pub width: f64,
}

pub fn clamp_panel_width(width: f64) -> f64 {
    if width.is_finite() {
        width.clamp(MIN_PANEL_WIDTH.into(), MAX_PANEL_WIDTH.into())
    } else {
        DEFAULT_PANEL_WIDTH.into()
    }
}

/// GET /api/v1/preferences/:user_id/panel-width
pub async fn handle_get_panel_width(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PanelWidth>, AppError> {
    let stored: Option<f64> = state
        .store
        .get_json(&StoreKey::PanelWidth(user_id))
        .await?;
    Ok(Json(PanelWidth {
        width: stored.map(clamp_panel_width).unwrap_or(DEFAULT_PANEL_WIDTH.into()),
    }))
}

/// PUT /api/v1/preferences/:user_id/panel-width
pub async fn handle_put_panel_width(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<PanelWidth>,
) -> Result<Json<PanelWidth>, AppError> {
    let width = clamp_panel_width(req.width);
    state
        .store
        .set_json(&StoreKey::PanelWidth(user_id), &width)
        .await?;
    Ok(Json(PanelWidth { width }))
}
