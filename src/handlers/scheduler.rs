use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::{AppError, Result},
    state::AppState,
};

/// A control message for the inactivity sweep scheduler.
#[derive(Deserialize, Debug)]
pub struct SchedulerRequest {
    pub action: String,
    /// Sweep interval in milliseconds.
    pub interval: Option<u64>,
}

/// Handles scheduler control: `{action: "start"|"stop", interval?}`.
pub async fn control(
    State(state): State<AppState>,
    Json(payload): Json<SchedulerRequest>,
) -> Result<Response> {
    match payload.action.as_str() {
        "start" => {
            let interval = payload
                .interval
                .map(Duration::from_millis)
                .unwrap_or_else(|| state.config.sweep_interval());

            if !state.sweeper.start(state.clone(), interval) {
                return Ok((
                    StatusCode::OK,
                    Json(sonic_rs::json!({
                        "success": false,
                        "message": "Sweep is already running",
                    })),
                )
                    .into_response());
            }

            Ok((
                StatusCode::OK,
                Json(sonic_rs::json!({
                    "success": true,
                    "message": "Sweep started",
                    "intervalMs": interval.as_millis() as u64,
                })),
            )
                .into_response())
        }
        "stop" => {
            if !state.sweeper.stop() {
                return Ok((
                    StatusCode::OK,
                    Json(sonic_rs::json!({
                        "success": false,
                        "message": "Sweep is not running",
                    })),
                )
                    .into_response());
            }

            Ok((
                StatusCode::OK,
                Json(sonic_rs::json!({
                    "success": true,
                    "message": "Sweep stopped",
                })),
            )
                .into_response())
        }
        other => Err(AppError::Validation(format!(
            "Invalid action {:?}. Use \"start\" or \"stop\"",
            other
        ))),
    }
}

/// Reports whether the sweep scheduler is running.
pub async fn status(State(state): State<AppState>) -> Result<Response> {
    let active = state.sweeper.is_running();
    Ok((
        StatusCode::OK,
        Json(sonic_rs::json!({
            "success": true,
            "isActive": active,
            "status": if active { "active" } else { "stopped" },
        })),
    )
        .into_response())
}
