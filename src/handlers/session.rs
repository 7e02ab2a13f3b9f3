use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{
    client_ip::extract_client_ip,
    error::{AppError, Result},
    models::session::{NewSession, SessionPatch},
    repositories::session as session_repo,
    services::session::{self as session_service, CreateOutcome},
    state::AppState,
};

#[derive(Deserialize, Debug, Default)]
pub struct CheckQuery {
    pub ip: Option<String>,
}

/// An explicit active/inactive transition, e.g. the client's unload beacon.
#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequest {
    pub ip: Option<String>,
    pub status: Option<bool>,
}

fn resolve_ip(explicit: Option<String>, headers: &HeaderMap) -> String {
    match explicit {
        Some(ip) if !ip.is_empty() => ip,
        _ => extract_client_ip(headers, None),
    }
}

/// Handles a check for an existing session by IP.
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let ip = resolve_ip(query.ip, &headers);

    let count =
        session_repo::count_by_ip(&state.record_store, &state.config.sessions_table, &ip).await?;

    Ok((StatusCode::OK, Json(sonic_rs::json!({ "count": count }))).into_response())
}

/// Handles a first-writer-wins session create.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut attrs): Json<NewSession>,
) -> Result<Response> {
    if attrs.ip.is_empty() {
        attrs.ip = extract_client_ip(&headers, None);
    }

    let outcome = session_service::create_if_absent(&state, &attrs).await?;
    let body = match outcome {
        CreateOutcome::Created(id) => sonic_rs::json!({
            "success": true,
            "created": true,
            "Id": id,
        }),
        CreateOutcome::Existing => sonic_rs::json!({
            "success": true,
            "created": false,
        }),
    };

    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Handles an incremental session update.
///
/// Always answers 200 with the patched identity; an unknown IP yields the
/// zero-id sentinel rather than an error, since the caller may be a beacon
/// fired from a page that is already closing.
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut patch): Json<SessionPatch>,
) -> Result<Response> {
    let ip = resolve_ip(patch.ip.take(), &headers);
    patch.id = None;

    let outcome = session_service::update(&state, &ip, patch).await?;

    Ok((StatusCode::OK, Json(outcome)).into_response())
}

/// Handles an explicit session status transition.
pub async fn update_status(
    State(state): State<AppState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Response> {
    let ip = payload
        .ip
        .filter(|ip| !ip.is_empty())
        .ok_or_else(|| AppError::Validation("ip is required".to_string()))?;

    let status = payload.status.unwrap_or(false);
    let patch = SessionPatch {
        status: Some(status),
        ..Default::default()
    };
    session_service::update(&state, &ip, patch).await?;

    Ok((
        StatusCode::OK,
        Json(sonic_rs::json!({
            "success": true,
            "message": format!("Status updated to {}", status),
        })),
    )
        .into_response())
}
