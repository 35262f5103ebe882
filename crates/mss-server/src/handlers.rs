use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use mss_api::ApiError;
use mss_core::{DeviceSnapshot, InitClient};
use serde::Serialize;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<&'a str>,
}

pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            backend: None,
        }),
    )
}

pub async fn readyz(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.repo.ping().await.map_err(|e| {
        tracing::warn!(
            error = %e,
            category = %e.category(),
            backend = state.repo.backend_name(),
            "readiness check failed"
        );
        ApiError::service_unavailable("storage is not reachable")
    })?;
    Ok((
        StatusCode::OK,
        Json(HealthResponse {
            status: "ready",
            backend: Some(state.repo.backend_name()),
        }),
    ))
}

/// `POST /api/init`: records a launch and returns whether the version is disabled.
pub async fn init_client_app(
    State(state): State<AppState>,
    payload: Result<Json<DeviceSnapshot>, JsonRejection>,
) -> Result<Json<InitClient>, ApiError> {
    let Json(snapshot) = payload.map_err(json_rejection)?;
    let init = state.init.init_client_app(&snapshot).await?;
    Ok(Json(init))
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::unsupported_media_type("expected Content-Type: application/json")
        }
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            ApiError::payload_too_large(other.body_text())
        }
        other => ApiError::bad_request(other.body_text()),
    }
}
