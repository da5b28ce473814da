//! Auth handlers — login, refresh, logout, verify.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use tracing::info;
use validator::Validate;

use punchgate_core::error::AppError;
use punchgate_core::types::ApiEnvelope;
use punchgate_entity::session::TerminationReason;

use crate::dto::request::{LoginRequest, RefreshRequest};
use crate::dto::response::{LoginResponse, MessageResponse, RefreshResponse, VerifyResponse};
use crate::extractors::AuthDevice;
use crate::state::AppState;

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiEnvelope<LoginResponse>>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    state.authority.verify_device_key(&req.device_key)?;

    let remote_addr = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok());

    let issued = state
        .authority
        .issue(&req.subject_id, req.device_id.as_deref(), remote_addr, user_agent)
        .await?;

    info!(subject = %req.subject_id, session_id = %issued.session_id, "Device logged in");

    Ok(Json(ApiEnvelope::success(LoginResponse {
        access_token: issued.tokens.access_token,
        refresh_token: issued.tokens.refresh_token,
        session_id: issued.session_id,
        access_ttl_seconds: issued.access_ttl_seconds,
        access_expires_at: issued.tokens.access_expires_at,
        refresh_expires_at: issued.tokens.refresh_expires_at,
    })))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiEnvelope<RefreshResponse>>, AppError> {
    let (access_token, access_ttl_seconds) = state.authority.refresh(&req.refresh_token).await?;

    Ok(Json(ApiEnvelope::success(RefreshResponse {
        access_token,
        access_ttl_seconds,
    })))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    device: AuthDevice,
) -> Result<Json<ApiEnvelope<MessageResponse>>, AppError> {
    state
        .authority
        .terminate(device.session_id, TerminationReason::Logout)
        .await?;

    Ok(Json(ApiEnvelope::success(MessageResponse {
        message: "Logged out successfully".to_string(),
    })))
}

/// GET /auth/verify
pub async fn verify(
    State(state): State<AppState>,
    device: AuthDevice,
) -> Result<Json<ApiEnvelope<VerifyResponse>>, AppError> {
    let sessions = state.authority.list(&device.subject_id).await?;

    Ok(Json(ApiEnvelope::success(VerifyResponse {
        subject_id: device.subject_id,
        device_id: device.device_id,
        session_id: device.session_id,
        sessions,
    })))
}
