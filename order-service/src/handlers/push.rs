use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{MessageResponse, NotifyRequest, RegisterTokenRequest},
    middleware::Principal,
    AppState,
};

pub async fn register_token(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<RegisterTokenRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    if !state
        .users
        .set_device_token(&principal.user_id, &req.token)
        .await?
    {
        return Err(AppError::NotFound(anyhow::anyhow!("User not found")));
    }

    Ok(Json(MessageResponse::new("Device token registered")))
}

/// Queues a notification for every registered device and returns at once.
pub async fn notify_all(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let recipients = state
        .notifier
        .broadcast(state.users.as_ref(), req.title, req.body)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Notification queued", "recipients": recipients })),
    ))
}
