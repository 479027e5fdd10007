//! HTTP request handlers.

use super::types::{
    ActivationResponse, HealthResponse, MessageResponse, SubmitMessageRequest,
    UpsertActivationRequest,
};
use super::AppState;
use crate::error::{RelayError, RelayResult};
use activation_store::{Message, SessionPatch};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

/// Banner for the bare root path.
pub async fn root() -> &'static str {
    "SMS code relay active"
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.store.len().await,
        pollers: state.poller.running_count().await,
    })
}

/// Read one activation.
pub async fn get_activation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RelayResult<Json<ActivationResponse>> {
    let session = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| RelayError::NotFound(id.clone()))?;

    Ok(Json(ActivationResponse { id, session }))
}

/// Create or merge-update an activation.
pub async fn put_activation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpsertActivationRequest>,
) -> RelayResult<Json<ActivationResponse>> {
    if let Some(subscription) = &request.subscription {
        validate_subscription(subscription)?;
    }

    state.store.put(&id, request.into()).await?;
    info!(activation_id = %id, "Activation updated");

    get_activation(State(state), Path(id)).await
}

/// Remove an activation and everything under it.
pub async fn delete_activation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RelayResult<StatusCode> {
    if !state.store.remove(&id).await? {
        return Err(RelayError::NotFound(id));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Attach or replace the device push subscription.
pub async fn put_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(subscription): Json<serde_json::Value>,
) -> RelayResult<Json<ActivationResponse>> {
    validate_subscription(&subscription)?;

    state.store.set_subscription(&id, subscription).await?;
    info!(activation_id = %id, "Push subscription attached");

    get_activation(State(state), Path(id)).await
}

/// Detach the device push subscription.
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RelayResult<StatusCode> {
    if !state.store.remove_subscription(&id).await? {
        return Err(RelayError::NotFound(format!("subscription for {}", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Record a message submitted by a client device.
///
/// Keyed by its code, or by a generated key for free text. An existing
/// key is never overwritten.
pub async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SubmitMessageRequest>,
) -> RelayResult<(StatusCode, Json<MessageResponse>)> {
    let code = non_blank(request.code);
    let text = non_blank(request.text);

    if code.is_none() && text.is_none() {
        return Err(RelayError::InvalidRequest(
            "message needs a code or text".to_string(),
        ));
    }

    let key = match &code {
        Some(code) => code.clone(),
        None => format!("msg-{}", Uuid::new_v4()),
    };

    if state.store.get(&id).await.is_none() {
        state.store.put(&id, SessionPatch::default()).await?;
    }

    let message = Message::from_client(code, text);
    if !state
        .store
        .insert_message_if_absent(&id, &key, message.clone())
        .await?
    {
        return match state.store.get(&id).await {
            Some(_) => Err(RelayError::MessageExists(key)),
            None => Err(RelayError::NotFound(id)),
        };
    }
    info!(activation_id = %id, "Client message recorded");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse { id, key, message }),
    ))
}

fn validate_subscription(subscription: &serde_json::Value) -> RelayResult<()> {
    match subscription.get("endpoint").and_then(|e| e.as_str()) {
        Some(endpoint) if !endpoint.is_empty() => Ok(()),
        _ => Err(RelayError::InvalidRequest(
            "subscription must have an endpoint".to_string(),
        )),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
