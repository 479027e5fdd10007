//! API request and response types.

use activation_store::{Message, Session, SessionPatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
    pub pollers: usize,
}

/// Create or update an activation. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertActivationRequest {
    pub phone_number: Option<String>,
    pub service_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Browser `PushSubscription` JSON
    pub subscription: Option<serde_json::Value>,
}

impl From<UpsertActivationRequest> for SessionPatch {
    fn from(request: UpsertActivationRequest) -> Self {
        SessionPatch {
            phone_number: request.phone_number,
            service_name: request.service_name,
            created_at: request.created_at,
            subscription: request.subscription,
        }
    }
}

/// A client-submitted SMS.
#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    pub code: Option<String>,
    pub text: Option<String>,
}

/// An activation with its id.
#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    pub id: String,
    #[serde(flatten)]
    pub session: Session,
}

/// A stored message with its key.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub key: String,
    pub message: Message,
}
