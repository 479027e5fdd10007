//! Push delivery errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Subscription expired or unsubscribed (410)")]
    Gone,

    #[error("Subscription endpoint not found (404)")]
    NotFound,

    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("Push service rejected notification: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Push delivery failed: {0}")]
    Transport(String),
}

impl PushError {
    /// HTTP-like status code, when the push service returned one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PushError::Gone => Some(410),
            PushError::NotFound => Some(404),
            PushError::Rejected { status, .. } => Some(*status),
            PushError::InvalidSubscription(_) | PushError::Transport(_) => None,
        }
    }

    /// Whether retrying with the same subscription can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            PushError::Gone | PushError::NotFound | PushError::InvalidSubscription(_)
        )
    }
}

impl From<web_push::WebPushError> for PushError {
    fn from(e: web_push::WebPushError) -> Self {
        use web_push::WebPushError;

        match &e {
            WebPushError::EndpointNotValid { .. } => PushError::Gone,
            WebPushError::EndpointNotFound { .. } => PushError::NotFound,
            WebPushError::InvalidCryptoKeys { .. } | WebPushError::MissingCryptoKeys { .. } => {
                PushError::InvalidSubscription(e.to_string())
            }
            WebPushError::Unauthorized { .. } => rejected(401, &e),
            WebPushError::BadRequest { .. } => rejected(400, &e),
            WebPushError::PayloadTooLarge { .. } => rejected(413, &e),
            WebPushError::ServerError { .. } => rejected(500, &e),
            _ => PushError::Transport(e.to_string()),
        }
    }
}

fn rejected(status: u16, e: &web_push::WebPushError) -> PushError {
    PushError::Rejected {
        status,
        message: e.to_string(),
    }
}
