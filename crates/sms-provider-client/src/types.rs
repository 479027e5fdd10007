//! Provider API types.

use std::fmt;

/// `setStatus` value: SMS received, ready for the next code.
pub const STATUS_READY_FOR_NEXT_CODE: u8 = 3;

/// Normalized result of a `getStatus` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationStatus {
    /// A code arrived, possibly with the full SMS text.
    Ok { code: String, text: Option<String> },
    /// Still waiting for an SMS.
    Wait,
    /// The rental was cancelled on the provider side.
    Cancelled,
    /// Unrecognized or semantic-error response (bad key, no balance, ...).
    Unknown,
    /// The query itself failed (network, timeout, HTTP error).
    Error,
}

/// Fixed error strings the provider returns instead of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSentinel {
    NoNumbers,
    NoBalance,
    BadKey,
    NoActivations,
}

impl ProviderSentinel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderSentinel::NoNumbers => "NO_NUMBERS",
            ProviderSentinel::NoBalance => "NO_BALANCE",
            ProviderSentinel::BadKey => "BAD_KEY",
            ProviderSentinel::NoActivations => "NO_ACTIVATIONS",
        }
    }
}

impl fmt::Display for ProviderSentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw provider response after shape detection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// Blank body.
    Empty,
    /// JSON object or array.
    Json(serde_json::Value),
    /// One of the fixed error strings.
    Sentinel(ProviderSentinel),
    /// `STATUS[:value[:extra]]` plain text.
    Status {
        status: String,
        value: Option<String>,
        extra: Option<String>,
    },
}

/// An activation from the provider's active list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveActivation {
    pub id: String,
    pub phone_number: Option<String>,
    pub service_name: String,
    pub code: Option<String>,
    pub text: Option<String>,
}
