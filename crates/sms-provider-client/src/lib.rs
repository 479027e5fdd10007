//! SMS activation provider API client.

mod client;
mod error;
mod parse;
mod types;

pub use client::ProviderClient;
pub use error::ProviderError;
pub use parse::{parse_active_activations, parse_response, parse_status};
pub use types::*;

use async_trait::async_trait;

/// Provider operations the relay depends on.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Current status of an activation.
    ///
    /// Never fails: transport errors come back as `ActivationStatus::Error`
    /// and unrecognized responses as `ActivationStatus::Unknown`.
    async fn get_status(&self, id: &str) -> ActivationStatus;

    /// Acknowledge an activation state change.
    async fn set_status(&self, id: &str, status: u8) -> Result<(), ProviderError>;

    /// Every activation the account currently holds.
    async fn list_active_activations(&self) -> Result<Vec<ActiveActivation>, ProviderError>;
}
