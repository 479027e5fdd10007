//! Web Push (RFC 8030) notification delivery.
//!
//! Device subscriptions are opaque JSON (`{endpoint, keys: {p256dh, auth}}`)
//! as produced by the browser's `PushManager.subscribe()`. Failures are
//! classified so callers can drop subscriptions that will never work again.

mod client;
mod error;
mod types;

pub use client::WebPushSender;
pub use error::PushError;
pub use types::NotificationPayload;

use async_trait::async_trait;

/// Delivers a notification to one device subscription.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        subscription: &serde_json::Value,
        payload: &NotificationPayload,
    ) -> Result<(), PushError>;
}
