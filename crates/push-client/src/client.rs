//! Web Push sender.

use crate::error::PushError;
use crate::types::NotificationPayload;
use crate::PushSender;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use web_push::{
    ContentEncoding, IsahcWebPushClient, PartialVapidSignatureBuilder, SubscriptionInfo,
    VapidSignatureBuilder, WebPushClient, WebPushMessage, WebPushMessageBuilder,
};

/// Sends encrypted (aes128gcm) Web Push messages signed with VAPID.
pub struct WebPushSender {
    client: IsahcWebPushClient,
    vapid: PartialVapidSignatureBuilder,
    subject: Option<String>,
    ttl: u32,
}

impl WebPushSender {
    /// Create a sender from a PEM-encoded P-256 VAPID private key.
    ///
    /// `subject` is the `sub` claim (a `mailto:` or `https:` contact URI).
    /// `ttl` is how long the push service keeps an undelivered message.
    pub fn new(
        vapid_private_key_pem: &str,
        subject: Option<String>,
        ttl: Duration,
    ) -> Result<Self, PushError> {
        let vapid = VapidSignatureBuilder::from_pem_no_sub(vapid_private_key_pem.as_bytes())
            .map_err(|e| PushError::Transport(format!("invalid VAPID key: {}", e)))?;
        let client = IsahcWebPushClient::new()
            .map_err(|e| PushError::Transport(format!("push client init failed: {}", e)))?;

        Ok(Self {
            client,
            vapid,
            subject,
            ttl: u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX),
        })
    }

    /// Parse the opaque stored subscription into endpoint + keys.
    pub fn subscription_info(subscription: &serde_json::Value) -> Result<SubscriptionInfo, PushError> {
        serde_json::from_value(subscription.clone())
            .map_err(|e| PushError::InvalidSubscription(e.to_string()))
    }

    fn build_message(
        &self,
        info: &SubscriptionInfo,
        content: &[u8],
    ) -> Result<WebPushMessage, PushError> {
        let mut signature = self.vapid.clone().add_sub_info(info);
        if let Some(subject) = &self.subject {
            signature.add_claim("sub", subject.as_str());
        }
        // Signing failures are a server-side key problem, never the subscription's.
        let signature = signature
            .build()
            .map_err(|e| PushError::Transport(format!("VAPID signing failed: {}", e)))?;

        let mut builder = WebPushMessageBuilder::new(info);
        builder.set_ttl(self.ttl);
        builder.set_payload(ContentEncoding::Aes128Gcm, content);
        builder.set_vapid_signature(signature);

        Ok(builder.build()?)
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    #[instrument(skip_all, fields(title = %payload.title))]
    async fn send(
        &self,
        subscription: &serde_json::Value,
        payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        let info = Self::subscription_info(subscription)?;
        let content =
            serde_json::to_vec(payload).map_err(|e| PushError::Transport(e.to_string()))?;
        let message = self.build_message(&info, &content)?;

        match self.client.send(message).await {
            Ok(()) => {
                debug!("Push delivered to {}", info.endpoint);
                Ok(())
            }
            Err(e) => {
                let error = PushError::from(e);
                warn!("Push to {} failed: {}", info.endpoint, error);
                Err(error)
            }
        }
    }
}
