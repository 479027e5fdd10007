//! Shared fixtures for integration tests.

#![allow(dead_code)]

use activation_store::ActivationStore;
use async_trait::async_trait;
use code_relay::{
    config::PollerConfig, ChangeDispatcher, DedupGuard, ProviderPoller, Relay,
};
use push_client::{NotificationPayload, PushError, PushSender};
use sms_provider_client::ProviderClient;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

pub const HANDLER_PATH: &str = "/stubs/handler_api.php";

/// Push sender that records what it was asked to deliver.
#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<(serde_json::Value, NotificationPayload)>>,
}

impl RecordingPush {
    pub fn sent(&self) -> Vec<NotificationPayload> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(
        &self,
        subscription: &serde_json::Value,
        payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        self.sent
            .lock()
            .unwrap()
            .push((subscription.clone(), payload.clone()));
        Ok(())
    }
}

pub fn poller_config() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_millis(25),
        ttl: Duration::from_secs(1200),
        ack_status: 3,
    }
}

pub fn provider_client(server: &MockServer) -> Arc<ProviderClient> {
    Arc::new(
        ProviderClient::new(
            format!("{}{}", server.uri(), HANDLER_PATH),
            "test-key",
            Duration::from_secs(2),
        )
        .unwrap(),
    )
}

/// Build the full pipeline against a mock provider.
pub fn build_relay(
    store: &ActivationStore,
    server: &MockServer,
    push: Arc<RecordingPush>,
) -> Relay {
    let poller = ProviderPoller::new(store.clone(), provider_client(server), poller_config());
    let dispatcher = ChangeDispatcher::new(
        store.clone(),
        push,
        DedupGuard::new(Duration::from_secs(60)),
        Some("https://cdn.example.com/icon.png".into()),
    );
    Relay::new(store.clone(), poller, dispatcher)
}

pub fn subscription() -> serde_json::Value {
    serde_json::json!({
        "endpoint": "https://push.example.com/send/device-1",
        "keys": {
            "p256dh": "BNXXoj5RAxVtVAbnpyCu9qEICzmPRV99eTKhsoCLhojaEA5pLuRZW9woP4TYi1_QX3UcKMNVI-iLevLPVpZ1zUk",
            "auth": "6Fuid9PICP3xPGxS7ofq5g"
        }
    })
}

/// Number of `getStatus` requests the mock provider has served.
pub async fn status_queries(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.query().unwrap_or("").contains("action=getStatus"))
        .count()
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(250)).await;
}
