//! Hand-written collaborators for unit tests.

use activation_store::ActivationStore;
use async_trait::async_trait;
use push_client::{NotificationPayload, PushError, PushSender};
use sms_provider_client::{ActivationStatus, ActiveActivation, ProviderError, SmsProvider};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted provider: pops one status per query, then repeats the fallback.
pub struct MockProvider {
    statuses: Mutex<VecDeque<ActivationStatus>>,
    fallback: ActivationStatus,
    active: Vec<ActiveActivation>,
    fail_list: bool,
    fail_ack: bool,
    remove_on_list: Option<(ActivationStore, String)>,
    pub status_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub acks: Mutex<Vec<(String, u8)>>,
}

impl MockProvider {
    pub fn new(fallback: ActivationStatus) -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            fallback,
            active: Vec::new(),
            fail_list: false,
            fail_ack: false,
            remove_on_list: None,
            status_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            acks: Mutex::new(Vec::new()),
        }
    }

    pub fn waiting() -> Self {
        Self::new(ActivationStatus::Wait)
    }

    pub fn with_statuses(self, statuses: Vec<ActivationStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_active(mut self, active: Vec<ActiveActivation>) -> Self {
        self.active = active;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_ack(mut self) -> Self {
        self.fail_ack = true;
        self
    }

    /// Delete `id` from `store` while answering the active-list query.
    pub fn removing_on_list(mut self, store: ActivationStore, id: &str) -> Self {
        self.remove_on_list = Some((store, id.to_string()));
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn acks(&self) -> Vec<(String, u8)> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsProvider for MockProvider {
    async fn get_status(&self, _id: &str) -> ActivationStatus {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn set_status(&self, id: &str, status: u8) -> Result<(), ProviderError> {
        self.acks.lock().unwrap().push((id.to_string(), status));
        if self.fail_ack {
            return Err(ProviderError::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(())
    }

    async fn list_active_activations(&self) -> Result<Vec<ActiveActivation>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((store, id)) = &self.remove_on_list {
            let _ = store.remove(id).await;
        }
        if self.fail_list {
            return Err(ProviderError::Api {
                status: 500,
                message: "boom".into(),
            });
        }
        Ok(self.active.clone())
    }
}

/// Push sender that records payloads and answers with a fixed outcome.
pub struct RecordingPushSender {
    outcome: fn() -> Result<(), PushError>,
    delay: Duration,
    pub sent: Mutex<Vec<NotificationPayload>>,
}

impl RecordingPushSender {
    pub fn succeeding() -> Self {
        Self::new(|| Ok(()))
    }

    pub fn new(outcome: fn() -> Result<(), PushError>) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sent(&self) -> Vec<NotificationPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send(
        &self,
        _subscription: &serde_json::Value,
        payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        self.sent.lock().unwrap().push(payload.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.outcome)()
    }
}

pub fn active(id: &str, phone: Option<&str>, text: Option<&str>) -> ActiveActivation {
    ActiveActivation {
        id: id.into(),
        phone_number: phone.map(String::from),
        service_name: "tg".into(),
        code: None,
        text: text.map(String::from),
    }
}

pub fn subscription() -> serde_json::Value {
    serde_json::json!({
        "endpoint": "https://push.example.com/send/device-1",
        "keys": {"p256dh": "key", "auth": "secret"}
    })
}
