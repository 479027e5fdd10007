//! Session, message and change-event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder body for messages that arrive without readable text.
pub const PLACEHOLDER_TEXT: &str = "New message";

/// Service label used when the provider does not report one.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Where a message entered the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageSource {
    /// Submitted directly by a client device.
    Client,
    /// Discovered by the provider poller.
    ProviderPoll,
}

/// A received SMS within an activation session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default = "default_text")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Flips false -> true once a notification went out. Never reset.
    #[serde(default)]
    pub push_sent: bool,
    pub source: MessageSource,
}

impl Message {
    /// A message discovered by polling the provider.
    pub fn from_provider(code: impl Into<String>, text: Option<String>) -> Self {
        Self {
            code: Some(code.into()),
            text: text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(default_text),
            timestamp: Utc::now(),
            push_sent: false,
            source: MessageSource::ProviderPoll,
        }
    }

    /// A message submitted by a client device.
    pub fn from_client(code: Option<String>, text: Option<String>) -> Self {
        Self {
            code,
            text: text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(default_text),
            timestamp: Utc::now(),
            push_sent: false,
            source: MessageSource::Client,
        }
    }
}

/// One rented number awaiting verification codes, keyed by activation id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    pub created_at: DateTime<Utc>,
    /// Opaque device push credential. `None` means no device is listening.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<serde_json::Value>,
    #[serde(default)]
    pub messages: BTreeMap<String, Message>,
}

impl Session {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            phone_number: None,
            service_name: default_service_name(),
            created_at,
            subscription: None,
            messages: BTreeMap::new(),
        }
    }

    /// Messages still waiting for a notification.
    pub fn pending_messages(&self) -> impl Iterator<Item = (&String, &Message)> {
        self.messages.iter().filter(|(_, m)| !m.push_sent)
    }

    /// Apply a merge patch. Returns the scope of the change.
    pub(crate) fn apply(&mut self, patch: SessionPatch) -> ChangeScope {
        let only_subscription = patch.phone_number.is_none()
            && patch.service_name.is_none()
            && patch.created_at.is_none();

        if let Some(phone) = patch.phone_number {
            self.phone_number = Some(phone);
        }
        if let Some(service) = patch.service_name {
            self.service_name = service;
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = created_at;
        }

        match patch.subscription {
            Some(subscription) => {
                self.subscription = Some(subscription);
                if only_subscription {
                    ChangeScope::Subscription
                } else {
                    ChangeScope::Session
                }
            }
            None => ChangeScope::Session,
        }
    }
}

/// Partial session update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subscription: Option<serde_json::Value>,
}

impl SessionPatch {
    pub fn phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    pub fn service_name(mut self, service: impl Into<String>) -> Self {
        self.service_name = Some(service.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn subscription(mut self, subscription: serde_json::Value) -> Self {
        self.subscription = Some(subscription);
        self
    }
}

/// Which part of a session a `Changed` event touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// Metadata such as phone number or service name.
    Session,
    /// Only the push subscription was attached, replaced or removed.
    Subscription,
    /// A message was written or its flags changed.
    Messages,
}

/// Child-level change notification, emitted after every mutation.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Added {
        id: String,
        session: Session,
    },
    Changed {
        id: String,
        session: Session,
        scope: ChangeScope,
    },
    Removed {
        id: String,
    },
}

impl StoreEvent {
    pub fn id(&self) -> &str {
        match self {
            StoreEvent::Added { id, .. }
            | StoreEvent::Changed { id, .. }
            | StoreEvent::Removed { id } => id,
        }
    }
}

fn default_text() -> String {
    PLACEHOLDER_TEXT.into()
}

fn default_service_name() -> String {
    UNKNOWN_SERVICE.into()
}
