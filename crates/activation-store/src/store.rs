//! In-memory activation store with change notifications.

use crate::error::StoreError;
use crate::snapshot::SnapshotFile;
use crate::types::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tokio_stream::Stream;
use tracing::{debug, info, instrument, warn};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 1024;

/// Shared store of activation sessions.
///
/// Every mutation is applied under a single write lock and then broadcast
/// to subscribers as a child-level `StoreEvent` carrying the new session
/// state. Writes are last-writer-wins per field; there are no
/// multi-field transactions.
#[derive(Clone)]
pub struct ActivationStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    events: broadcast::Sender<StoreEvent>,
    snapshot: Option<Arc<SnapshotFile>>,
}

impl Default for ActivationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationStore {
    /// Create an empty, memory-only store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            events,
            snapshot: None,
        }
    }

    /// Create a store backed by a JSON snapshot file, loading existing sessions.
    pub async fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let file = SnapshotFile::new(path);
        let sessions = file.load().await?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        info!(
            "Activation store initialized from snapshot ({} sessions)",
            sessions.len()
        );

        Ok(Self {
            sessions: Arc::new(RwLock::new(sessions)),
            events,
            snapshot: Some(Arc::new(file)),
        })
    }

    /// Read a single session.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Read a single message of a session.
    pub async fn get_message(&self, id: &str, key: &str) -> Option<Message> {
        self.sessions
            .read()
            .await
            .get(id)
            .and_then(|s| s.messages.get(key))
            .cloned()
    }

    /// Merge-write session fields, creating the session if needed.
    #[instrument(skip(self, patch))]
    pub async fn put(&self, id: &str, patch: SessionPatch) -> Result<(), StoreError> {
        self.mutate(|sessions| {
            let event = match sessions.get_mut(id) {
                Some(session) => {
                    let scope = session.apply(patch);
                    StoreEvent::Changed {
                        id: id.to_string(),
                        session: session.clone(),
                        scope,
                    }
                }
                None => {
                    let mut session =
                        Session::new(patch.created_at.unwrap_or_else(chrono::Utc::now));
                    session.apply(patch);
                    sessions.insert(id.to_string(), session.clone());
                    debug!("Session {} created", id);
                    StoreEvent::Added {
                        id: id.to_string(),
                        session,
                    }
                }
            };
            ((), Some(event))
        })
        .await
    }

    /// Write a message at `messages/{key}`, replacing any existing value.
    ///
    /// Callers that must not clobber an existing message use
    /// `insert_message_if_absent` instead.
    #[instrument(skip(self, message))]
    pub async fn put_message(
        &self,
        id: &str,
        key: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        self.mutate(|sessions| {
            let event = match sessions.get_mut(id) {
                Some(session) => {
                    session.messages.insert(key.to_string(), message);
                    StoreEvent::Changed {
                        id: id.to_string(),
                        session: session.clone(),
                        scope: ChangeScope::Messages,
                    }
                }
                None => {
                    let mut session = Session::new(chrono::Utc::now());
                    session.messages.insert(key.to_string(), message);
                    sessions.insert(id.to_string(), session.clone());
                    StoreEvent::Added {
                        id: id.to_string(),
                        session,
                    }
                }
            };
            ((), Some(event))
        })
        .await
    }

    /// Write a message only if the session exists and the key is free.
    ///
    /// Never creates a session. Returns `false` without emitting an event
    /// when the session is gone or the key is taken.
    #[instrument(skip(self, message))]
    pub async fn insert_message_if_absent(
        &self,
        id: &str,
        key: &str,
        message: Message,
    ) -> Result<bool, StoreError> {
        self.mutate(|sessions| {
            let Some(session) = sessions.get_mut(id) else {
                return (false, None);
            };
            if session.messages.contains_key(key) {
                return (false, None);
            }
            session.messages.insert(key.to_string(), message);

            let event = StoreEvent::Changed {
                id: id.to_string(),
                session: session.clone(),
                scope: ChangeScope::Messages,
            };
            (true, Some(event))
        })
        .await
    }

    /// Set the phone number of an existing session that has none.
    ///
    /// Returns `false` if the session is gone or already has a number.
    #[instrument(skip(self))]
    pub async fn fill_phone_number(&self, id: &str, phone: &str) -> Result<bool, StoreError> {
        self.mutate(|sessions| {
            let Some(session) = sessions.get_mut(id) else {
                return (false, None);
            };
            if session.phone_number.is_some() {
                return (false, None);
            }
            session.phone_number = Some(phone.to_string());

            let event = StoreEvent::Changed {
                id: id.to_string(),
                session: session.clone(),
                scope: ChangeScope::Session,
            };
            (true, Some(event))
        })
        .await
    }

    /// Set `pushSent = true` on a message.
    ///
    /// Returns `false` without emitting an event if the message is missing
    /// or already marked.
    #[instrument(skip(self))]
    pub async fn mark_push_sent(&self, id: &str, key: &str) -> Result<bool, StoreError> {
        self.mutate(|sessions| {
            let Some(session) = sessions.get_mut(id) else {
                return (false, None);
            };
            match session.messages.get_mut(key) {
                Some(message) if !message.push_sent => message.push_sent = true,
                _ => return (false, None),
            }

            let event = StoreEvent::Changed {
                id: id.to_string(),
                session: session.clone(),
                scope: ChangeScope::Messages,
            };
            (true, Some(event))
        })
        .await
    }

    /// Attach or replace the device push subscription.
    pub async fn set_subscription(
        &self,
        id: &str,
        subscription: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.put(id, SessionPatch::default().subscription(subscription))
            .await
    }

    /// Detach the device push subscription.
    ///
    /// Returns `false` if the session has no subscription.
    #[instrument(skip(self))]
    pub async fn remove_subscription(&self, id: &str) -> Result<bool, StoreError> {
        self.mutate(|sessions| {
            let Some(session) = sessions.get_mut(id) else {
                return (false, None);
            };
            if session.subscription.take().is_none() {
                return (false, None);
            }

            let event = StoreEvent::Changed {
                id: id.to_string(),
                session: session.clone(),
                scope: ChangeScope::Subscription,
            };
            (true, Some(event))
        })
        .await
    }

    /// Delete a session and everything under it.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .mutate(|sessions| {
                if sessions.remove(id).is_none() {
                    return (false, None);
                }
                (true, Some(StoreEvent::Removed { id: id.to_string() }))
            })
            .await?;

        if removed {
            info!("Removed session {}", id);
        }
        Ok(removed)
    }

    /// One-shot read of every session.
    pub async fn snapshot(&self) -> HashMap<String, Session> {
        self.sessions.read().await.clone()
    }

    /// Number of sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Subscribe to change events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Change events as an async stream.
    ///
    /// A subscriber that falls behind skips the missed events and keeps going.
    pub fn events(&self) -> impl Stream<Item = StoreEvent> {
        let mut receiver = self.events.subscribe();

        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event subscriber lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Apply a mutation under the write lock, persist it, then broadcast.
    ///
    /// With a snapshot configured the change is made on a copy and only
    /// swapped in once it is on disk, so a failed save leaves memory, disk
    /// and subscribers all unchanged. A closure returning no event made no
    /// change.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Session>) -> (T, Option<StoreEvent>),
    ) -> Result<T, StoreError> {
        let mut sessions = self.sessions.write().await;

        let (value, event) = match &self.snapshot {
            Some(snapshot) => {
                let mut next = sessions.clone();
                let (value, event) = f(&mut next);
                if event.is_some() {
                    snapshot.save(&next).await?;
                    *sessions = next;
                }
                (value, event)
            }
            None => f(&mut sessions),
        };

        if let Some(event) = event {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
        Ok(value)
    }
}
