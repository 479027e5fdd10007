//! Turns stored messages into push notifications.

use crate::dedup::DedupGuard;
use crate::notification::build_notification;
use activation_store::{ActivationStore, ChangeScope, Session, StoreEvent};
use push_client::PushSender;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tally of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
    pub subscription_removed: bool,
}

/// Reacts to message changes by delivering every unsent message.
#[derive(Clone)]
pub struct ChangeDispatcher {
    store: ActivationStore,
    push: Arc<dyn PushSender>,
    dedup: DedupGuard,
    icon: Option<String>,
}

impl ChangeDispatcher {
    pub fn new(
        store: ActivationStore,
        push: Arc<dyn PushSender>,
        dedup: DedupGuard,
        icon: Option<String>,
    ) -> Self {
        Self {
            store,
            push,
            dedup,
            icon,
        }
    }

    /// Dispatch for a store event. Only message changes trigger delivery.
    pub async fn handle_event(&self, event: &StoreEvent) -> DispatchSummary {
        match event {
            StoreEvent::Changed {
                id,
                session,
                scope: ChangeScope::Messages,
            } => self.handle_change(id, session).await,
            _ => DispatchSummary::default(),
        }
    }

    /// Deliver the unsent messages of a changed session.
    ///
    /// The event only says which messages to look at. Before each send the
    /// session is read again, so a subscription removed or replaced since
    /// the event is honored and messages already marked sent are skipped.
    /// Sessions without a subscription are skipped, not queued.
    ///
    /// A failed send releases its dedup entry, so a later change inside the
    /// dedup window can send the same code again.
    #[instrument(skip(self, session))]
    pub async fn handle_change(&self, id: &str, session: &Session) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        if session.messages.is_empty() {
            return summary;
        }

        for (key, _) in session.pending_messages() {
            let Some(current) = self.store.get(id).await else {
                debug!("Session {} removed, stopping dispatch", id);
                break;
            };
            let Some(subscription) = current.subscription.as_ref() else {
                debug!("Session {} has no subscription", id);
                break;
            };
            let message = match current.messages.get(key) {
                Some(message) if !message.push_sent => message,
                _ => continue,
            };

            let dedup_key = message.code.as_deref().unwrap_or(key);
            if self.dedup.should_suppress(id, dedup_key).await {
                debug!("Suppressed duplicate dispatch of {} for {}", key, id);
                summary.suppressed += 1;
                if let Err(e) = self.store.mark_push_sent(id, key).await {
                    warn!("Failed to mark {} as sent: {}", key, e);
                }
                continue;
            }

            let payload = build_notification(&current, message, self.icon.as_deref());

            match self.push.send(subscription, &payload).await {
                Ok(()) => {
                    info!("Notification sent for {}", id);
                    summary.sent += 1;
                    if let Err(e) = self.store.mark_push_sent(id, key).await {
                        warn!("Failed to mark {} as sent: {}", key, e);
                    }
                }
                Err(e) if e.is_permanent() => {
                    warn!("Subscription for {} is no longer valid: {}", id, e);
                    self.dedup.forget(id, dedup_key).await;
                    summary.failed += 1;
                    match self.store.remove_subscription(id).await {
                        Ok(removed) => summary.subscription_removed = removed,
                        Err(e) => warn!("Failed to remove subscription for {}: {}", id, e),
                    }
                    break;
                }
                Err(e) => {
                    warn!("Push delivery for {} failed: {}", id, e);
                    self.dedup.forget(id, dedup_key).await;
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
