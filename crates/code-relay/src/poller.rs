//! Per-session provider polling.
//!
//! Each active session gets one periodic task that asks the provider for
//! its status and records newly arrived codes in the store. Tasks are kept
//! in an explicit map so starting twice is a no-op and stopping an unknown
//! id is harmless.

use crate::config::PollerConfig;
use activation_store::{ActivationStore, Message, Session, StoreError};
use chrono::{DateTime, Utc};
use sms_provider_client::{ActivationStatus, SmsProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Floor for the probe period; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What the caller should do after a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Keep polling on the next tick.
    Continue,
    /// The session outlived its TTL.
    Timeout,
    /// The provider reported the rental as cancelled.
    Cancelled,
}

struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    generation: u64,
}

struct PollerInner {
    store: ActivationStore,
    provider: Arc<dyn SmsProvider>,
    config: PollerConfig,
    tasks: Mutex<HashMap<String, PollerHandle>>,
    next_generation: AtomicU64,
}

/// Owner of all per-session polling tasks.
#[derive(Clone)]
pub struct ProviderPoller {
    inner: Arc<PollerInner>,
}

impl ProviderPoller {
    pub fn new(store: ActivationStore, provider: Arc<dyn SmsProvider>, config: PollerConfig) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                store,
                provider,
                config,
                tasks: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// Start polling for a session.
    ///
    /// Returns `false` if a poller is already running for `id`. The TTL is
    /// measured from the session's `created_at`.
    #[instrument(skip(self, session))]
    pub async fn start(&self, id: &str, session: &Session) -> bool {
        let mut tasks = self.inner.tasks.lock().await;

        if tasks.get(id).is_some_and(|handle| !handle.task.is_finished()) {
            debug!("Poller for {} already running", id);
            return false;
        }

        let cancel = CancellationToken::new();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(self.clone().run(
            id.to_string(),
            session.created_at,
            cancel.clone(),
            generation,
        ));

        tasks.insert(
            id.to_string(),
            PollerHandle {
                cancel,
                task,
                generation,
            },
        );

        info!("Started poller for {}", id);
        true
    }

    /// Stop polling for a session.
    ///
    /// A probe already in flight is allowed to finish. Returns `false` if
    /// nothing was running.
    #[instrument(skip(self))]
    pub async fn stop(&self, id: &str) -> bool {
        let Some(handle) = self.inner.tasks.lock().await.remove(id) else {
            return false;
        };

        handle.cancel.cancel();
        info!("Stopped poller for {}", id);
        true
    }

    /// Stop every poller, e.g. on shutdown.
    pub async fn stop_all(&self) -> usize {
        let handles: Vec<_> = self.inner.tasks.lock().await.drain().collect();
        for (_, handle) in &handles {
            handle.cancel.cancel();
        }

        info!("Stopped {} pollers", handles.len());
        handles.len()
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.inner
            .tasks
            .lock()
            .await
            .get(id)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    pub async fn running_count(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .await
            .values()
            .filter(|handle| !handle.task.is_finished())
            .count()
    }

    /// Start pollers for every stored session still within its TTL.
    pub async fn recover(&self) -> usize {
        let now = Utc::now();
        let mut started = 0;

        for (id, session) in self.inner.store.snapshot().await {
            if age(now, session.created_at) > self.inner.config.ttl {
                debug!("Skipping expired session {}", id);
                continue;
            }
            if self.start(&id, &session).await {
                started += 1;
            }
        }

        info!("Recovered {} pollers", started);
        started
    }

    /// Run a single probe for a session.
    pub async fn probe(&self, id: &str, start_time: DateTime<Utc>) -> ProbeOutcome {
        if age(Utc::now(), start_time) > self.inner.config.ttl {
            return ProbeOutcome::Timeout;
        }

        match self.inner.provider.get_status(id).await {
            ActivationStatus::Ok { code, text } => {
                if let Err(e) = self.record_code(id, &code, text).await {
                    warn!("Failed to record code for {}: {}", id, e);
                }
                ProbeOutcome::Continue
            }
            ActivationStatus::Cancelled => ProbeOutcome::Cancelled,
            ActivationStatus::Error => {
                warn!("Status query for {} failed, retrying next tick", id);
                ProbeOutcome::Continue
            }
            status @ (ActivationStatus::Wait | ActivationStatus::Unknown) => {
                debug!("Session {} status: {:?}", id, status);
                ProbeOutcome::Continue
            }
        }
    }

    async fn run(
        self,
        id: String,
        start_time: DateTime<Utc>,
        cancel: CancellationToken,
        generation: u64,
    ) {
        let period = self.inner.config.interval.max(MIN_POLL_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.probe(&id, start_time).await {
                ProbeOutcome::Continue => {}
                ProbeOutcome::Timeout => {
                    info!("Polling for {} reached TTL", id);
                    break;
                }
                ProbeOutcome::Cancelled => {
                    info!("Activation {} cancelled by provider", id);
                    break;
                }
            }
        }

        self.release(&id, generation).await;
    }

    /// Drop the map entry of a finished task unless it was replaced.
    async fn release(&self, id: &str, generation: u64) {
        let mut tasks = self.inner.tasks.lock().await;
        if tasks.get(id).is_some_and(|h| h.generation == generation) {
            tasks.remove(id);
        }
    }

    /// Persist a provider-reported code unless it is already recorded.
    ///
    /// Returns `true` if a new message was written.
    async fn record_code(
        &self,
        id: &str,
        code: &str,
        text: Option<String>,
    ) -> Result<bool, StoreError> {
        let store = &self.inner.store;

        // Never resurrect a session that was removed while polling.
        let Some(session) = store.get(id).await else {
            debug!("Session {} no longer stored, dropping code", id);
            return Ok(false);
        };
        if session.messages.contains_key(code) {
            debug!("Code for {} already recorded", id);
            return Ok(false);
        }

        let text = match text.filter(|t| !t.trim().is_empty()) {
            Some(text) => Some(text),
            None => self.lookup_active(id, &session).await,
        };

        // The fallback lookup is a network round trip; the session may have
        // been removed or the code recorded in the meantime.
        let inserted = store
            .insert_message_if_absent(id, code, Message::from_provider(code, text))
            .await?;
        if !inserted {
            debug!("Session {} removed or code already recorded, dropping code", id);
            return Ok(false);
        }
        info!("Recorded new code for {}", id);

        if let Err(e) = self
            .inner
            .provider
            .set_status(id, self.inner.config.ack_status)
            .await
        {
            warn!("Failed to acknowledge code for {}: {}", id, e);
        }

        Ok(true)
    }

    /// Find the session in the provider's active list for its SMS text,
    /// filling in a missing phone number on the way.
    async fn lookup_active(&self, id: &str, session: &Session) -> Option<String> {
        let activations = match self.inner.provider.list_active_activations().await {
            Ok(activations) => activations,
            Err(e) => {
                warn!("Active activation lookup failed: {}", e);
                return None;
            }
        };

        let activation = activations.into_iter().find(|a| a.id == id)?;

        if session.phone_number.is_none() {
            if let Some(phone) = activation.phone_number {
                if let Err(e) = self.inner.store.fill_phone_number(id, &phone).await {
                    warn!("Failed to store phone number for {}: {}", id, e);
                }
            }
        }

        activation.text.filter(|t| !t.trim().is_empty())
    }
}

fn age(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}
