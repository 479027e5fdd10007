//! Wires store events to the poller and the dispatcher.

use crate::dispatcher::ChangeDispatcher;
use crate::poller::ProviderPoller;
use activation_store::{ActivationStore, StoreEvent};
use std::future::Future;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The reconciliation pipeline.
///
/// New sessions get a poller, removed sessions lose it, and message
/// changes from any writer are handed to the dispatcher.
#[derive(Clone)]
pub struct Relay {
    store: ActivationStore,
    poller: ProviderPoller,
    dispatcher: ChangeDispatcher,
}

impl Relay {
    pub fn new(store: ActivationStore, poller: ProviderPoller, dispatcher: ChangeDispatcher) -> Self {
        Self {
            store,
            poller,
            dispatcher,
        }
    }

    pub fn store(&self) -> &ActivationStore {
        &self.store
    }

    pub fn poller(&self) -> &ProviderPoller {
        &self.poller
    }

    /// Resume polling for sessions that survived a restart.
    pub async fn recover(&self) -> usize {
        self.poller.recover().await
    }

    /// React to a single store event, waiting for any dispatch to finish.
    pub async fn handle_event(&self, event: StoreEvent) {
        match &event {
            StoreEvent::Added { id, session } => {
                self.poller.start(id, session).await;
            }
            StoreEvent::Changed { .. } => {
                self.dispatcher.handle_event(&event).await;
            }
            StoreEvent::Removed { id } => {
                self.poller.stop(id).await;
            }
        }
    }

    /// Consume store events until `shutdown` fires, then stop all pollers.
    ///
    /// Subscribes before returning, so nothing written after this call is
    /// missed. Poller bookkeeping runs in event order; deliveries run
    /// concurrently so a slow push service does not hold up other sessions.
    pub fn run(&self, shutdown: CancellationToken) -> impl Future<Output = ()> + Send + 'static {
        let relay = self.clone();
        let mut events = Box::pin(self.store.events());

        async move {
            info!("Relay listening for store changes");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.next() => {
                        let Some(event) = event else {
                            break;
                        };
                        debug!("Store event for {}", event.id());

                        if matches!(event, StoreEvent::Changed { .. }) {
                            let dispatcher = relay.dispatcher.clone();
                            tokio::spawn(async move {
                                dispatcher.handle_event(&event).await;
                            });
                        } else {
                            relay.handle_event(event).await;
                        }
                    }
                }
            }

            relay.poller.stop_all().await;
            info!("Relay stopped");
        }
    }
}
