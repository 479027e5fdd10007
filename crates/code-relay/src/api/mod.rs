//! HTTP API used by client devices.

mod handlers;
mod types;

pub use handlers::*;
pub use types::*;

use crate::poller::ProviderPoller;
use activation_store::ActivationStore;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Activation sessions
    pub store: ActivationStore,
    /// Provider poller, for health reporting
    pub poller: ProviderPoller,
}

impl AppState {
    pub fn new(store: ActivationStore, poller: ProviderPoller) -> Self {
        Self { store, poller }
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/v1/activations/:id",
            get(handlers::get_activation)
                .put(handlers::put_activation)
                .delete(handlers::delete_activation),
        )
        .route(
            "/v1/activations/:id/subscription",
            put(handlers::put_subscription).delete(handlers::delete_subscription),
        )
        .route(
            "/v1/activations/:id/messages",
            post(handlers::submit_message),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
