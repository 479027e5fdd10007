//! SMS code relay - Main entry point.

use activation_store::ActivationStore;
use anyhow::Context;
use code_relay::{
    api::{create_router, AppState},
    ChangeDispatcher, Config, DedupGuard, ProviderPoller, Relay, RelayResult,
};
use push_client::WebPushSender;
use sms_provider_client::ProviderClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> RelayResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.log.level);

    info!("Starting SMS code relay...");

    // Initialize storage
    let store = if config.store.persist {
        ActivationStore::with_snapshot(config.store.path.clone())
            .await
            .context("Failed to load activation snapshot")?
    } else {
        info!("Persistence disabled, using in-memory store");
        ActivationStore::new()
    };

    // Initialize clients
    let provider = Arc::new(
        ProviderClient::new(
            &config.provider.base_url,
            &config.provider.api_key,
            config.provider.timeout,
        )
        .context("Failed to create provider client")?,
    );
    info!("SMS provider endpoint: {}", provider.base_url());

    // PEM keys passed through env files often carry escaped newlines.
    let vapid_key = config.push.vapid_private_key.replace("\\n", "\n");
    let push = Arc::new(
        WebPushSender::new(
            &vapid_key,
            Some(config.push.vapid_subject.clone()),
            config.push.ttl,
        )
        .context("Failed to create Web Push sender")?,
    );

    // Assemble the pipeline
    let dedup = DedupGuard::new(config.dedup.window);
    let poller = ProviderPoller::new(store.clone(), provider, config.poller.clone());
    let dispatcher = ChangeDispatcher::new(store.clone(), push, dedup, config.push.icon.clone());
    let relay = Relay::new(store.clone(), poller.clone(), dispatcher);

    let shutdown = CancellationToken::new();
    let relay_task = tokio::spawn(relay.run(shutdown.clone()));

    let recovered = relay.recover().await;
    info!(
        "Monitoring {} activations (interval={:?}, ttl={:?})",
        recovered, config.poller.interval, config.poller.ttl
    );

    // HTTP API
    let app = create_router(AppState::new(store, poller));

    let addr = SocketAddr::new(
        config.server.listen_addr.parse().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = signal::ctrl_c().await;
            info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await
        .context("Server error")?;

    info!("Shutting down...");
    shutdown.cancel();
    relay_task.await.context("Relay task failed")?;

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
