//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SMS provider configuration
    pub provider: ProviderConfig,

    /// Web Push configuration
    pub push: PushConfig,

    /// Provider poller configuration
    #[serde(default)]
    pub poller: PollerConfig,

    /// Duplicate-notification guard configuration
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Activation store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider API key
    pub api_key: String,

    /// `handler_api` endpoint
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_provider_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// PEM-encoded P-256 VAPID private key
    pub vapid_private_key: String,

    /// VAPID `sub` claim (mailto: or https: contact)
    #[serde(default = "default_vapid_subject")]
    pub vapid_subject: String,

    /// Notification icon URL
    #[serde(default = "default_icon")]
    pub icon: Option<String>,

    /// How long push services keep undelivered notifications
    #[serde(default = "default_push_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Delay between provider probes for one session
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Session age after which polling stops
    #[serde(default = "default_session_ttl", with = "humantime_serde")]
    pub ttl: Duration,

    /// `setStatus` value sent after a code is recorded
    #[serde(default = "default_ack_status")]
    pub ack_status: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// How long a dispatched (session, code) pair is remembered
    #[serde(default = "default_dedup_window", with = "humantime_serde")]
    pub window: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON snapshot file
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, sessions live in memory only)
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            ttl: default_session_ttl(),
            ack_status: default_ack_status(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window: default_dedup_window(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
            persist: default_true(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_provider_url() -> String {
    "https://hero-sms.com/stubs/handler_api.php".into()
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_vapid_subject() -> String {
    "mailto:admin@example.com".into()
}

fn default_icon() -> Option<String> {
    Some("https://cdn-icons-png.flaticon.com/512/561/561127.png".into())
}

fn default_push_ttl() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_ack_status() -> u8 {
    sms_provider_client::STATUS_READY_FOR_NEXT_CODE
}

fn default_dedup_window() -> Duration {
    Duration::from_secs(60)
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("/data/activations.json")
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Phone numbers and activation ids must stay strings.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let poller = PollerConfig::default();
        assert_eq!(poller.interval, Duration::from_secs(3));
        assert_eq!(poller.ttl, Duration::from_secs(1200));
        assert_eq!(poller.ack_status, 3);

        assert_eq!(DedupConfig::default().window, Duration::from_secs(60));
        assert_eq!(ServerConfig::default().port, 5000);
        assert!(StoreConfig::default().persist);
    }

    #[test]
    fn test_deserialize_with_humantime() {
        let json = serde_json::json!({
            "provider": {"api_key": "k", "timeout": "2s"},
            "push": {"vapid_private_key": "pem"},
            "poller": {"interval": "500ms", "ttl": "5m"},
            "dedup": {"window": "90s"}
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.provider.timeout, Duration::from_secs(2));
        assert_eq!(config.provider.base_url, default_provider_url());
        assert_eq!(config.poller.interval, Duration::from_millis(500));
        assert_eq!(config.poller.ttl, Duration::from_secs(300));
        assert_eq!(config.poller.ack_status, 3);
        assert_eq!(config.dedup.window, Duration::from_secs(90));
        assert_eq!(config.push.icon, default_icon());
        assert_eq!(config.log.level, "info");
    }
}
