//! SMS provider HTTP client.

use crate::error::ProviderError;
use crate::parse::{parse_active_activations, parse_response, parse_status};
use crate::types::*;
use crate::SmsProvider;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Maximum activations requested per `getActiveActivations` call.
const ACTIVE_LIST_LIMIT: u32 = 100;

/// Client for the provider's `handler_api` endpoint.
///
/// Every call is a GET with `api_key` and `action` query parameters and
/// a plain-text or JSON body in return. The API key is stored using
/// `SecretString` to keep it out of logs and debug output.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl ProviderClient {
    /// Create a new provider client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: SecretString::new(api_key.into()),
        })
    }

    /// Get the configured endpoint.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the status of an activation, surfacing transport errors.
    #[instrument(skip(self))]
    pub async fn try_get_status(&self, id: &str) -> Result<ActivationStatus, ProviderError> {
        let body = self.call("getStatus", &[("id", id)]).await?;
        let response = parse_response(&body);

        if let ProviderResponse::Sentinel(sentinel) = &response {
            warn!("getStatus({}) rejected by provider: {}", id, sentinel);
        }

        let status = parse_status(&response);
        debug!("getStatus({}) -> {:?}", id, status);
        Ok(status)
    }

    /// Acknowledge an activation state change.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &str, status: u8) -> Result<(), ProviderError> {
        let status = status.to_string();
        let body = self
            .call("setStatus", &[("id", id), ("status", status.as_str())])
            .await?;

        if let ProviderResponse::Sentinel(sentinel) = parse_response(&body) {
            warn!("setStatus({}, {}) rejected by provider: {}", id, status, sentinel);
        }
        Ok(())
    }

    /// List the account's active activations.
    #[instrument(skip(self))]
    pub async fn active_activations(&self) -> Result<Vec<ActiveActivation>, ProviderError> {
        let limit = ACTIVE_LIST_LIMIT.to_string();
        let body = self
            .call("getActiveActivations", &[("limit", limit.as_str())])
            .await?;

        let activations = parse_active_activations(&parse_response(&body));
        debug!("Provider reports {} active activations", activations.len());
        Ok(activations)
    }

    /// Issue a single API call and return the raw body.
    async fn call(&self, action: &str, params: &[(&str, &str)]) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("api_key", self.api_key.expose_secret().as_str()),
                ("action", action),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        debug!(
            "{} response: {}",
            action,
            body.chars().take(200).collect::<String>()
        );
        Ok(body)
    }
}

#[async_trait]
impl SmsProvider for ProviderClient {
    async fn get_status(&self, id: &str) -> ActivationStatus {
        match self.try_get_status(id).await {
            Ok(status) => status,
            Err(e) => {
                error!("getStatus({}) failed: {}", id, e);
                ActivationStatus::Error
            }
        }
    }

    async fn set_status(&self, id: &str, status: u8) -> Result<(), ProviderError> {
        self.update_status(id, status).await
    }

    async fn list_active_activations(&self) -> Result<Vec<ActiveActivation>, ProviderError> {
        self.active_activations().await
    }
}
