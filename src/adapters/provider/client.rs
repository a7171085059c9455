//! Tariff API HTTP Client
//!
//! Implements the `TariffProvider` port with a single authenticated GET
//! per fetch. No retry loop here: a failed fetch fails the run and the
//! next scheduled trigger tries again.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use super::types::parse_document;
use crate::config::{ProviderConfig, Secret};
use crate::domain::tariff::TariffDocument;
use crate::error::{SyncError, SyncResult};
use crate::ports::tariff_provider::TariffProvider;

/// Maximum number of body bytes echoed into error messages.
const ERROR_BODY_PREVIEW: usize = 512;

/// HTTP client for the marketplace box-tariff endpoint.
pub struct TariffApiClient {
    /// Underlying HTTP client.
    http: Client,
    /// Endpoint URL.
    url: String,
    /// API key sent verbatim in the `Authorization` header.
    api_key: Secret,
}

impl TariffApiClient {
    /// Create a new client from configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Self::with_endpoint(&config.url, config.api_key.clone(), config.timeout)
    }

    /// Create a client against an explicit endpoint.
    pub fn with_endpoint(url: &str, api_key: Secret, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            url: url.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl TariffProvider for TariffApiClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_tariffs(&self, date: NaiveDate) -> SyncResult<TariffDocument> {
        let response = self
            .http
            .get(&self.url)
            .header(AUTHORIZATION, self.api_key.expose())
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Tariff request failed");
                SyncError::ProviderUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            warn!(status = %status, "Tariff API returned an error status");
            return Err(SyncError::ProviderUnavailable(format!(
                "HTTP {status}: {preview}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::ProviderUnavailable(e.to_string()))?;
        debug!(bytes = body.len(), "Tariff response received");

        let document = parse_document(&body)?;
        info!(
            entries = document.entries.len(),
            next_box = ?document.next_box_date,
            till_max = ?document.till_max_date,
            "Tariff document fetched"
        );

        Ok(document)
    }
}
