//! Google Sheets v4 REST Client
//!
//! Implements the `SpreadsheetService` port. Every request carries a
//! bearer token obtained from the `CredentialProvider` at call time, so
//! a credential granted after startup is picked up without rewiring.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::types::{BatchUpdateRequest, GoogleErrorBody, ValueRangeRead, ValueRangeWrite};
use crate::domain::export::ExportGrid;
use crate::error::{SyncError, SyncResult};
use crate::ports::credentials::CredentialProvider;
use crate::ports::spreadsheet::SpreadsheetService;

/// Production Sheets API base.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Marker in the service's message for an `addSheet` on an existing tab.
const ALREADY_EXISTS: &str = "already exists";

/// HTTP client for the Google Sheets values and batchUpdate APIs.
pub struct GoogleSheetsClient {
    http: Client,
    base: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl GoogleSheetsClient {
    /// Create a client against the production API.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Self::with_base_url(SHEETS_API_BASE, credentials)
    }

    /// Create a client against an explicit API base.
    pub fn with_base_url(base: &str, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let base = Url::parse(base).context("Invalid Sheets API base URL")?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Sheets API base URL cannot carry a path: {base}");
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Sheets HTTP client")?;

        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    /// `base/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<B: Serialize + Sync>(
        &self,
        spreadsheet_id: &str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> SyncResult<Response> {
        let token = self.credentials.access_token().await?;

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| SyncError::Destination {
            destination: spreadsheet_id.to_string(),
            message: e.to_string(),
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.classify(spreadsheet_id, response).await)
        }
    }

    /// Map a non-success response to the error taxonomy.
    async fn classify(&self, spreadsheet_id: &str, response: Response) -> SyncError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoogleErrorBody>(&body)
            .map_or_else(|_| body.clone(), |b| b.error.message);

        if status == StatusCode::UNAUTHORIZED {
            warn!(spreadsheet = spreadsheet_id, "Sheets API rejected the access token");
            return SyncError::Unauthorized {
                login_url: self.credentials.login_url(),
            };
        }

        if status == StatusCode::BAD_REQUEST && message.contains(ALREADY_EXISTS) {
            return SyncError::DestinationConflict {
                destination: spreadsheet_id.to_string(),
                message,
            };
        }

        SyncError::Destination {
            destination: spreadsheet_id.to_string(),
            message: format!("HTTP {status}: {message}"),
        }
    }
}

#[async_trait]
impl SpreadsheetService for GoogleSheetsClient {
    #[instrument(skip(self))]
    async fn ensure_sheet(&self, spreadsheet_id: &str, title: &str) -> SyncResult<()> {
        let url = self.endpoint(&[&format!("{spreadsheet_id}:batchUpdate")]);
        let body = BatchUpdateRequest::add_sheet(title);

        self.send(spreadsheet_id, Method::POST, url, Some(&body))
            .await?;
        info!(spreadsheet = spreadsheet_id, title, "Sheet created");
        Ok(())
    }

    #[instrument(skip(self, grid), fields(rows = grid.len()))]
    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        grid: &ExportGrid,
    ) -> SyncResult<()> {
        let mut url = self.endpoint(&[spreadsheet_id, "values", range]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let body = ValueRangeWrite {
            range,
            major_dimension: "ROWS",
            values: grid.rows(),
        };

        self.send(spreadsheet_id, Method::PUT, url, Some(&body))
            .await?;
        debug!(spreadsheet = spreadsheet_id, "Range written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> SyncResult<Vec<Vec<String>>> {
        let url = self.endpoint(&[spreadsheet_id, "values", range]);
        let response = self
            .send::<()>(spreadsheet_id, Method::GET, url, None)
            .await?;

        let read: ValueRangeRead = response.json().await.map_err(|e| SyncError::Destination {
            destination: spreadsheet_id.to_string(),
            message: format!("unreadable values response: {e}"),
        })?;
        Ok(read.into_strings())
    }
}
