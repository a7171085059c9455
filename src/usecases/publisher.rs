//! Publisher Use Case - Spreadsheet Fan-out
//!
//! Pushes one export grid to every configured destination. Each
//! destination is independent: they are published concurrently and a
//! failure at one never stops the others. The caller receives the
//! aggregate.
//!
//! Per-destination flow:
//! 1. Make sure the dedicated tab exists (an existing tab is fine)
//! 2. Overwrite the fixed range with the grid, user-entered

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::export::ExportGrid;
use crate::error::{PublishFailures, SyncError, SyncResult};
use crate::ports::credentials::CredentialProvider;
use crate::ports::spreadsheet::SpreadsheetService;

/// Where and how grids are written.
#[derive(Debug, Clone)]
pub struct PublishTarget {
  /// Destination spreadsheet ids.
  pub spreadsheet_ids: Vec<String>,
  /// Dedicated tab title.
  pub sheet_title: String,
  /// Fully qualified A1 range (`<title>!<range>`).
  pub range: String,
}

/// Publishes export grids to spreadsheet destinations.
pub struct Publisher {
  sheets: Arc<dyn SpreadsheetService>,
  credentials: Arc<dyn CredentialProvider>,
  target: PublishTarget,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl Publisher {
  pub fn new(
    sheets: Arc<dyn SpreadsheetService>,
    credentials: Arc<dyn CredentialProvider>,
    target: PublishTarget,
  ) -> Self {
    Self {
      sheets,
      credentials,
      target,
      metrics: None,
    }
  }

  /// Count publish attempts in `metrics`.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn target(&self) -> &PublishTarget {
    &self.target
  }

  /// Fail fast when no credential is held.
  async fn require_credential(&self) -> SyncResult<()> {
    if self.credentials.is_authorized().await {
      Ok(())
    } else {
      Err(SyncError::Unauthorized {
        login_url: self.credentials.login_url(),
      })
    }
  }

  /// Publish `grid` to a single destination.
  ///
  /// # Errors
  /// `Unauthorized` before any request when no credential is held;
  /// otherwise the first failing step's error.
  #[instrument(skip(self, grid), fields(rows = grid.len()))]
  pub async fn publish(&self, spreadsheet_id: &str, grid: &ExportGrid) -> SyncResult<()> {
    self.require_credential().await?;
    self.publish_unchecked(spreadsheet_id, grid).await
  }

  async fn publish_unchecked(&self, spreadsheet_id: &str, grid: &ExportGrid) -> SyncResult<()> {
    match self
      .sheets
      .ensure_sheet(spreadsheet_id, &self.target.sheet_title)
      .await
    {
      Ok(()) => {}
      Err(SyncError::DestinationConflict { message, .. }) => {
        debug!(spreadsheet = spreadsheet_id, detail = %message, "Sheet already present");
      }
      Err(e) => return Err(e),
    }

    self
      .sheets
      .write_range(spreadsheet_id, &self.target.range, grid)
      .await
  }

  /// Publish `grid` to every destination concurrently.
  ///
  /// Returns the number of destinations written.
  ///
  /// # Errors
  /// `Unauthorized` before any request when no credential is held;
  /// `Publish` listing every destination that failed.
  #[instrument(skip(self, grid), fields(destinations = self.target.spreadsheet_ids.len(), rows = grid.len()))]
  pub async fn publish_all(&self, grid: &ExportGrid) -> SyncResult<usize> {
    self.require_credential().await?;

    let attempts = self.target.spreadsheet_ids.iter().map(|id| async move {
      let result = self.publish_unchecked(id, grid).await;
      if let Some(metrics) = &self.metrics {
        metrics.observe_publish(result.is_ok());
      }
      (id.clone(), result)
    });

    let attempted = self.target.spreadsheet_ids.len();
    let mut failures = Vec::new();
    for (id, result) in join_all(attempts).await {
      if let Err(e) = result {
        error!(spreadsheet = %id, error = %e, "Publish failed");
        failures.push((id, e));
      }
    }

    if failures.is_empty() {
      info!(destinations = attempted, "Tables updated");
      Ok(attempted)
    } else {
      Err(PublishFailures {
        attempted,
        failures,
      }
      .into())
    }
  }
}
