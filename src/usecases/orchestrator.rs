//! Orchestrator Use Case - Full and Export-only Cycles
//!
//! Sequences the pipeline stages for one run. A failing stage aborts
//! only the current run; the error is logged here and handed back, and
//! the next trigger runs as usual.
//!
//! Cycles:
//! - Full: fetch → reconcile → replace → project → publish
//! - Export-only: project → publish from what is persisted for today

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::export_projector::ExportProjector;
use super::publisher::Publisher;
use super::snapshot_sync::{SnapshotSummary, SnapshotSync};
use crate::adapters::metrics::MetricsRegistry;
use crate::error::SyncResult;

/// The local calendar day snapshots are keyed by.
pub fn today() -> NaiveDate {
  Local::now().date_naive()
}

/// Which cycle a trigger runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleKind {
  /// Refresh the snapshot from the provider, then export.
  Full,
  /// Export the persisted snapshot only.
  ExportOnly,
}

impl CycleKind {
  /// Label used in logs and metrics.
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Full => "full",
      Self::ExportOnly => "export",
    }
  }
}

impl fmt::Display for CycleKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
  /// Correlates all log lines of the run.
  pub run_id: Uuid,
  pub kind: CycleKind,
  /// Snapshot date the run worked on.
  pub date: NaiveDate,
  /// Present for full cycles.
  pub snapshot: Option<SnapshotSummary>,
  /// Data rows exported (header excluded).
  pub rows_exported: usize,
  /// Destinations written.
  pub destinations: usize,
}

/// Runs the two pipeline cycles.
pub struct Orchestrator {
  sync: SnapshotSync,
  projector: ExportProjector,
  publisher: Publisher,
  metrics: Arc<MetricsRegistry>,
}

impl Orchestrator {
  pub fn new(
    sync: SnapshotSync,
    projector: ExportProjector,
    publisher: Publisher,
    metrics: Arc<MetricsRegistry>,
  ) -> Self {
    Self {
      sync,
      projector,
      publisher,
      metrics,
    }
  }

  /// Run `kind` for today, logging and counting the outcome.
  pub async fn run(&self, kind: CycleKind) -> SyncResult<CycleReport> {
    self.run_for(kind, today()).await
  }

  /// Run `kind` for an explicit date, logging and counting the outcome.
  pub async fn run_for(&self, kind: CycleKind, date: NaiveDate) -> SyncResult<CycleReport> {
    let run_id = Uuid::new_v4();
    let span = info_span!("cycle", %run_id, cycle = kind.as_str(), %date);

    async move {
      let started = Instant::now();
      info!("Cycle started");

      let result = match kind {
        CycleKind::Full => self.full_cycle(run_id, date).await,
        CycleKind::ExportOnly => self.export_cycle(run_id, date, None).await,
      };

      let elapsed = started.elapsed().as_secs_f64();
      match &result {
        Ok(report) => {
          self.metrics.observe_cycle(kind.as_str(), "success", elapsed);
          info!(
            rows = report.rows_exported,
            destinations = report.destinations,
            elapsed_secs = elapsed,
            "Cycle completed"
          );
        }
        Err(e) => {
          self.metrics.observe_cycle(kind.as_str(), e.kind(), elapsed);
          error!(
            error = %e,
            kind = e.kind(),
            transient = e.is_transient(),
            elapsed_secs = elapsed,
            "Cycle failed"
          );
        }
      }
      result
    }
    .instrument(span)
    .await
  }

  /// Fetch → reconcile → replace, then export.
  pub async fn run_full_cycle(&self) -> SyncResult<CycleReport> {
    self.run(CycleKind::Full).await
  }

  /// Export today's persisted snapshot.
  pub async fn run_export_cycle(&self) -> SyncResult<CycleReport> {
    self.run(CycleKind::ExportOnly).await
  }

  async fn full_cycle(&self, run_id: Uuid, date: NaiveDate) -> SyncResult<CycleReport> {
    let summary = self.sync.refresh(date).await?;
    self.metrics.set_snapshot_rows(summary.rows);
    self.export_cycle(run_id, date, Some(summary)).await
  }

  async fn export_cycle(
    &self,
    run_id: Uuid,
    date: NaiveDate,
    snapshot: Option<SnapshotSummary>,
  ) -> SyncResult<CycleReport> {
    let kind = if snapshot.is_some() {
      CycleKind::Full
    } else {
      CycleKind::ExportOnly
    };

    // Projected once; every destination receives the same grid.
    let grid = self.projector.project(date).await?;
    let destinations = self.publisher.publish_all(&grid).await?;

    Ok(CycleReport {
      run_id,
      kind,
      date,
      snapshot,
      rows_exported: grid.len(),
      destinations,
    })
  }
}
