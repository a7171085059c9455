//! Export Projector Use Case - Snapshot to Grid
//!
//! Reads a day's persisted snapshot and pivots it into the export grid
//! following the configured column contract. Read-only, so it is safe
//! to run repeatedly and alongside a concurrent replacement: the store
//! hands back either the old or the new snapshot, never a mixture.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::domain::export::{project, ColumnContract, ExportGrid};
use crate::error::SyncResult;
use crate::ports::tariff_store::TariffStore;

/// Builds export grids from persisted snapshots.
pub struct ExportProjector {
  store: Arc<dyn TariffStore>,
  contract: ColumnContract,
}

impl ExportProjector {
  pub fn new(store: Arc<dyn TariffStore>, contract: ColumnContract) -> Self {
    Self { store, contract }
  }

  /// Column contract in use.
  pub fn contract(&self) -> &ColumnContract {
    &self.contract
  }

  /// Header row plus one row per tariff row of `date`, ordered by
  /// delivery coefficient descending.
  #[instrument(skip(self), fields(%date))]
  pub async fn project(&self, date: NaiveDate) -> SyncResult<ExportGrid> {
    let rows = self.store.load_snapshot(date).await?;
    let grid = project(rows, &self.contract);
    debug!(rows = grid.len(), columns = grid.width(), "Export grid projected");
    Ok(grid)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::persistence::InMemoryTariffStore;
  use crate::domain::tariff::{NewTariffRow, TariffFields};

  fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 25).unwrap()
  }

  async fn seeded(coefs: &[(&str, Option<&str>)]) -> Arc<InMemoryTariffStore> {
    let store = Arc::new(InMemoryTariffStore::new());
    let names: Vec<String> = coefs.iter().map(|(n, _)| (*n).to_string()).collect();
    let ids = store.reconcile_warehouses(&names).await.unwrap();
    let rows: Vec<NewTariffRow> = coefs
      .iter()
      .map(|(name, coef)| NewTariffRow {
        warehouse_id: ids[*name],
        fields: TariffFields {
          box_delivery_coef_expr: coef.map(str::to_string),
          ..TariffFields::default()
        },
      })
      .collect();
    store.replace_snapshot(day(), &rows).await.unwrap();
    store
  }

  fn column(grid: &ExportGrid, header: &str) -> Vec<Option<String>> {
    let index = grid
      .header()
      .iter()
      .position(|h| h.as_deref() == Some(header))
      .unwrap();
    grid.data_rows().iter().map(|r| r[index].clone()).collect()
  }

  #[tokio::test]
  async fn test_orders_by_coefficient_descending() {
    let store = seeded(&[("a", Some("3")), ("b", Some("1")), ("c", Some("2"))]).await;
    let projector = ExportProjector::new(store, ColumnContract::default());

    let grid = projector.project(day()).await.unwrap();
    assert_eq!(
      column(&grid, "warehouseName"),
      vec![Some("a".into()), Some("c".into()), Some("b".into())]
    );
  }

  #[tokio::test]
  async fn test_empty_day_is_header_only() {
    let store = Arc::new(InMemoryTariffStore::new());
    let projector = ExportProjector::new(store, ColumnContract::default());

    let grid = projector.project(day()).await.unwrap();
    assert!(grid.is_empty());
    assert_eq!(grid.rows().len(), 1);
    assert_eq!(grid.width(), projector.contract().columns().len());
  }

  #[tokio::test]
  async fn test_repeated_projection_is_identical() {
    let store = seeded(&[("a", Some("1,5")), ("b", None), ("c", Some("1,5"))]).await;
    let projector = ExportProjector::new(store, ColumnContract::default());

    let first = projector.project(day()).await.unwrap();
    let second = projector.project(day()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(column(&first, "boxDeliveryCoefExpr")[2], None);
  }
}
