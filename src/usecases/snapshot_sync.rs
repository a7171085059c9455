//! Snapshot Sync Use Case - Fetch, Reconcile, Replace
//!
//! Pulls the day's tariff document from the provider and makes it the
//! persisted snapshot for that date.
//!
//! Sync flow:
//! 1. Fetch the tariff document for the date
//! 2. Reconcile every distinct warehouse name to a stable identity
//! 3. Collapse duplicate names into one row per warehouse
//! 4. Atomically replace the date's rows with the new set

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::domain::tariff::{NewTariffRow, TariffDocument};
use crate::error::{SyncError, SyncResult};
use crate::ports::tariff_provider::TariffProvider;
use crate::ports::tariff_store::TariffStore;

/// Outcome of one snapshot replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
  /// Snapshot date.
  pub date: NaiveDate,
  /// Entries in the fetched document, duplicates included.
  pub fetched: usize,
  /// Distinct warehouses reconciled.
  pub warehouses: usize,
  /// Rows now persisted for the date.
  pub rows: u64,
}

/// Keeps the persisted snapshot in step with the provider.
pub struct SnapshotSync {
  provider: Arc<dyn TariffProvider>,
  store: Arc<dyn TariffStore>,
}

impl SnapshotSync {
  pub fn new(provider: Arc<dyn TariffProvider>, store: Arc<dyn TariffStore>) -> Self {
    Self { provider, store }
  }

  /// Fetch the document for `date` and persist it.
  ///
  /// # Errors
  /// Provider errors abort before anything is written; storage errors
  /// leave the previous snapshot for `date` in place.
  #[instrument(skip(self), fields(%date))]
  pub async fn refresh(&self, date: NaiveDate) -> SyncResult<SnapshotSummary> {
    let document = self.provider.fetch_tariffs(date).await?;
    self.apply(date, &document).await
  }

  /// Persist an already fetched document as the snapshot for `date`.
  #[instrument(skip(self, document), fields(%date, entries = document.entries.len()))]
  pub async fn apply(&self, date: NaiveDate, document: &TariffDocument) -> SyncResult<SnapshotSummary> {
    let names = document.distinct_names();
    let ids = self.store.reconcile_warehouses(&names).await?;

    let entries = document.collapse_duplicates();
    if entries.len() < document.entries.len() {
      warn!(
        fetched = document.entries.len(),
        distinct = entries.len(),
        "Duplicate warehouse names collapsed"
      );
    }

    let rows = entries
      .into_iter()
      .map(|entry| {
        let warehouse_id = ids.get(&entry.warehouse_name).copied().ok_or_else(|| {
          SyncError::StorageUnavailable(format!(
            "warehouse {:?} has no identity after reconciliation",
            entry.warehouse_name
          ))
        })?;
        Ok(NewTariffRow {
          warehouse_id,
          fields: entry.fields,
        })
      })
      .collect::<SyncResult<Vec<_>>>()?;

    let written = self.store.replace_snapshot(date, &rows).await?;

    info!(warehouses = names.len(), rows = written, "Snapshot replaced");

    Ok(SnapshotSummary {
      date,
      fetched: document.entries.len(),
      warehouses: names.len(),
      rows: written,
    })
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;

  use super::*;
  use crate::adapters::persistence::InMemoryTariffStore;
  use crate::domain::tariff::{TariffEntry, TariffFields};

  struct FixedProvider(SyncResult<Vec<TariffEntry>>);

  #[async_trait]
  impl TariffProvider for FixedProvider {
    async fn fetch_tariffs(&self, _date: NaiveDate) -> SyncResult<TariffDocument> {
      match &self.0 {
        Ok(entries) => Ok(TariffDocument::from_entries(entries.clone())),
        Err(_) => Err(SyncError::ProviderUnavailable("timeout".to_string())),
      }
    }
  }

  fn entry(name: &str, coef: &str) -> TariffEntry {
    TariffEntry {
      warehouse_name: name.to_string(),
      fields: TariffFields {
        box_delivery_coef_expr: Some(coef.to_string()),
        ..TariffFields::default()
      },
    }
  }

  fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 25).unwrap()
  }

  #[tokio::test]
  async fn test_duplicates_collapse_to_one_row() {
    let store = Arc::new(InMemoryTariffStore::new());
    let provider = FixedProvider(Ok(vec![
      entry("Kazan", "100"),
      entry("Tula", "120"),
      entry("Kazan", "150"),
    ]));
    let sync = SnapshotSync::new(Arc::new(provider), store.clone());

    let summary = sync.refresh(day()).await.unwrap();
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.warehouses, 2);
    assert_eq!(summary.rows, 2);
    assert_eq!(store.identities().await.len(), 2);
  }

  #[tokio::test]
  async fn test_provider_failure_writes_nothing() {
    let store = Arc::new(InMemoryTariffStore::new());
    let sync = SnapshotSync::new(
      Arc::new(FixedProvider(Err(SyncError::ProviderUnavailable(String::new())))),
      store.clone(),
    );

    let err = sync.refresh(day()).await.unwrap_err();
    assert!(matches!(err, SyncError::ProviderUnavailable(_)));
    assert!(store.identities().await.is_empty());
    assert!(store.dates().await.is_empty());
  }

  #[tokio::test]
  async fn test_empty_document_clears_the_day() {
    let store = Arc::new(InMemoryTariffStore::new());
    let sync = SnapshotSync::new(Arc::new(FixedProvider(Ok(Vec::new()))), store.clone());

    sync
      .apply(day(), &TariffDocument::from_entries(vec![entry("Tula", "1")]))
      .await
      .unwrap();
    let summary = sync.refresh(day()).await.unwrap();

    assert_eq!(summary.rows, 0);
    assert!(store.load_snapshot(day()).await.unwrap().is_empty());
    // Identities outlive the rows that referenced them.
    assert_eq!(store.identities().await.len(), 1);
  }
}
