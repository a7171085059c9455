//! In-Memory Tariff Store
//!
//! Same semantics as the Postgres store behind one `RwLock`: names are
//! insert-or-ignore, snapshot replacement stages the new table and only
//! swaps it in once every row has been accepted. Used for local runs
//! without a database and throughout the test suite.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::tariff::{NewTariffRow, StoredTariff, WarehouseId, WarehouseIdentity};
use crate::error::{SyncError, SyncResult};
use crate::ports::tariff_store::TariffStore;

#[derive(Debug, Clone)]
struct StoredRow {
    id: i64,
    date: NaiveDate,
    row: NewTariffRow,
}

#[derive(Debug, Default)]
struct MemoryState {
    names: HashMap<String, WarehouseId>,
    identities: Vec<WarehouseIdentity>,
    rows: Vec<StoredRow>,
    next_row_id: i64,
}

/// Tariff store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTariffStore {
    state: RwLock<MemoryState>,
}

impl InMemoryTariffStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every identity ever created, in creation order.
    pub async fn identities(&self) -> Vec<WarehouseIdentity> {
        self.state.read().await.identities.clone()
    }

    /// Dates that currently have at least one row.
    pub async fn dates(&self) -> Vec<NaiveDate> {
        let state = self.state.read().await;
        let mut dates: Vec<NaiveDate> = state.rows.iter().map(|r| r.date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }
}

#[async_trait]
impl TariffStore for InMemoryTariffStore {
    #[instrument(skip(self, names), fields(names = names.len()))]
    async fn reconcile_warehouses(
        &self,
        names: &[String],
    ) -> SyncResult<HashMap<String, WarehouseId>> {
        let mut state = self.state.write().await;
        let mut resolved = HashMap::with_capacity(names.len());

        for name in names {
            let existing = state.names.get(name).copied();
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = WarehouseId::try_from(state.identities.len() + 1).map_err(|_| {
                        SyncError::StorageUnavailable("warehouse id space exhausted".to_string())
                    })?;
                    state.names.insert(name.clone(), id);
                    state.identities.push(WarehouseIdentity {
                        id,
                        name: name.clone(),
                    });
                    id
                }
            };
            resolved.insert(name.clone(), id);
        }

        debug!(known = state.identities.len(), "Warehouse names reconciled");
        Ok(resolved)
    }

    #[instrument(skip(self, rows), fields(%date, rows = rows.len()))]
    async fn replace_snapshot(&self, date: NaiveDate, rows: &[NewTariffRow]) -> SyncResult<u64> {
        let mut state = self.state.write().await;

        let mut staged: Vec<StoredRow> = state
            .rows
            .iter()
            .filter(|r| r.date != date)
            .cloned()
            .collect();
        let mut next_row_id = state.next_row_id;
        let known: HashSet<WarehouseId> = state.names.values().copied().collect();
        let mut seen: HashSet<WarehouseId> = HashSet::with_capacity(rows.len());

        for row in rows {
            if !known.contains(&row.warehouse_id) {
                // Staged rows are dropped; the committed table is untouched.
                return Err(SyncError::StorageUnavailable(format!(
                    "tariff row references unknown warehouse id {}",
                    row.warehouse_id
                )));
            }
            if !seen.insert(row.warehouse_id) {
                return Err(SyncError::StorageUnavailable(format!(
                    "duplicate tariff row for warehouse id {} on {date}",
                    row.warehouse_id
                )));
            }
            next_row_id += 1;
            staged.push(StoredRow {
                id: next_row_id,
                date,
                row: row.clone(),
            });
        }

        state.rows = staged;
        state.next_row_id = next_row_id;
        Ok(rows.len() as u64)
    }

    async fn load_snapshot(&self, date: NaiveDate) -> SyncResult<Vec<StoredTariff>> {
        let state = self.state.read().await;
        let names: HashMap<WarehouseId, &str> = state
            .identities
            .iter()
            .map(|w| (w.id, w.name.as_str()))
            .collect();

        let mut rows: Vec<StoredTariff> = state
            .rows
            .iter()
            .filter(|r| r.date == date)
            .map(|r| StoredTariff {
                id: r.id,
                date: r.date,
                warehouse_id: r.row.warehouse_id,
                warehouse_name: names
                    .get(&r.row.warehouse_id)
                    .map(|n| (*n).to_string())
                    .unwrap_or_default(),
                fields: r.row.fields.clone(),
            })
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
