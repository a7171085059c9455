//! Tariff Store Port - Identity and Snapshot Persistence
//!
//! All mutation is either insert-or-ignore (warehouse names) or an
//! atomic delete+insert scoped to one date (snapshots). Nothing is ever
//! updated in place, so overlapping runs cannot lose updates.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::tariff::{NewTariffRow, StoredTariff, WarehouseId};
use crate::error::SyncResult;

/// Trait for tariff persistence backends.
#[async_trait]
pub trait TariffStore: Send + Sync + 'static {
    /// Ensure every name has an identity and return the id of each.
    ///
    /// Unknown names are inserted, known ones are left alone. Ids are
    /// stable across calls. Either all new identities are committed or
    /// none are.
    ///
    /// # Errors
    /// `StorageUnavailable` on any persistence failure.
    async fn reconcile_warehouses(
        &self,
        names: &[String],
    ) -> SyncResult<HashMap<String, WarehouseId>>;

    /// Replace every row for `date` with `rows`, atomically.
    ///
    /// Readers observe either the previous snapshot or the new one,
    /// never a mixture. An empty `rows` clears the day. Returns the
    /// number of rows written.
    ///
    /// # Errors
    /// `StorageUnavailable` if the replace could not be committed; the
    /// previous snapshot is then left untouched.
    async fn replace_snapshot(&self, date: NaiveDate, rows: &[NewTariffRow]) -> SyncResult<u64>;

    /// Load the rows for `date` joined with warehouse names, in
    /// storage (insertion) order.
    async fn load_snapshot(&self, date: NaiveDate) -> SyncResult<Vec<StoredTariff>>;

    /// Check if the store answers.
    async fn is_healthy(&self) -> bool;
}
