//! Tariff Provider Port - Daily Tariff Document Source
//!
//! One call, one authenticated request, no retries. Retrying is the
//! scheduler's job: the next trigger simply fetches again.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::tariff::TariffDocument;
use crate::error::SyncResult;

/// Trait for tariff data sources.
#[async_trait]
pub trait TariffProvider: Send + Sync + 'static {
    /// Fetch the tariff document effective on `date`.
    ///
    /// # Errors
    /// `ProviderUnavailable` on network failure, timeout or non-success
    /// status; `ProviderContractViolation` on an unreadable body.
    async fn fetch_tariffs(&self, date: NaiveDate) -> SyncResult<TariffDocument>;
}
