//! Spreadsheet Port - External Sheet Documents
//!
//! Addresses documents by id and cells by A1 range
//! (`"<title>!A1:Z15000"`).

use async_trait::async_trait;

use crate::domain::export::ExportGrid;
use crate::error::SyncResult;

/// Trait for spreadsheet services.
#[async_trait]
pub trait SpreadsheetService: Send + Sync + 'static {
    /// Create a tab named `title` in the document.
    ///
    /// # Errors
    /// `DestinationConflict` when the tab already exists; `Destination`
    /// or `Unauthorized` for every other failure.
    async fn ensure_sheet(&self, spreadsheet_id: &str, title: &str) -> SyncResult<()>;

    /// Overwrite `range` with the grid, letting the service interpret
    /// values as if typed by a user (numeric strings become numbers).
    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        grid: &ExportGrid,
    ) -> SyncResult<()>;

    /// Read the formatted values in `range`. Empty trailing cells are
    /// omitted by the service, so rows may be ragged.
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> SyncResult<Vec<Vec<String>>>;
}
