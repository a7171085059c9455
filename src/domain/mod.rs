//! Domain layer - tariff snapshots and their export projection.
//!
//! Pure types and functions with no I/O (hexagonal architecture inner
//! ring). Everything here is testable in isolation.

pub mod export;
pub mod tariff;

// Re-export core types for convenience
pub use export::{Cell, ColumnContract, ExportColumn, ExportField, ExportGrid};
pub use tariff::{
    NewTariffRow, StoredTariff, TariffDocument, TariffEntry, TariffFields, WarehouseId,
    WarehouseIdentity,
};
