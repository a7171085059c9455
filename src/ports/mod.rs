//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `TariffProvider`: daily tariff document from the marketplace API
//! - `TariffStore`: warehouse identities and per-day tariff snapshots
//! - `SpreadsheetService`: sheet creation and range reads/writes
//! - `CredentialProvider`: delegated OAuth credential for spreadsheets

pub mod credentials;
pub mod spreadsheet;
pub mod tariff_provider;
pub mod tariff_store;
