//! Persistence Adapters - Tariff Snapshot Storage
//!
//! Implements the `TariffStore` port on Postgres (production) and in
//! process memory (local runs and tests).

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTariffStore;
pub use postgres::PgTariffStore;
