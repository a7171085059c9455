//! Marketplace Tariff API Adapter
//!
//! Sub-modules:
//! - `client`: authenticated HTTP client implementing `TariffProvider`
//! - `types`: response envelope types and decoding

pub mod client;
pub mod types;

pub use client::TariffApiClient;
