//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, Postgres, Google APIs) and
//! hosts the inbound HTTP server. Each sub-module groups adapters by
//! infrastructure concern.
//!
//! Adapter categories:
//! - `provider`: marketplace box-tariff API client
//! - `persistence`: Postgres and in-memory tariff stores
//! - `sheets`: Google Sheets client and OAuth credential
//! - `http`: inbound axum router (OAuth callback, reads, probes)
//! - `metrics`: Prometheus registry and health state

pub mod http;
pub mod metrics;
pub mod persistence;
pub mod provider;
pub mod sheets;
