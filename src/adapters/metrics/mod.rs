//! Metrics and Monitoring Adapters
//!
//! Prometheus metrics and the health state behind the `/metrics`,
//! `/live` and `/ready` endpoints.

pub mod health;
pub mod prometheus;

pub use health::HealthState;
pub use self::prometheus::MetricsRegistry;
