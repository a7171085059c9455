//! Health State - Liveness and Readiness
//!
//! Readiness depends on the tariff store answering a probe and on the
//! process not being in shutdown. The probes themselves are served by
//! the inbound HTTP router.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ports::tariff_store::TariffStore;

/// Shared health state polled by readiness probes.
#[derive(Clone)]
pub struct HealthState {
    /// Store whose connectivity gates readiness.
    store: Arc<dyn TariffStore>,
    /// Set once shutdown has begun.
    shutting_down: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new(store: Arc<dyn TariffStore>) -> Self {
        Self {
            store,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop reporting ready; in-flight requests still complete.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    /// Check if the service is ready to serve traffic.
    pub async fn is_ready(&self) -> bool {
        !self.is_shutting_down() && self.store.is_healthy().await
    }
}
