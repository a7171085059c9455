//! Scheduler - Cron Triggers for the Two Cycles
//!
//! Each trigger sleeps until the next fire time of its cron schedule
//! (local time) and starts its cycle in a separate task, so a slow run
//! never delays the next tick. Runs of the same or the other trigger
//! may overlap; the store's replace and insert-or-ignore semantics make
//! that safe. On shutdown a trigger stops ticking and waits for its
//! in-flight cycles before its task ends.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::orchestrator::{CycleKind, Orchestrator};

/// Time from `now` until the schedule's next fire time.
///
/// `None` when the schedule has no future occurrence.
pub fn delay_until_next(schedule: &Schedule, now: DateTime<Local>) -> Option<Duration> {
  let next = schedule.after(&now).next()?;
  Some((next - now).to_std().unwrap_or(Duration::ZERO))
}

/// A cron schedule bound to one cycle kind.
pub struct CronTrigger {
  kind: CycleKind,
  schedule: Schedule,
  orchestrator: Arc<Orchestrator>,
}

impl CronTrigger {
  pub fn new(kind: CycleKind, schedule: Schedule, orchestrator: Arc<Orchestrator>) -> Self {
    Self {
      kind,
      schedule,
      orchestrator,
    }
  }

  /// Spawn the trigger loop; it ends when `shutdown` fires.
  pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(self.run(shutdown))
  }

  /// Fire the cycle on every schedule tick until shutdown, then drain
  /// the cycles still running.
  pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
    info!(cycle = self.kind.as_str(), schedule = %self.schedule, "Trigger started");
    let mut in_flight = JoinSet::new();

    loop {
      while in_flight.try_join_next().is_some() {}

      let Some(delay) = delay_until_next(&self.schedule, Local::now()) else {
        warn!(cycle = self.kind.as_str(), "Schedule has no upcoming fire time");
        break;
      };
      debug!(cycle = self.kind.as_str(), delay_secs = delay.as_secs(), "Next tick scheduled");

      tokio::select! {
        () = tokio::time::sleep(delay) => {
          let orchestrator = Arc::clone(&self.orchestrator);
          let kind = self.kind;
          in_flight.spawn(async move {
            // Outcome already logged and counted by the orchestrator.
            let _ = orchestrator.run(kind).await;
          });
        }
        _ = shutdown.recv() => {
          info!(cycle = self.kind.as_str(), "Trigger stopped");
          break;
        }
      }
    }

    if !in_flight.is_empty() {
      info!(cycle = self.kind.as_str(), running = in_flight.len(), "Waiting for in-flight cycles");
    }
    while in_flight.join_next().await.is_some() {}
  }
}
