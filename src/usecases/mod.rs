//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! service's workflows. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `SnapshotSync`: fetch, reconcile and replace the day's snapshot
//! - `ExportProjector`: snapshot to export grid
//! - `Publisher`: grid to every spreadsheet destination
//! - `Orchestrator`: full and export-only cycles
//! - `CronTrigger`: wall-clock schedules driving the cycles

pub mod export_projector;
pub mod orchestrator;
pub mod publisher;
pub mod scheduler;
pub mod snapshot_sync;

pub use export_projector::ExportProjector;
pub use orchestrator::{CycleKind, CycleReport, Orchestrator};
pub use publisher::{PublishTarget, Publisher};
pub use scheduler::CronTrigger;
pub use snapshot_sync::{SnapshotSummary, SnapshotSync};
