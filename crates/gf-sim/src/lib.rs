//! Real-time update loop for the grid.
//!
//! Provides:
//! - Slack voltage sources (constant or trace-driven with a forward-only pointer)
//! - Per-bus setpoint coalescing
//! - Atomically swapped grid snapshots for concurrent readers
//! - The `UpdateService` that drains setpoints, solves and publishes

pub mod error;
pub mod service;
pub mod setpoints;
pub mod slack;
pub mod snapshot;

pub use error::{SimError, SimResult};
pub use service::{CycleOutcome, ServiceOptions, ServiceState, UpdateService};
pub use setpoints::{SetpointBook, SetpointCommand, coalesce};
pub use slack::{SlackVoltageSource, SlackVoltageTrace, TraceSample};
pub use snapshot::{GridSnapshot, SnapshotCell};
