//! gf-app: the grid service and its datagram protocol.
//!
//! Ties the configuration, solver, update loop and CSV log together behind
//! a UDP front end, and provides the matching client.

pub mod client;
pub mod error;
pub mod protocol;
pub mod query;
pub mod runtime;
pub mod server;

pub use client::GridClient;
pub use error::{AppError, AppResult};
pub use protocol::{MAX_DATAGRAM, Message, StateReply};
pub use query::QueryResponder;
pub use runtime::{GridRuntime, algorithm_of, compile_grid};
pub use server::{IntakeStats, RunningServer, ServerOptions, ServerSummary, serve};
