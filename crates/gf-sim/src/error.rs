//! Error types for the update service.

use std::path::PathBuf;

use gf_solver::SolverError;
use thiserror::Error;

/// Errors encountered while preparing or running the update loop.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid slack voltage trace: {what}")]
    InvalidTrace { what: String },

    #[error("Failed to read slack voltage trace {path}: {source}")]
    TraceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid setpoint: {what}")]
    InvalidSetpoint { what: String },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

impl SimError {
    /// True when a cycle was abandoned because the load flow did not converge.
    pub fn is_divergence(&self) -> bool {
        matches!(self, SimError::Solver(e) if e.is_divergence())
    }
}

pub type SimResult<T> = Result<T, SimError>;
