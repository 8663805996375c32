//! Error types for load-flow operations.

use gf_network::NetworkError;
use thiserror::Error;

use crate::solver::Algorithm;

/// Errors that can occur while building or running a load-flow solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Load flow diverged ({algorithm}) after {iterations} iterations: {reason}")]
    Diverged {
        algorithm: Algorithm,
        iterations: usize,
        reason: String,
    },

    #[error("Admittance matrix is singular: {what}")]
    SingularAdmittance { what: String },

    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Bus {bus} is not a PQ bus (network has {bus_count} buses)")]
    InvalidBus { bus: usize, bus_count: usize },

    #[error("No converged state yet; a full solve is required first")]
    NotInitialized,

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl SolverError {
    /// True for the non-convergence outcome that a caller may survive by
    /// abandoning the current cycle.
    pub fn is_divergence(&self) -> bool {
        matches!(self, SolverError::Diverged { .. })
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
