//! Error types for the gf-app service layer.

use std::net::SocketAddr;

/// Application error type wrapping the backend crates' errors behind one
/// interface for the CLI and the network service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed topology or configuration; fatal at construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Project error: {0}")]
    Project(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    /// Malformed or undecodable message.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No reply from {addr} within {timeout_ms} ms")]
    Timeout { addr: SocketAddr, timeout_ms: u128 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<gf_project::ProjectError> for AppError {
    fn from(err: gf_project::ProjectError) -> Self {
        match err {
            gf_project::ProjectError::Validation(_) => AppError::Configuration(err.to_string()),
            _ => AppError::Project(err.to_string()),
        }
    }
}

impl From<gf_network::NetworkError> for AppError {
    fn from(err: gf_network::NetworkError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<gf_solver::SolverError> for AppError {
    fn from(err: gf_solver::SolverError) -> Self {
        use gf_solver::SolverError;
        match err {
            SolverError::SingularAdmittance { .. } | SolverError::Network(_) => {
                AppError::Configuration(err.to_string())
            }
            _ => AppError::Solver(err.to_string()),
        }
    }
}

impl From<gf_sim::SimError> for AppError {
    fn from(err: gf_sim::SimError) -> Self {
        use gf_sim::SimError;
        match err {
            SimError::Solver(e) => e.into(),
            SimError::InvalidTrace { .. } | SimError::TraceRead { .. } => {
                AppError::Configuration(err.to_string())
            }
            _ => AppError::Simulation(err.to_string()),
        }
    }
}

impl From<gf_results::ResultsError> for AppError {
    fn from(err: gf_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl AppError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Configuration(_))
    }
}
