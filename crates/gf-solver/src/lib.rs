//! Steady-state load-flow solver for single-phase distribution networks.
//!
//! This crate builds the per-unit bus admittance matrix and solves for bus
//! voltages given PQ-bus power injections and a slack-bus voltage. Two
//! interchangeable algorithms implement [`LoadFlowSolver`]: a current-injection
//! fixed-point iteration that reuses a cached LU factorization, and a
//! rectangular-coordinates Newton-Raphson iteration.

pub mod admittance;
pub mod current_injection;
pub mod error;
pub mod grid_state;
pub mod jacobian;
pub mod newton;
pub mod solver;

pub use admittance::AdmittanceModel;
pub use current_injection::CurrentInjectionSolver;
pub use error::{SolverError, SolverResult};
pub use grid_state::{
    GridState, LineFlow, compute_line_flows, compute_line_losses, compute_slack_power,
};
pub use newton::NewtonRaphsonSolver;
pub use solver::{Algorithm, LoadFlowConfig, LoadFlowSolution, LoadFlowSolver, build_solver};

/// Complex scalar used for voltages, currents and admittances.
pub use num_complex::Complex64;
