//! Common load-flow interface shared by both algorithms.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use nalgebra::DVector;
use num_complex::Complex64;

use crate::admittance::AdmittanceModel;
use crate::current_injection::CurrentInjectionSolver;
use crate::error::{SolverError, SolverResult};
use crate::newton::NewtonRaphsonSolver;

/// Load-flow algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Fixed-point current-injection iteration (`CW`).
    CurrentInjection,
    /// Newton-Raphson in rectangular coordinates (`NR`).
    NewtonRaphson,
}

impl Algorithm {
    pub fn short_name(&self) -> &'static str {
        match self {
            Algorithm::CurrentInjection => "CW",
            Algorithm::NewtonRaphson => "NR",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::CurrentInjection => write!(f, "current_injection"),
            Algorithm::NewtonRaphson => write!(f, "newton_raphson"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current_injection" | "CW" | "cw" => Ok(Algorithm::CurrentInjection),
            "newton_raphson" | "NR" | "nr" => Ok(Algorithm::NewtonRaphson),
            other => Err(SolverError::InvalidInput {
                what: format!("unknown load-flow algorithm '{other}'"),
            }),
        }
    }
}

/// Convergence settings common to both algorithms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadFlowConfig {
    /// Convergence threshold on the infinity norm of the per-unit update
    pub tolerance: f64,
    /// Iteration cap; reaching it is a divergence
    pub max_iterations: usize,
    /// Any bus voltage magnitude below this (p.u.) is treated as collapse
    pub min_voltage_pu: f64,
    /// Any bus voltage magnitude above this (p.u.) is treated as blow-up
    pub max_voltage_pu: f64,
}

impl Default for LoadFlowConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
            min_voltage_pu: 1e-3,
            max_voltage_pu: 10.0,
        }
    }
}

impl LoadFlowConfig {
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SolverError::InvalidInput {
                what: format!("tolerance must be positive, got {}", self.tolerance),
            });
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidInput {
                what: "max_iterations must be at least 1".to_string(),
            });
        }
        if !(self.min_voltage_pu >= 0.0 && self.max_voltage_pu > self.min_voltage_pu) {
            return Err(SolverError::InvalidInput {
                what: "voltage bounds must satisfy 0 <= min < max".to_string(),
            });
        }
        Ok(())
    }
}

/// Last converged operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFlowSolution {
    /// Per-unit complex voltage of every bus (index 0 is the slack)
    pub voltages: DVector<Complex64>,
    /// Active-power setpoints of the PQ buses (W), generation positive
    pub p: Vec<f64>,
    /// Reactive-power setpoints of the PQ buses (var), generation positive
    pub q: Vec<f64>,
    /// Slack voltage used for this solve (V)
    pub slack_voltage: Complex64,
    /// Iterations taken by the solve that produced this point
    pub iterations: usize,
    /// Infinity norm of the final per-unit update
    pub final_step: f64,
}

impl LoadFlowSolution {
    pub fn bus_count(&self) -> usize {
        self.voltages.len()
    }

    /// Real parts of the bus voltages in volts.
    pub fn vr(&self, base_v: f64) -> Vec<f64> {
        self.voltages.iter().map(|v| v.re * base_v).collect()
    }

    /// Imaginary parts of the bus voltages in volts.
    pub fn vi(&self, base_v: f64) -> Vec<f64> {
        self.voltages.iter().map(|v| v.im * base_v).collect()
    }
}

/// A steady-state load-flow solver.
///
/// Implementations are transactional: on error the previously converged
/// solution (if any) is left untouched.
pub trait LoadFlowSolver: Send {
    fn algorithm(&self) -> Algorithm;

    fn model(&self) -> &Arc<AdmittanceModel>;

    /// Solve for all bus voltages.
    ///
    /// `p` and `q` hold one entry per PQ bus (W and var, generation positive);
    /// `slack_voltage` is in volts.
    fn solve(
        &mut self,
        p: &[f64],
        q: &[f64],
        slack_voltage: Complex64,
    ) -> SolverResult<&LoadFlowSolution>;

    /// Re-solve after changing the setpoint of a single PQ bus, keeping the
    /// slack voltage and all other setpoints from the last solve.
    fn update_single_bus(&mut self, bus: usize, p: f64, q: f64) -> SolverResult<&LoadFlowSolution>;

    /// Last converged solution.
    fn solution(&self) -> Option<&LoadFlowSolution>;
}

/// Construct a solver of the requested algorithm over a shared model.
pub fn build_solver(
    algorithm: Algorithm,
    model: Arc<AdmittanceModel>,
    config: LoadFlowConfig,
) -> SolverResult<Box<dyn LoadFlowSolver>> {
    config.validate()?;
    Ok(match algorithm {
        Algorithm::CurrentInjection => Box::new(CurrentInjectionSolver::new(model, config)?),
        Algorithm::NewtonRaphson => Box::new(NewtonRaphsonSolver::new(model, config)?),
    })
}

/// Check setpoint vectors and the slack voltage, returning them in per unit.
pub(crate) fn per_unit_inputs(
    model: &AdmittanceModel,
    p: &[f64],
    q: &[f64],
    slack_voltage: Complex64,
    config: &LoadFlowConfig,
) -> SolverResult<(Vec<Complex64>, Complex64)> {
    let u = model.pq_bus_count();
    if p.len() != u || q.len() != u {
        return Err(SolverError::InvalidInput {
            what: format!(
                "expected {u} P and Q setpoints, got {} and {}",
                p.len(),
                q.len()
            ),
        });
    }
    if let Some(i) = p.iter().chain(q).position(|v| !v.is_finite()) {
        return Err(SolverError::InvalidInput {
            what: format!("non-finite setpoint at position {}", i % u.max(1) + 1),
        });
    }
    if !(slack_voltage.re.is_finite() && slack_voltage.im.is_finite()) {
        return Err(SolverError::InvalidInput {
            what: "non-finite slack voltage".to_string(),
        });
    }

    let base = model.base();
    let slack_pu = slack_voltage / base.v();
    if slack_pu.norm() < config.min_voltage_pu {
        return Err(SolverError::InvalidInput {
            what: format!("slack voltage magnitude {} V is too low", slack_voltage.norm()),
        });
    }
    let s_pu = p
        .iter()
        .zip(q)
        .map(|(&p, &q)| Complex64::new(p, q) / base.s())
        .collect();
    Ok((s_pu, slack_pu))
}

/// Map a bus index to its PQ position, rejecting the slack and out-of-range buses.
pub(crate) fn pq_position(model: &AdmittanceModel, bus: usize) -> SolverResult<usize> {
    let bus_count = model.bus_count();
    if bus == 0 || bus >= bus_count {
        return Err(SolverError::InvalidBus { bus, bus_count });
    }
    Ok(bus - 1)
}

/// Reason an iterate is unusable, if any.
pub(crate) fn voltage_fault(
    voltages: impl Iterator<Item = Complex64>,
    config: &LoadFlowConfig,
) -> Option<String> {
    for (i, v) in voltages.enumerate() {
        if !(v.re.is_finite() && v.im.is_finite()) {
            return Some(format!("non-finite voltage at PQ bus {}", i + 1));
        }
        let m = v.norm();
        if m < config.min_voltage_pu {
            return Some(format!("voltage collapse at PQ bus {} (|V| = {m:.3e} p.u.)", i + 1));
        }
        if m > config.max_voltage_pu {
            return Some(format!("voltage blow-up at PQ bus {} (|V| = {m:.3e} p.u.)", i + 1));
        }
    }
    None
}
