//! Newton-Raphson load flow in rectangular coordinates.

use std::sync::Arc;

use gf_core::inf_norm;
use nalgebra::DVector;
use num_complex::Complex64;
use tracing::{debug, warn};

use crate::admittance::AdmittanceModel;
use crate::error::{SolverError, SolverResult};
use crate::jacobian::{build_jacobian, power_injections};
use crate::solver::{
    Algorithm, LoadFlowConfig, LoadFlowSolution, LoadFlowSolver, per_unit_inputs, pq_position,
    voltage_fault,
};

/// Newton-Raphson solver.
///
/// Every solve starts flat: all buses at the slack voltage. No LU is cached;
/// the Jacobian is rebuilt and factorized at each iteration.
pub struct NewtonRaphsonSolver {
    model: Arc<AdmittanceModel>,
    config: LoadFlowConfig,
    solution: Option<LoadFlowSolution>,
}

impl NewtonRaphsonSolver {
    pub fn new(model: Arc<AdmittanceModel>, config: LoadFlowConfig) -> SolverResult<Self> {
        config.validate()?;
        Ok(Self {
            model,
            config,
            solution: None,
        })
    }

    /// Run Newton iterations for per-unit targets `s` and slack voltage `slack`.
    fn run(&self, s: &[Complex64], slack: Complex64) -> SolverResult<(DVector<Complex64>, usize, f64)> {
        let n = self.model.bus_count();
        let u = n - 1;
        let y = self.model.y();

        let mut target = DVector::zeros(2 * u);
        for (i, s) in s.iter().enumerate() {
            target[i] = s.re;
            target[i + u] = s.im;
        }

        let mut x = DVector::zeros(2 * n);
        for k in 0..n {
            x[k] = slack.re;
            x[k + n] = slack.im;
        }

        let mut step = f64::INFINITY;
        for iter in 1..=self.config.max_iterations {
            let mismatch = &target - power_injections(y, &x);
            let dx = build_jacobian(y, &x)
                .lu()
                .solve(&mismatch)
                .ok_or_else(|| self.diverged(iter, "singular Jacobian"))?;

            // Slack components (indices 0 and N) stay fixed
            for i in 0..u {
                x[i + 1] += dx[i];
                x[i + 1 + n] += dx[i + u];
            }
            step = inf_norm(dx.as_slice());

            let pq = (1..n).map(|k| Complex64::new(x[k], x[k + n]));
            if let Some(reason) = voltage_fault(pq, &self.config) {
                return Err(self.diverged(iter, &reason));
            }
            if step < self.config.tolerance {
                let v = DVector::from_fn(n, |k, _| Complex64::new(x[k], x[k + n]));
                return Ok((v, iter, step));
            }
        }

        Err(self.diverged(
            self.config.max_iterations,
            &format!("iteration cap reached, last update {step:.3e} p.u."),
        ))
    }

    fn diverged(&self, iterations: usize, reason: &str) -> SolverError {
        warn!(algorithm = "NR", iterations, reason, "load flow diverged");
        SolverError::Diverged {
            algorithm: Algorithm::NewtonRaphson,
            iterations,
            reason: reason.to_string(),
        }
    }
}

impl LoadFlowSolver for NewtonRaphsonSolver {
    fn algorithm(&self) -> Algorithm {
        Algorithm::NewtonRaphson
    }

    fn model(&self) -> &Arc<AdmittanceModel> {
        &self.model
    }

    fn solve(
        &mut self,
        p: &[f64],
        q: &[f64],
        slack_voltage: Complex64,
    ) -> SolverResult<&LoadFlowSolution> {
        let (s, slack_pu) = per_unit_inputs(&self.model, p, q, slack_voltage, &self.config)?;
        let (voltages, iterations, final_step) = self.run(&s, slack_pu)?;
        debug!(iterations, step = final_step, "newton-raphson solve converged");

        self.solution = Some(LoadFlowSolution {
            voltages,
            p: p.to_vec(),
            q: q.to_vec(),
            slack_voltage,
            iterations,
            final_step,
        });
        self.solution.as_ref().ok_or(SolverError::NotInitialized)
    }

    fn update_single_bus(&mut self, bus: usize, p: f64, q: f64) -> SolverResult<&LoadFlowSolution> {
        let idx = pq_position(&self.model, bus)?;
        let previous = self.solution.as_ref().ok_or(SolverError::NotInitialized)?;
        let mut p_all = previous.p.clone();
        let mut q_all = previous.q.clone();
        let slack_voltage = previous.slack_voltage;
        p_all[idx] = p;
        q_all[idx] = q;

        // No factorization to reuse: a full solve from flat start
        self.solve(&p_all, &q_all, slack_voltage)
    }

    fn solution(&self) -> Option<&LoadFlowSolution> {
        self.solution.as_ref()
    }
}
