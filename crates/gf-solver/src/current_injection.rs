//! Current-injection fixed-point load flow.
//!
//! With `W = -Yll⁻¹·Y[1:,0]·V0` the PQ-bus voltages satisfy
//! `V = Yll⁻¹·conj(S / V) + W`, which is iterated from `W` until the update
//! falls below tolerance. `Yll` is factorized once at construction.

use std::sync::Arc;

use nalgebra::{DVector, Dyn, linalg::LU};
use num_complex::Complex64;
use tracing::{debug, warn};

use crate::admittance::AdmittanceModel;
use crate::error::{SolverError, SolverResult};
use crate::solver::{
    Algorithm, LoadFlowConfig, LoadFlowSolution, LoadFlowSolver, per_unit_inputs, pq_position,
    voltage_fault,
};

pub struct CurrentInjectionSolver {
    model: Arc<AdmittanceModel>,
    config: LoadFlowConfig,
    lu: LU<Complex64, Dyn, Dyn>,
    /// `Yll⁻¹·Y[1:,0]`, scaled by `-V0` to obtain `W`
    coupling: DVector<Complex64>,
    /// Per-unit power setpoints of the last converged solve
    s_pu: DVector<Complex64>,
    w: DVector<Complex64>,
    solution: Option<LoadFlowSolution>,
}

struct Converged {
    v: DVector<Complex64>,
    iterations: usize,
    final_step: f64,
}

impl CurrentInjectionSolver {
    /// Factorize `Yll`. Fails if the reduced matrix is singular.
    pub fn new(model: Arc<AdmittanceModel>, config: LoadFlowConfig) -> SolverResult<Self> {
        config.validate()?;
        let u = model.pq_bus_count();
        let lu = model.reduced().lu();
        if !lu.is_invertible() {
            return Err(SolverError::SingularAdmittance {
                what: format!("reduced {u}x{u} matrix has a zero pivot"),
            });
        }
        let coupling = lu
            .solve(&model.slack_coupling())
            .ok_or_else(|| SolverError::SingularAdmittance {
                what: "slack coupling solve failed".to_string(),
            })?;

        Ok(Self {
            model,
            config,
            lu,
            coupling,
            s_pu: DVector::zeros(u),
            w: DVector::zeros(u),
            solution: None,
        })
    }

    fn iterate(
        &self,
        s: &DVector<Complex64>,
        w: &DVector<Complex64>,
        start: DVector<Complex64>,
    ) -> SolverResult<Converged> {
        let mut v = start;
        let mut step = f64::INFINITY;

        for iter in 1..=self.config.max_iterations {
            let rhs = s.zip_map(&v, |s, v| s.conj() / v.conj());
            let next = self
                .lu
                .solve(&rhs)
                .ok_or_else(|| self.diverged(iter, "linear solve failed"))?
                + w;

            step = next
                .iter()
                .zip(v.iter())
                .fold(0.0, |acc, (a, b)| acc.max((a - b).norm()));
            v = next;

            if let Some(reason) = voltage_fault(v.iter().copied(), &self.config) {
                return Err(self.diverged(iter, &reason));
            }
            if step < self.config.tolerance {
                return Ok(Converged {
                    v,
                    iterations: iter,
                    final_step: step,
                });
            }
        }

        Err(self.diverged(
            self.config.max_iterations,
            &format!("iteration cap reached, last update {step:.3e} p.u."),
        ))
    }

    fn diverged(&self, iterations: usize, reason: &str) -> SolverError {
        warn!(algorithm = "CW", iterations, reason, "load flow diverged");
        SolverError::Diverged {
            algorithm: Algorithm::CurrentInjection,
            iterations,
            reason: reason.to_string(),
        }
    }

    fn commit(
        &mut self,
        slack_voltage: Complex64,
        converged: Converged,
        p: Vec<f64>,
        q: Vec<f64>,
    ) {
        let mut voltages = DVector::zeros(self.model.bus_count());
        voltages[0] = slack_voltage / self.model.base().v();
        voltages.rows_mut(1, converged.v.len()).copy_from(&converged.v);
        self.solution = Some(LoadFlowSolution {
            voltages,
            p,
            q,
            slack_voltage,
            iterations: converged.iterations,
            final_step: converged.final_step,
        });
    }
}

impl LoadFlowSolver for CurrentInjectionSolver {
    fn algorithm(&self) -> Algorithm {
        Algorithm::CurrentInjection
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
        let s = DVector::from_vec(s);
        let w = self.coupling.map(|c| -c * slack_pu);

        let converged = self.iterate(&s, &w, w.clone())?;
        debug!(
            iterations = converged.iterations,
            step = converged.final_step,
            "current-injection solve converged"
        );

        self.s_pu = s;
        self.w = w;
        self.commit(slack_voltage, converged, p.to_vec(), q.to_vec());
        self.solution.as_ref().ok_or(SolverError::NotInitialized)
    }

    fn update_single_bus(&mut self, bus: usize, p: f64, q: f64) -> SolverResult<&LoadFlowSolution> {
        let idx = pq_position(&self.model, bus)?;
        let previous = self.solution.as_ref().ok_or(SolverError::NotInitialized)?;
        if !(p.is_finite() && q.is_finite()) {
            return Err(SolverError::InvalidInput {
                what: format!("non-finite setpoint for bus {bus}"),
            });
        }

        let slack_voltage = previous.slack_voltage;
        let start = previous.voltages.rows(1, self.model.pq_bus_count()).clone_owned();
        let mut p_all = previous.p.clone();
        let mut q_all = previous.q.clone();
        p_all[idx] = p;
        q_all[idx] = q;

        let mut s = self.s_pu.clone();
        s[idx] = Complex64::new(p, q) / self.model.base().s();

        let converged = self.iterate(&s, &self.w, start)?;
        debug!(
            bus,
            iterations = converged.iterations,
            "current-injection single-bus update converged"
        );

        self.s_pu = s;
        self.commit(slack_voltage, converged, p_all, q_all);
        self.solution.as_ref().ok_or(SolverError::NotInitialized)
    }

    fn solution(&self) -> Option<&LoadFlowSolution> {
        self.solution.as_ref()
    }
}
