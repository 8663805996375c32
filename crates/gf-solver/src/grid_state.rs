//! Derived grid quantities: slack power, line currents and losses.

use num_complex::Complex64;

use crate::admittance::AdmittanceModel;
use crate::solver::LoadFlowSolution;

/// Published state of the grid at one converged operating point.
///
/// Index 0 of the bus vectors is the slack bus. Powers are generation
/// positive (W and var), magnitudes in volts, angles in degrees and line
/// currents in amperes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridState {
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    pub vm: Vec<f64>,
    pub va: Vec<f64>,
    /// Larger of the two end currents of each line
    pub line_currents: Vec<f64>,
    /// Series real-power loss of each line (W)
    pub line_losses: Vec<f64>,
}

/// Complex currents entering a line at each end (A).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFlow {
    pub forward: Complex64,
    pub backward: Complex64,
}

impl LineFlow {
    pub fn magnitude(&self) -> f64 {
        self.forward.norm().max(self.backward.norm())
    }
}

/// Complex power delivered by the slack bus (VA), generation positive.
pub fn compute_slack_power(model: &AdmittanceModel, solution: &LoadFlowSolution) -> Complex64 {
    let y = model.y();
    let v = &solution.voltages;
    let i0: Complex64 = (0..v.len()).map(|k| y[(0, k)] * v[k]).sum();
    v[0] * i0.conj() * model.base().s()
}

/// End currents of every line.
///
/// The series term uses the off-diagonal entry of the admittance matrix, so
/// parallel lines between the same pair of buses report their combined
/// series current plus their own shunt current.
pub fn compute_line_flows(model: &AdmittanceModel, solution: &LoadFlowSolution) -> Vec<LineFlow> {
    let base = model.base();
    let y_si = model.y_si();
    let v: Vec<Complex64> = solution.voltages.iter().map(|v| *v * base.v()).collect();

    model
        .lines()
        .iter()
        .map(|line| {
            let (s, d) = (line.from.as_usize(), line.to.as_usize());
            let half_b = Complex64::new(0.0, line.b / 2.0);
            LineFlow {
                forward: -y_si[(s, d)] * (v[s] - v[d]) + v[s] * half_b,
                backward: -y_si[(d, s)] * (v[d] - v[s]) + v[d] * half_b,
            }
        })
        .collect()
}

/// Series real-power loss of every line (W).
pub fn compute_line_losses(model: &AdmittanceModel, solution: &LoadFlowSolution) -> Vec<f64> {
    let v = &solution.voltages;
    let base_s = model.base().s();
    model
        .lines()
        .iter()
        .enumerate()
        .map(|(l, line)| {
            let dv = v[line.from.as_usize()] - v[line.to.as_usize()];
            let current = dv * model.series_admittance(l);
            (dv * current.conj()).re * base_s
        })
        .collect()
}

impl GridState {
    pub fn from_solution(model: &AdmittanceModel, solution: &LoadFlowSolution) -> Self {
        let base_v = model.base().v();
        let slack = compute_slack_power(model, solution);

        let mut p = Vec::with_capacity(solution.bus_count());
        let mut q = Vec::with_capacity(solution.bus_count());
        p.push(slack.re);
        q.push(slack.im);
        p.extend_from_slice(&solution.p);
        q.extend_from_slice(&solution.q);

        Self {
            p,
            q,
            vm: solution.voltages.iter().map(|v| v.norm() * base_v).collect(),
            va: solution.voltages.iter().map(|v| v.arg().to_degrees()).collect(),
            line_currents: compute_line_flows(model, solution)
                .iter()
                .map(LineFlow::magnitude)
                .collect(),
            line_losses: compute_line_losses(model, solution),
        }
    }

    pub fn bus_count(&self) -> usize {
        self.vm.len()
    }

    pub fn line_count(&self) -> usize {
        self.line_currents.len()
    }

    /// Total series losses (W).
    pub fn total_losses(&self) -> f64 {
        self.line_losses.iter().sum()
    }

    /// True when every vector has the length implied by `bus_count` and `line_count`.
    pub fn is_consistent(&self) -> bool {
        let n = self.vm.len();
        self.p.len() == n
            && self.q.len() == n
            && self.va.len() == n
            && self.line_losses.len() == self.line_currents.len()
    }
}
