use std::sync::Arc;

use gf_network::{BaseQuantities, NetworkBuilder};
use gf_solver::{
    AdmittanceModel, Algorithm, Complex64, GridState, LoadFlowConfig, LoadFlowSolver, SolverError,
    build_solver,
};

const SLACK: Complex64 = Complex64::new(230.0, 0.0);

fn base() -> BaseQuantities {
    BaseQuantities::new(230.0, 100_000.0).unwrap()
}

/// Radial feeder 0-1-2-...-(n-1) with identical lines.
fn radial(n: usize, r: f64, x: f64, b: f64) -> Arc<AdmittanceModel> {
    let mut builder = NetworkBuilder::new();
    for i in 0..n - 1 {
        builder.add_line(i, i + 1, r, x, b);
    }
    Arc::new(AdmittanceModel::new(&builder.build().unwrap(), base()))
}

fn solver(algorithm: Algorithm, model: &Arc<AdmittanceModel>) -> Box<dyn LoadFlowSolver> {
    build_solver(algorithm, model.clone(), LoadFlowConfig::default()).unwrap()
}

fn max_diff(a: &[Complex64], b: &[Complex64]) -> f64 {
    a.iter().zip(b).fold(0.0, |acc, (x, y)| acc.max((x - y).norm()))
}

fn voltages(solver: &dyn LoadFlowSolver) -> Vec<Complex64> {
    solver.solution().unwrap().voltages.iter().copied().collect()
}

#[test]
fn algorithms_agree_on_two_bus() {
    let model = radial(2, 0.05, 0.02, 0.0);
    let mut cw = solver(Algorithm::CurrentInjection, &model);
    let mut nr = solver(Algorithm::NewtonRaphson, &model);

    cw.solve(&[-1000.0], &[-200.0], SLACK).unwrap();
    nr.solve(&[-1000.0], &[-200.0], SLACK).unwrap();

    assert!(max_diff(&voltages(cw.as_ref()), &voltages(nr.as_ref())) < 1e-8);
}

#[test]
fn algorithms_agree_on_meshed_network() {
    let mut builder = NetworkBuilder::new();
    builder.add_line(0, 1, 0.04, 0.03, 1e-5);
    builder.add_line(1, 2, 0.06, 0.02, 1e-5);
    builder.add_line(2, 3, 0.05, 0.05, 0.0);
    builder.add_line(0, 3, 0.08, 0.04, 0.0);
    builder.add_line(1, 3, 0.07, 0.03, 2e-5);
    let model = Arc::new(AdmittanceModel::new(&builder.build().unwrap(), base()));

    let p = [-3000.0, 1500.0, -2500.0];
    let q = [-500.0, 0.0, -800.0];
    let mut cw = solver(Algorithm::CurrentInjection, &model);
    let mut nr = solver(Algorithm::NewtonRaphson, &model);
    cw.solve(&p, &q, Complex64::new(228.0, 3.0)).unwrap();
    nr.solve(&p, &q, Complex64::new(228.0, 3.0)).unwrap();

    assert!(max_diff(&voltages(cw.as_ref()), &voltages(nr.as_ref())) < 1e-8);
}

#[test]
fn three_bus_scenario() {
    let model = radial(3, 0.05, 0.02, 0.0);
    for algorithm in [Algorithm::CurrentInjection, Algorithm::NewtonRaphson] {
        let mut s = solver(algorithm, &model);
        let solution = s.solve(&[-1000.0, -2000.0], &[0.0, 0.0], SLACK).unwrap();
        let state = GridState::from_solution(&model, solution);

        assert!((state.vm[0] - 230.0).abs() < 1e-9);
        assert!(state.vm[0] > state.vm[1]);
        assert!(state.vm[1] > state.vm[2]);
        assert_eq!(state.p[1], -1000.0);
        assert_eq!(state.p[2], -2000.0);
        // Slack supplies the load plus losses
        assert!(state.p[0] > 3000.0);
        assert!((state.p[0] - 3000.0 - state.total_losses()).abs() < 1e-3);
        // The first line carries both loads
        assert!(state.line_currents[0] > state.line_currents[1]);
    }
}

#[test]
fn repeated_solve_is_identical() {
    let model = radial(4, 0.05, 0.02, 1e-5);
    for algorithm in [Algorithm::CurrentInjection, Algorithm::NewtonRaphson] {
        let mut s = solver(algorithm, &model);
        let p = [-500.0, 800.0, -1200.0];
        let q = [-50.0, 0.0, -100.0];
        let first = s.solve(&p, &q, SLACK).unwrap().clone();
        let second = s.solve(&p, &q, SLACK).unwrap();
        assert_eq!(&first, second);
    }
}

#[test]
fn single_bus_update_matches_full_solve() {
    let model = radial(4, 0.05, 0.02, 1e-5);
    for algorithm in [Algorithm::CurrentInjection, Algorithm::NewtonRaphson] {
        let mut incremental = solver(algorithm, &model);
        incremental
            .solve(&[-1000.0, -2000.0, -500.0], &[0.0, 0.0, 0.0], SLACK)
            .unwrap();
        let updated = incremental.update_single_bus(2, -3000.0, -200.0).unwrap();
        assert_eq!(updated.p, vec![-1000.0, -3000.0, -500.0]);
        assert_eq!(updated.q, vec![0.0, -200.0, 0.0]);

        let mut full = solver(algorithm, &model);
        full.solve(&[-1000.0, -3000.0, -500.0], &[0.0, -200.0, 0.0], SLACK)
            .unwrap();

        assert!(max_diff(&voltages(incremental.as_ref()), &voltages(full.as_ref())) < 1e-8);
    }
}

#[test]
fn update_requires_prior_solve() {
    let model = radial(3, 0.05, 0.02, 0.0);
    for algorithm in [Algorithm::CurrentInjection, Algorithm::NewtonRaphson] {
        let mut s = solver(algorithm, &model);
        assert_eq!(
            s.update_single_bus(1, -100.0, 0.0).unwrap_err(),
            SolverError::NotInitialized
        );
    }
}

#[test]
fn update_rejects_slack_and_unknown_bus() {
    let model = radial(3, 0.05, 0.02, 0.0);
    let mut s = solver(Algorithm::CurrentInjection, &model);
    s.solve(&[0.0, 0.0], &[0.0, 0.0], SLACK).unwrap();

    assert!(matches!(
        s.update_single_bus(0, -100.0, 0.0),
        Err(SolverError::InvalidBus { bus: 0, bus_count: 3 })
    ));
    assert!(matches!(
        s.update_single_bus(3, -100.0, 0.0),
        Err(SolverError::InvalidBus { bus: 3, bus_count: 3 })
    ));
}

#[test]
fn setpoint_length_mismatch_is_rejected() {
    let model = radial(3, 0.05, 0.02, 0.0);
    let mut s = solver(Algorithm::NewtonRaphson, &model);
    assert!(matches!(
        s.solve(&[0.0], &[0.0], SLACK),
        Err(SolverError::InvalidInput { .. })
    ));
    assert!(matches!(
        s.solve(&[f64::NAN, 0.0], &[0.0, 0.0], SLACK),
        Err(SolverError::InvalidInput { .. })
    ));
}

#[test]
fn infeasible_load_diverges_and_keeps_previous_state() {
    // 10 ohm feeding 50 kW at 230 V has no solution
    let model = radial(2, 10.0, 0.0, 0.0);
    for algorithm in [Algorithm::CurrentInjection, Algorithm::NewtonRaphson] {
        let mut s = solver(algorithm, &model);
        let before = s.solve(&[-100.0], &[0.0], SLACK).unwrap().clone();

        let err = s.solve(&[-50_000.0], &[0.0], SLACK).unwrap_err();
        assert!(err.is_divergence(), "{algorithm}: {err}");
        assert_eq!(s.solution(), Some(&before));

        let err = s.update_single_bus(1, -50_000.0, 0.0).unwrap_err();
        assert!(err.is_divergence());
        assert_eq!(s.solution(), Some(&before));
    }
}

#[test]
fn resonant_shunt_is_not_solved_silently() {
    // Shunt susceptance cancels the series admittance at bus 1
    let model = radial(2, 0.0, 0.5, 4.0);
    for algorithm in [Algorithm::CurrentInjection, Algorithm::NewtonRaphson] {
        let outcome = build_solver(algorithm, model.clone(), LoadFlowConfig::default())
            .and_then(|mut s| s.solve(&[0.0], &[0.0], SLACK).map(|_| ()));
        assert!(
            matches!(
                outcome,
                Err(SolverError::SingularAdmittance { .. } | SolverError::Diverged { .. })
            ),
            "{algorithm}: {outcome:?}"
        );
    }
}

#[test]
fn voltage_drop_grows_with_impedance() {
    let mut last = f64::INFINITY;
    for scale in [1.0, 2.0, 4.0, 8.0] {
        let model = radial(2, 0.05 * scale, 0.02 * scale, 0.0);
        let mut s = solver(Algorithm::CurrentInjection, &model);
        let solution = s.solve(&[-5000.0], &[-1000.0], SLACK).unwrap();
        let vm = GridState::from_solution(&model, solution).vm[1];
        assert!(vm < last, "scale {scale}: {vm} >= {last}");
        last = vm;
    }
}

#[test]
fn rotated_slack_rotates_all_voltages() {
    let model = radial(3, 0.05, 0.02, 0.0);
    let mut s = solver(Algorithm::NewtonRaphson, &model);
    let reference = voltages_after(s.as_mut(), SLACK);
    let rotated = voltages_after(s.as_mut(), Complex64::from_polar(230.0, 0.3));

    for (a, b) in reference.iter().zip(&rotated) {
        assert!((a.norm() - b.norm()).abs() < 1e-9);
        assert!((b.arg() - a.arg() - 0.3).abs() < 1e-9);
    }
}

fn voltages_after(s: &mut dyn LoadFlowSolver, slack: Complex64) -> Vec<Complex64> {
    s.solve(&[-1500.0, -700.0], &[-300.0, 0.0], slack).unwrap();
    voltages(s)
}

#[test]
fn zero_demand_leaves_flat_profile() {
    let model = radial(3, 0.05, 0.02, 0.0);
    for algorithm in [Algorithm::CurrentInjection, Algorithm::NewtonRaphson] {
        let mut s = solver(algorithm, &model);
        let solution = s.solve(&[0.0, 0.0], &[0.0, 0.0], SLACK).unwrap();
        let state = GridState::from_solution(&model, solution);

        for vm in &state.vm {
            assert!((vm - 230.0).abs() < 1e-9);
        }
        for current in &state.line_currents {
            assert!(current.abs() < 1e-9);
        }
        assert_eq!(solution.vr(230.0).len(), 3);
    }
}
