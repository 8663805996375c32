//! Power injections and their Jacobian in rectangular coordinates.
//!
//! The state vector is `x = [e_0..e_{N-1}, f_0..f_{N-1}]` with `V_k = e_k + j·f_k`
//! in per unit. Injections and Jacobian rows/columns cover the PQ buses only;
//! the slack entries of `x` are held fixed.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

/// Complex bus currents `a_i + j·b_i = Σ_k Y_ik·V_k` for every bus.
fn bus_currents(y: &DMatrix<Complex64>, x: &DVector<f64>) -> Vec<Complex64> {
    let n = y.nrows();
    (0..n)
        .map(|i| {
            (0..n)
                .map(|k| y[(i, k)] * Complex64::new(x[k], x[k + n]))
                .sum::<Complex64>()
        })
        .collect()
}

/// Calculated injections `[P_1..P_{N-1}, Q_1..Q_{N-1}]` (per unit).
///
/// `P_i = e_i·a_i + f_i·b_i`, `Q_i = f_i·a_i - e_i·b_i`.
pub fn power_injections(y: &DMatrix<Complex64>, x: &DVector<f64>) -> DVector<f64> {
    let n = y.nrows();
    let u = n - 1;
    let currents = bus_currents(y, x);
    let mut out = DVector::zeros(2 * u);
    for i in 1..n {
        let (e, f) = (x[i], x[i + n]);
        let (a, b) = (currents[i].re, currents[i].im);
        out[i - 1] = e * a + f * b;
        out[i - 1 + u] = f * a - e * b;
    }
    out
}

/// Analytic Jacobian of [`power_injections`] with respect to the PQ-bus
/// components `[e_1..e_{N-1}, f_1..f_{N-1}]`.
pub fn build_jacobian(y: &DMatrix<Complex64>, x: &DVector<f64>) -> DMatrix<f64> {
    let n = y.nrows();
    let u = n - 1;
    let currents = bus_currents(y, x);
    let mut jac = DMatrix::zeros(2 * u, 2 * u);

    for i in 1..n {
        let (ei, fi) = (x[i], x[i + n]);
        let r = i - 1;
        for j in 1..n {
            let c = j - 1;
            let (g, b) = (y[(i, j)].re, y[(i, j)].im);
            let dp_de = g * ei + b * fi;
            let dp_df = -b * ei + g * fi;
            jac[(r, c)] = dp_de;
            jac[(r, c + u)] = dp_df;
            jac[(r + u, c)] = dp_df;
            jac[(r + u, c + u)] = -dp_de;
        }

        // The diagonal picks up the bus's own current on top of the pattern above
        let (a, b) = (currents[i].re, currents[i].im);
        jac[(r, r)] += a;
        jac[(r, r + u)] += b;
        jac[(r + u, r)] -= b;
        jac[(r + u, r + u)] += a;
    }

    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverResult;

    /// Compute Jacobian using forward finite differences.
    ///
    /// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
    fn finite_difference_jacobian<F>(
        x: &DVector<f64>,
        f: F,
        epsilon: f64,
    ) -> SolverResult<DMatrix<f64>>
    where
        F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    {
        let n = x.len();
        let f_x = f(x)?;
        let mut jac = DMatrix::zeros(f_x.len(), n);

        for j in 0..n {
            let mut x_perturbed = x.clone();
            let dx = epsilon * x[j].abs().max(1.0);
            x_perturbed[j] += dx;

            let df = (f(&x_perturbed)? - &f_x) / dx;
            jac.set_column(j, &df);
        }

        Ok(jac)
    }

    fn three_bus_y() -> DMatrix<Complex64> {
        let y01 = Complex64::new(4.0, -8.0);
        let y12 = Complex64::new(2.0, -3.0);
        let sh = Complex64::new(0.0, 0.05);
        DMatrix::from_row_slice(
            3,
            3,
            &[
                y01 + sh,
                -y01,
                Complex64::new(0.0, 0.0),
                -y01,
                y01 + y12 + sh * 2.0,
                -y12,
                Complex64::new(0.0, 0.0),
                -y12,
                y12 + sh,
            ],
        )
    }

    fn state() -> DVector<f64> {
        DVector::from_vec(vec![1.0, 0.97, 0.95, 0.02, -0.03, -0.05])
    }

    #[test]
    fn injections_match_complex_power() {
        let y = three_bus_y();
        let x = state();
        let v: Vec<Complex64> = (0..3).map(|k| Complex64::new(x[k], x[k + 3])).collect();
        let calc = power_injections(&y, &x);
        for i in 1..3 {
            let current: Complex64 = (0..3).map(|k| y[(i, k)] * v[k]).sum();
            let s = v[i] * current.conj();
            assert!((calc[i - 1] - s.re).abs() < 1e-12);
            assert!((calc[i + 1] - s.im).abs() < 1e-12);
        }
    }

    #[test]
    fn analytic_matches_finite_difference() {
        let y = three_bus_y();
        let x = state();
        let analytic = build_jacobian(&y, &x);

        // Perturb only the PQ components; slack stays fixed
        let reduced = DVector::from_vec(vec![x[1], x[2], x[4], x[5]]);
        let f = |r: &DVector<f64>| -> SolverResult<DVector<f64>> {
            let full = DVector::from_vec(vec![x[0], r[0], r[1], x[3], r[2], r[3]]);
            Ok(power_injections(&y, &full))
        };
        let numeric = finite_difference_jacobian(&reduced, f, 1e-7).unwrap();

        for i in 0..4 {
            for j in 0..4 {
                assert!(
                    (analytic[(i, j)] - numeric[(i, j)]).abs() < 1e-5,
                    "J[{i},{j}]: analytic {} vs numeric {}",
                    analytic[(i, j)],
                    numeric[(i, j)]
                );
            }
        }
    }

    #[test]
    fn finite_difference_linear() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, 2.0 * x[0]))
        };
        let x = DVector::from_element(1, 3.0);
        let jac = finite_difference_jacobian(&x, f, 1e-7).unwrap();
        assert!((jac[(0, 0)] - 2.0).abs() < 1e-5);
    }
}
