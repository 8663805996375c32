//! Per-unit bus admittance matrix.

use gf_network::{BaseQuantities, Line, Network};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

/// Immutable admittance model of a network.
///
/// `Y = A·diag(y)·Aᵀ + diag(|A|·b)` where `A` is the bus-by-line incidence
/// matrix (`+1` at the from bus, `-1` at the to bus), `y` the per-unit series
/// admittances and `b` the per-unit half shunt admittances. Built once and
/// shared by every solve.
#[derive(Debug, Clone)]
pub struct AdmittanceModel {
    base: BaseQuantities,
    lines: Vec<Line>,
    incidence: DMatrix<f64>,
    series: Vec<Complex64>,
    half_shunt: Vec<Complex64>,
    y: DMatrix<Complex64>,
}

impl AdmittanceModel {
    pub fn new(network: &Network, base: BaseQuantities) -> Self {
        let n = network.bus_count();
        let lines = network.lines().to_vec();
        let base_y = base.y();

        let mut incidence = DMatrix::<f64>::zeros(n, lines.len());
        for (l, line) in lines.iter().enumerate() {
            incidence[(line.from.as_usize(), l)] = 1.0;
            incidence[(line.to.as_usize(), l)] = -1.0;
        }

        let series: Vec<Complex64> = lines
            .iter()
            .map(|line| Complex64::new(1.0, 0.0) / (Complex64::new(line.r, line.x) * base_y))
            .collect();
        let half_shunt: Vec<Complex64> = lines
            .iter()
            .map(|line| Complex64::new(0.0, line.b / base_y / 2.0))
            .collect();

        let a = incidence.map(|v| Complex64::new(v, 0.0));
        let a_abs = incidence.map(|v| Complex64::new(v.abs(), 0.0));
        let y_diag = DMatrix::from_diagonal(&DVector::from_vec(series.clone()));
        let shunt = &a_abs * DVector::from_vec(half_shunt.clone());
        let y = &a * y_diag * a.transpose() + DMatrix::from_diagonal(&shunt);

        Self {
            base,
            lines,
            incidence,
            series,
            half_shunt,
            y,
        }
    }

    pub fn base(&self) -> BaseQuantities {
        self.base
    }

    pub fn bus_count(&self) -> usize {
        self.y.nrows()
    }

    pub fn pq_bus_count(&self) -> usize {
        self.bus_count() - 1
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn incidence(&self) -> &DMatrix<f64> {
        &self.incidence
    }

    /// Full per-unit admittance matrix (N×N).
    pub fn y(&self) -> &DMatrix<Complex64> {
        &self.y
    }

    /// Admittance matrix in siemens.
    pub fn y_si(&self) -> DMatrix<Complex64> {
        self.y.map(|v| v * self.base.y())
    }

    /// Per-unit series admittance of line `l`.
    pub fn series_admittance(&self, l: usize) -> Complex64 {
        self.series[l]
    }

    /// Per-unit shunt admittance placed at each end of line `l`.
    pub fn half_shunt_admittance(&self, l: usize) -> Complex64 {
        self.half_shunt[l]
    }

    /// `Yll`: the PQ-bus block, slack row and column removed.
    pub fn reduced(&self) -> DMatrix<Complex64> {
        let u = self.pq_bus_count();
        DMatrix::from_fn(u, u, |i, j| self.y[(i + 1, j + 1)])
    }

    /// `Y[1:, 0]`: coupling of every PQ bus to the slack bus.
    pub fn slack_coupling(&self) -> DVector<Complex64> {
        let u = self.pq_bus_count();
        DVector::from_fn(u, |i, _| self.y[(i + 1, 0)])
    }

    /// Complex bus current injections `Y·V` (per unit).
    pub fn injections(&self, v: &DVector<Complex64>) -> DVector<Complex64> {
        &self.y * v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_network::NetworkBuilder;

    fn two_bus(b: f64) -> AdmittanceModel {
        let mut builder = NetworkBuilder::new();
        builder.add_line(0, 1, 0.3, 0.4, b);
        let network = builder.build().unwrap();
        AdmittanceModel::new(&network, BaseQuantities::new(100.0, 10_000.0).unwrap())
    }

    #[test]
    fn single_line_entries() {
        // baseY = 1 S, so z_pu = 0.3 + j0.4 and y = 1.2 - j1.6
        let model = two_bus(0.0);
        let y = model.y();
        let expected = Complex64::new(1.2, -1.6);
        assert!((y[(0, 0)] - expected).norm() < 1e-12);
        assert!((y[(1, 1)] - expected).norm() < 1e-12);
        assert!((y[(0, 1)] + expected).norm() < 1e-12);
        assert!((y[(1, 0)] + expected).norm() < 1e-12);
    }

    #[test]
    fn shunt_split_between_ends() {
        let model = two_bus(0.2);
        let y = model.y();
        let expected = Complex64::new(1.2, -1.6 + 0.1);
        assert!((y[(0, 0)] - expected).norm() < 1e-12);
        assert!((y[(1, 1)] - expected).norm() < 1e-12);
        // Off-diagonal entries carry no shunt
        assert!((y[(0, 1)] - Complex64::new(-1.2, 1.6)).norm() < 1e-12);
    }

    #[test]
    fn symmetric_and_rows_sum_to_shunt() {
        let mut builder = NetworkBuilder::new();
        builder.add_line(0, 1, 0.1, 0.2, 0.01);
        builder.add_line(1, 2, 0.2, 0.1, 0.02);
        builder.add_line(0, 2, 0.3, 0.3, 0.0);
        let network = builder.build().unwrap();
        let model = AdmittanceModel::new(&network, BaseQuantities::new(230.0, 1e5).unwrap());
        let y = model.y();
        for i in 0..3 {
            for j in 0..3 {
                assert!((y[(i, j)] - y[(j, i)]).norm() < 1e-12);
            }
        }

        // Row sums leave only the shunt contribution at each bus
        for (bus, lines) in [(0usize, vec![0usize, 2]), (1, vec![0, 1]), (2, vec![1, 2])] {
            let row_sum: Complex64 = (0..3).map(|j| y[(bus, j)]).sum();
            let shunt: Complex64 = lines.iter().map(|&l| model.half_shunt_admittance(l)).sum();
            assert!((row_sum - shunt).norm() < 1e-12);
        }
    }

    #[test]
    fn reduced_and_coupling_slices() {
        let model = two_bus(0.0);
        assert_eq!(model.reduced().shape(), (1, 1));
        assert_eq!(model.reduced()[(0, 0)], model.y()[(1, 1)]);
        assert_eq!(model.slack_coupling()[0], model.y()[(1, 0)]);
        assert_eq!(model.incidence()[(0, 0)], 1.0);
        assert_eq!(model.incidence()[(1, 0)], -1.0);
    }

    #[test]
    fn si_scaling() {
        let model = two_bus(0.0);
        let base_y = model.base().y();
        let si = model.y_si();
        assert!((si[(0, 1)] - model.y()[(0, 1)] * base_y).norm() < 1e-12);
    }
}
