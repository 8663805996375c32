//! Per-unit base quantities.

use gf_core::units::{Conductance, Power, Voltage, volts, watts};
use gf_core::{Real, ensure_positive};

use crate::error::{NetworkError, NetworkResult};

/// Base voltage and base apparent power for per-unit normalization.
///
/// `baseY = baseS / baseV²` is derived, never stored separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseQuantities {
    voltage: Voltage,
    power: Power,
}

impl BaseQuantities {
    /// Create base quantities from volts and volt-amperes.
    pub fn new(v_volts: Real, s_va: Real) -> NetworkResult<Self> {
        let v = ensure_positive(v_volts, "V").map_err(|_| NetworkError::InvalidBase { what: "V" })?;
        let s = ensure_positive(s_va, "S").map_err(|_| NetworkError::InvalidBase { what: "S" })?;
        Ok(Self {
            voltage: volts(v),
            power: watts(s),
        })
    }

    pub fn voltage(&self) -> Voltage {
        self.voltage
    }

    pub fn power(&self) -> Power {
        self.power
    }

    /// Base admittance as a typed quantity.
    pub fn admittance(&self) -> Conductance {
        self.power / (self.voltage * self.voltage)
    }

    /// baseV in volts.
    pub fn v(&self) -> Real {
        self.voltage.value
    }

    /// baseS in VA.
    pub fn s(&self) -> Real {
        self.power.value
    }

    /// baseY in siemens.
    pub fn y(&self) -> Real {
        self.admittance().value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_base_admittance() {
        let base = BaseQuantities::new(400.0, 100_000.0).unwrap();
        assert!((base.y() - 100_000.0 / 160_000.0).abs() < 1e-15);
        assert_eq!(base.v(), 400.0);
        assert_eq!(base.s(), 100_000.0);
    }

    #[test]
    fn rejects_non_positive_bases() {
        assert_eq!(
            BaseQuantities::new(0.0, 1.0),
            Err(NetworkError::InvalidBase { what: "V" })
        );
        assert_eq!(
            BaseQuantities::new(230.0, f64::NAN),
            Err(NetworkError::InvalidBase { what: "S" })
        );
    }
}
