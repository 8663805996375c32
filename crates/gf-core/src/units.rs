// gf-core/src/units.rs

use uom::si::f64::{
    ElectricPotential as UomElectricPotential, ElectricalConductance as UomElectricalConductance,
    Power as UomPower,
};

// Public canonical unit types (SI, f64)
pub type Voltage = UomElectricPotential;
pub type Conductance = UomElectricalConductance;
/// Active, reactive and apparent power share the watt dimension.
pub type Power = UomPower;

#[inline]
pub fn volts(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}
