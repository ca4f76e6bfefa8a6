// ds-core/src/units.rs

use uom::si::f64::{
    AngularVelocity as UomAngularVelocity, ElectricCurrent as UomElectricCurrent,
    ElectricPotential as UomElectricPotential, ElectricalResistance as UomElectricalResistance,
    Frequency as UomFrequency, Inductance as UomInductance, MagneticFlux as UomMagneticFlux,
    MomentOfInertia as UomMomentOfInertia, Power as UomPower, Time as UomTime,
    Torque as UomTorque,
};

// Public canonical unit types (SI, f64)
pub type AngularVelocity = UomAngularVelocity;
pub type Current = UomElectricCurrent;
pub type FluxLinkage = UomMagneticFlux;
pub type Frequency = UomFrequency;
pub type Inductance = UomInductance;
pub type Inertia = UomMomentOfInertia;
pub type Power = UomPower;
pub type Resistance = UomElectricalResistance;
pub type Time = UomTime;
pub type Torque = UomTorque;
pub type Voltage = UomElectricPotential;

#[inline]
pub fn volts(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn amps(v: f64) -> Current {
    use uom::si::electric_current::ampere;
    Current::new::<ampere>(v)
}

#[inline]
pub fn ohms(v: f64) -> Resistance {
    use uom::si::electrical_resistance::ohm;
    Resistance::new::<ohm>(v)
}

#[inline]
pub fn henries(v: f64) -> Inductance {
    use uom::si::inductance::henry;
    Inductance::new::<henry>(v)
}

#[inline]
pub fn webers(v: f64) -> FluxLinkage {
    use uom::si::magnetic_flux::weber;
    FluxLinkage::new::<weber>(v)
}

#[inline]
pub fn newton_meters(v: f64) -> Torque {
    use uom::si::torque::newton_meter;
    Torque::new::<newton_meter>(v)
}

#[inline]
pub fn rad_per_s(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::radian_per_second;
    AngularVelocity::new::<radian_per_second>(v)
}

#[inline]
pub fn kg_m2(v: f64) -> Inertia {
    use uom::si::moment_of_inertia::kilogram_square_meter;
    Inertia::new::<kilogram_square_meter>(v)
}

#[inline]
pub fn hz(v: f64) -> Frequency {
    use uom::si::frequency::hertz;
    Frequency::new::<hertz>(v)
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// Plain SI magnitudes for the numeric core, which works in `f64`.
pub mod si {
    use super::*;

    #[inline]
    pub fn volts(v: Voltage) -> f64 {
        v.get::<uom::si::electric_potential::volt>()
    }

    #[inline]
    pub fn amps(v: Current) -> f64 {
        v.get::<uom::si::electric_current::ampere>()
    }

    #[inline]
    pub fn ohms(v: Resistance) -> f64 {
        v.get::<uom::si::electrical_resistance::ohm>()
    }

    #[inline]
    pub fn henries(v: Inductance) -> f64 {
        v.get::<uom::si::inductance::henry>()
    }

    #[inline]
    pub fn webers(v: FluxLinkage) -> f64 {
        v.get::<uom::si::magnetic_flux::weber>()
    }

    #[inline]
    pub fn newton_meters(v: Torque) -> f64 {
        v.get::<uom::si::torque::newton_meter>()
    }

    #[inline]
    pub fn rad_per_s(v: AngularVelocity) -> f64 {
        v.get::<uom::si::angular_velocity::radian_per_second>()
    }

    #[inline]
    pub fn kg_m2(v: Inertia) -> f64 {
        v.get::<uom::si::moment_of_inertia::kilogram_square_meter>()
    }

    #[inline]
    pub fn hz(v: Frequency) -> f64 {
        v.get::<uom::si::frequency::hertz>()
    }

    #[inline]
    pub fn watts(v: Power) -> f64 {
        v.get::<uom::si::power::watt>()
    }

    #[inline]
    pub fn seconds(v: Time) -> f64 {
        v.get::<uom::si::time::second>()
    }
}
