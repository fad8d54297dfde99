// gp-core/src/units.rs

use uom::si::f64::{
    Area as UomArea, Energy as UomEnergy, Length as UomLength, Mass as UomMass,
    MassDensity as UomMassDensity, MassRate as UomMassRate, Power as UomPower,
    Pressure as UomPressure, Ratio as UomRatio,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Energy = UomEnergy;
pub type Length = UomLength;
pub type Mass = UomMass;
pub type Density = UomMassDensity;
pub type MassRate = UomMassRate;
pub type Power = UomPower;
pub type Pressure = UomPressure;
pub type Ratio = UomRatio;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type Velocity = UomVelocity;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn watt(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

pub mod constants {
    /// Standard-day sea level static temperature (K) used for corrected
    /// speeds and flows.
    pub const T_STD_K: f64 = 288.15;

    /// Standard-day sea level static pressure (Pa).
    pub const P_STD_PA: f64 = 101_325.0;

    /// Reference temperature for combustion enthalpy bookkeeping (K).
    pub const T_REF_K: f64 = 298.15;

    /// Reference pressure for combustion enthalpy bookkeeping (Pa).
    pub const P_REF_PA: f64 = 101_325.0;

    /// Universal gas constant (J/(kmol*K)).
    pub const R_UNIVERSAL: f64 = 8_314.462_618;
}

/// Corrected-speed denominator sqrt(T/T_std) for a total temperature in K.
#[inline]
pub fn rotor_speed_correction(t_k: f64) -> f64 {
    (t_k / constants::T_STD_K).sqrt()
}

/// Corrected-flow factor sqrt(T/T_std)/(P/P_std); multiply an absolute mass
/// flow by this to obtain the corrected flow Wc.
#[inline]
pub fn flow_correction(t_k: f64, p_pa: f64) -> f64 {
    (t_k / constants::T_STD_K).sqrt() / (p_pa / constants::P_STD_PA)
}
