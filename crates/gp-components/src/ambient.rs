//! Ambient / flight conditions component.

use crate::component::Component;
use crate::context::{Mode, SimContext};
use crate::error::{ComponentError, ComponentResult};
use gp_core::ids::Station;
use gp_core::units::{k, kgps, pa};
use gp_results::OutputRow;
use gp_thermo::GasState;

/// Standard-atmosphere interface: altitude to static temperature, static
/// pressure and sound speed.
pub trait Atmosphere {
    fn conditions(&self, altitude_m: f64) -> (f64, f64, f64);
}

/// ISA standard atmosphere, troposphere and lower stratosphere.
pub struct IsaAtmosphere;

impl Atmosphere for IsaAtmosphere {
    fn conditions(&self, altitude_m: f64) -> (f64, f64, f64) {
        const T0: f64 = 288.15;
        const P0: f64 = 101_325.0;
        const LAPSE: f64 = 0.0065;
        const R_AIR: f64 = 287.052_87;
        const G0: f64 = 9.806_65;

        let (ts, ps) = if altitude_m <= 11_000.0 {
            let ts = T0 - LAPSE * altitude_m;
            let ps = P0 * (ts / T0).powf(G0 / (R_AIR * LAPSE));
            (ts, ps)
        } else {
            let ts = 216.65;
            let p11 = P0 * (ts / T0).powf(G0 / (R_AIR * LAPSE));
            let ps = p11 * (-G0 * (altitude_m - 11_000.0) / (R_AIR * ts)).exp();
            (ts, ps)
        };
        let a = (1.4 * R_AIR * ts).sqrt();
        (ts, ps, a)
    }
}

/// User-declared ambient conditions.
///
/// `psa`/`tsa` override the standard atmosphere when given. `dts` shifts
/// the standard-atmosphere temperature and applies ONLY when `tsa` is not
/// supplied; an explicit `tsa` silently wins over a nonzero `dts`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientConditions {
    pub altitude_m: f64,
    pub mach: f64,
    pub dts: Option<f64>,
    pub psa: Option<f64>,
    pub tsa: Option<f64>,
}

/// Publishes the flight condition and seeds the front gas-path station
/// with total-condition air.
pub struct Ambient {
    name: String,
    station: Station,
    design: AmbientConditions,
    offdesign: AmbientConditions,
    atmosphere: Box<dyn Atmosphere>,
    // last evaluated values, for outputs
    alt: f64,
    mach: f64,
    tsa: f64,
    psa: f64,
    tta: f64,
    pta: f64,
}

impl Ambient {
    pub fn new(
        name: impl Into<String>,
        station: Station,
        conditions: AmbientConditions,
        atmosphere: Box<dyn Atmosphere>,
    ) -> Self {
        Self {
            name: name.into(),
            station,
            design: conditions,
            offdesign: conditions,
            atmosphere,
            alt: 0.0,
            mach: 0.0,
            tsa: 0.0,
            psa: 0.0,
            tta: 0.0,
            pta: 0.0,
        }
    }

    /// Replace the conditions used for one of the two run modes.
    pub fn set_conditions(&mut self, mode: Mode, conditions: AmbientConditions) {
        match mode {
            Mode::Dp => self.design = conditions,
            Mode::Od => self.offdesign = conditions,
        }
    }
}

impl Component for Ambient {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        let mut cond = match mode {
            Mode::Dp => self.design,
            Mode::Od => self.offdesign,
        };

        // Adaptive-model runs may override individual condition fields.
        if mode == Mode::Od {
            if let Some(v) = ctx.override_value(&self.name, "Alt") {
                cond.altitude_m = v;
            }
            if let Some(v) = ctx.override_value(&self.name, "Macha") {
                cond.mach = v;
            }
            if let Some(v) = ctx.override_value(&self.name, "dTs") {
                cond.dts = Some(v);
            }
            if let Some(v) = ctx.override_value(&self.name, "Psa") {
                cond.psa = Some(v);
            }
            if let Some(v) = ctx.override_value(&self.name, "Tsa") {
                cond.tsa = Some(v);
            }
        }

        let (ts_std, ps_std, _) = self.atmosphere.conditions(cond.altitude_m);
        let tsa = match cond.tsa {
            Some(tsa) => tsa, // dts ignored when tsa is given
            None => ts_std + cond.dts.unwrap_or(0.0),
        };
        let psa = cond.psa.unwrap_or(ps_std);
        if tsa <= 0.0 || psa <= 0.0 {
            return Err(ComponentError::Config {
                what: format!("non-physical ambient state Tsa={tsa}, Psa={psa}"),
            });
        }

        let mach = cond.mach;
        let tta = tsa * (1.0 + 0.2 * mach * mach);
        let pta = psa * (tta / tsa).powf(3.5);
        let a = (1.4 * 287.052_87 * tsa).sqrt();
        let v_flight = mach * a;

        self.alt = cond.altitude_m;
        self.mach = mach;
        self.tsa = tsa;
        self.psa = psa;
        self.tta = tta;
        self.pta = pta;

        ctx.ambient = crate::context::AmbientState {
            altitude_m: cond.altitude_m,
            mach,
            tsa,
            psa,
            tta,
            pta,
            v_flight,
        };

        match mode {
            Mode::Dp => {
                // Unit mass flow until the inlet claims its design flow.
                let gas = GasState::air(k(tta), pa(pta), kgps(1.0))?;
                ctx.set_station(self.station, gas);
            }
            Mode::Od => {
                let gas = ctx.station_mut(self.station)?;
                gas.set_tp(k(tta), pa(pta))?;
            }
        }
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        out.set("Alt", self.alt);
        out.set("Tsa", self.tsa);
        out.set("Psa", self.psa);
        out.set("Tta", self.tta);
        out.set("Pta", self.pta);
        out.set("Macha", self.mach);
    }
}
