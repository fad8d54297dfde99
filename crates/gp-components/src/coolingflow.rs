//! Turbine cooling flow taken from an upstream bleed.

use crate::context::SimContext;
use crate::error::ComponentResult;
use gp_core::ids::Station;
use gp_results::OutputRow;
use gp_thermo::GasState;

/// A cooling stream drawn from a bleed station and re-injected into its
/// host turbine. Owned by the turbine, which runs it as part of its own
/// evaluation: radial pumping, partial re-expansion and mixing are
/// computed by the host.
#[derive(Debug, Clone)]
pub struct CoolingFlow {
    pub name: String,
    /// Bleed station the stream is taken from.
    pub station_in: Station,
    /// Station at which the injected stream state is published.
    pub station_out: Station,
    /// Fraction of the bleed-station flow taken.
    pub fraction: f64,
    /// Fraction of the remaining pressure head the stream re-expands
    /// through the turbine.
    pub dp_fraction: f64,
    /// Fraction of the stream counted in the turbine map continuity.
    pub w_tur_eff_fraction: f64,
    /// Radius (m) at which the stream leaves the rotor; zero disables the
    /// pumping work.
    pub r_exit: f64,

    // per-evaluation diagnostics, filled by the host turbine
    pub w: f64,
    pub pw_pump: f64,
    pub pw_exp: f64,
    pub t_injected: f64,
    pub p_injected: f64,
}

impl CoolingFlow {
    pub fn new(
        name: impl Into<String>,
        station_in: Station,
        station_out: Station,
        fraction: f64,
        dp_fraction: f64,
        w_tur_eff_fraction: f64,
        r_exit: f64,
    ) -> Self {
        Self {
            name: name.into(),
            station_in,
            station_out,
            fraction,
            dp_fraction,
            w_tur_eff_fraction,
            r_exit,
            w: 0.0,
            pw_pump: 0.0,
            pw_exp: 0.0,
            t_injected: 0.0,
            p_injected: 0.0,
        }
    }

    /// Read the bleed station and return the extracted stream.
    pub fn extract(&mut self, ctx: &SimContext) -> ComponentResult<GasState> {
        let source = ctx.station(self.station_in)?;
        let mut stream = source.clone();
        self.w = source.mdot_kgps() * self.fraction;
        stream.set_mass_flow_kgps(self.w);
        Ok(stream)
    }

    pub fn write_outputs(&self, out: &mut OutputRow) {
        out.set(
            &format!("CoolingFraction_{}", self.name),
            self.fraction,
        );
        out.set(&format!("T{}j", self.station_in), self.t_injected);
        out.set(&format!("P{}j", self.station_in), self.p_injected);
        out.set(&format!("PWpump{}", self.station_out), self.pw_pump);
        out.set(&format!("PWexp{}", self.station_out), self.pw_exp);
    }
}
