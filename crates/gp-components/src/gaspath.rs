//! Shared flow bookkeeping for gas-path components.

use crate::context::{Mode, SimContext};
use crate::error::ComponentResult;
use gp_core::ids::Station;
use gp_core::units::flow_correction;
use gp_results::OutputRow;
use gp_thermo::GasState;

/// Inlet/outlet stations plus the design and corrected flow bookkeeping
/// every gas-path component repeats: at the design point it records the
/// design mass flow and corrected flow, off-design it recomputes the
/// corrected flow from the current inlet state.
#[derive(Debug, Clone)]
pub struct GaspathFlow {
    pub station_in: Station,
    pub station_out: Station,
    pub pr_des: f64,
    pub w_des: f64,
    pub wc_des: f64,
    pub wc: f64,
    /// Current pressure ratio, published once the component computes it.
    pub pr: Option<f64>,
}

impl GaspathFlow {
    pub fn new(station_in: Station, station_out: Station, pr_des: f64) -> Self {
        Self {
            station_in,
            station_out,
            pr_des,
            w_des: 0.0,
            wc_des: 0.0,
            wc: 0.0,
            pr: None,
        }
    }

    /// Read the inlet station and refresh the flow bookkeeping; returns a
    /// working copy of the inlet state.
    pub fn begin(&mut self, ctx: &SimContext, mode: Mode) -> ComponentResult<GasState> {
        let gas_in = ctx.station(self.station_in)?.clone();
        let corr = flow_correction(gas_in.t_k(), gas_in.p_pa());
        match mode {
            Mode::Dp => {
                self.w_des = gas_in.mdot_kgps();
                self.wc_des = self.w_des * corr;
                self.wc = self.wc_des;
            }
            Mode::Od => {
                self.wc = gas_in.mdot_kgps() * corr;
            }
        }
        Ok(gas_in)
    }

    /// The standard station outputs: W, Wc, T, P at the inlet plus the
    /// component pressure ratio.
    pub fn write_outputs(&self, name: &str, gas_in: &GasState, out: &mut OutputRow) {
        let s = self.station_in;
        out.set(&format!("W{s}"), gas_in.mdot_kgps());
        out.set(&format!("Wc{s}"), self.wc);
        out.set(&format!("T{s}"), gas_in.t_k());
        out.set(&format!("P{s}"), gas_in.p_pa());
        if let Some(pr) = self.pr {
            out.set(&format!("PR_{name}"), pr);
        }
    }
}

/// The rotor-speed outputs every turbo component publishes.
#[allow(clippy::too_many_arguments)]
pub fn write_turbo_outputs(
    out: &mut OutputRow,
    shaft_nr: gp_core::ids::ShaftNr,
    station_in: Station,
    name: &str,
    n: f64,
    n_des: f64,
    nc: f64,
    nc_des: f64,
    eta: Option<f64>,
    pw: f64,
) {
    out.set(&format!("N{shaft_nr}"), n);
    out.set(&format!("Nc{station_in}"), nc);
    out.set(&format!("N{shaft_nr}%"), n / n_des * 100.0);
    out.set(&format!("Nc{station_in}%"), nc / nc_des * 100.0);
    if let Some(eta) = eta {
        out.set(&format!("Eta_is_{name}"), eta);
    }
    out.set(&format!("PW_{name}"), pw);
}
