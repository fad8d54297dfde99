//! Inlet with constant pressure recovery.

use crate::component::{Component, GaspathLink};
use crate::context::{Mode, SimContext};
use crate::error::ComponentResult;
use crate::gaspath::GaspathFlow;
use gp_core::ids::Station;
use gp_core::units::{flow_correction, k, pa};
use gp_results::OutputRow;
use gp_thermo::GasState;

/// Claims the engine mass flow at the front of the gas path and applies a
/// constant design pressure recovery.
///
/// Registers one free state: the corrected-inlet-flow multiplier. The
/// corrected flow is the state (rather than the absolute flow) because it
/// keeps the multiplier near one at altitude; the matching residual is
/// closed downstream by the exhaust continuity equation.
pub struct Inlet {
    name: String,
    flow: GaspathFlow,
    w_des: f64,
    pr_des: f64,
    istate_wc: Option<usize>,
    gas_in: Option<GasState>,
}

impl Inlet {
    pub fn new(
        name: impl Into<String>,
        station_in: Station,
        station_out: Station,
        w_des: f64,
        pr_des: f64,
    ) -> Self {
        Self {
            name: name.into(),
            flow: GaspathFlow::new(station_in, station_out, pr_des),
            w_des,
            pr_des,
            istate_wc: None,
            gas_in: None,
        }
    }
}

impl Component for Inlet {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        // Fix the inlet mass flow before the shared bookkeeping reads it.
        let w = match mode {
            Mode::Dp => self.w_des,
            Mode::Od => {
                let gas = ctx.station(self.flow.station_in)?;
                let corr = flow_correction(gas.t_k(), gas.p_pa());
                let wc = ctx.state(self.istate_wc, "inlet corrected flow")? * self.flow.wc_des;
                wc / corr
            }
        };
        ctx.station_mut(self.flow.station_in)?.set_mass_flow_kgps(w);

        let gas_in = self.flow.begin(ctx, mode)?;
        if mode == Mode::Dp {
            self.istate_wc = Some(ctx.push_state());
        }
        self.flow.pr = Some(self.pr_des);

        let mut gas_out = gas_in.clone();
        gas_out.set_tp(k(gas_in.t_k()), pa(gas_in.p_pa() * self.pr_des))?;
        ctx.set_station(self.flow.station_out, gas_out);

        // Ram drag from the captured stream tube.
        ctx.totals.rd += w * ctx.ambient.v_flight;
        self.gas_in = Some(gas_in);
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        if let Some(gas_in) = &self.gas_in {
            self.flow.write_outputs(&self.name, gas_in, out);
        }
    }

    fn gaspath_link(&self) -> Option<GaspathLink> {
        Some(GaspathLink {
            station_in: self.flow.station_in,
            station_out: self.flow.station_out,
            pr_des: self.pr_des,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::{Ambient, AmbientConditions, IsaAtmosphere};
    use approx::assert_relative_eq;
    use gp_core::units::constants::P_STD_PA;

    fn static_day(ctx: &mut SimContext) {
        let mut ambient = Ambient::new(
            "Ambient",
            0,
            AmbientConditions::default(),
            Box::new(IsaAtmosphere),
        );
        ambient.run(ctx, Mode::Dp, 0).unwrap();
    }

    #[test]
    fn design_pass_claims_flow_and_registers_a_state() {
        let mut ctx = SimContext::new();
        static_day(&mut ctx);
        let mut inlet = Inlet::new("Inlet1", 0, 2, 19.9, 1.0);
        inlet.run(&mut ctx, Mode::Dp, 0).unwrap();

        assert_eq!(ctx.states.len(), 1);
        assert_eq!(ctx.errors.len(), 0);
        let out = ctx.station(2).unwrap();
        assert_relative_eq!(out.mdot_kgps(), 19.9, epsilon = 1e-12);
        assert_relative_eq!(out.p_pa(), P_STD_PA, epsilon = 1e-6);
    }

    #[test]
    fn pressure_recovery_applies() {
        let mut ctx = SimContext::new();
        static_day(&mut ctx);
        let mut inlet = Inlet::new("Inlet1", 0, 2, 100.0, 0.99);
        inlet.run(&mut ctx, Mode::Dp, 0).unwrap();
        assert_relative_eq!(
            ctx.station(2).unwrap().p_pa(),
            0.99 * P_STD_PA,
            max_relative = 1e-9
        );
    }

    #[test]
    fn off_design_state_scales_the_corrected_flow() {
        let mut ctx = SimContext::new();
        static_day(&mut ctx);
        let mut inlet = Inlet::new("Inlet1", 0, 2, 19.9, 1.0);
        inlet.run(&mut ctx, Mode::Dp, 0).unwrap();

        ctx.states[0] = 0.9;
        inlet.run(&mut ctx, Mode::Od, 1).unwrap();
        assert_relative_eq!(
            ctx.station(2).unwrap().mdot_kgps(),
            0.9 * 19.9,
            max_relative = 1e-9
        );
    }

    #[test]
    fn ram_drag_accumulates_with_flight_speed() {
        let mut ctx = SimContext::new();
        let mut ambient = Ambient::new(
            "Ambient",
            0,
            AmbientConditions {
                mach: 0.8,
                ..Default::default()
            },
            Box::new(IsaAtmosphere),
        );
        ambient.run(&mut ctx, Mode::Dp, 0).unwrap();

        let mut inlet = Inlet::new("Inlet1", 0, 2, 100.0, 1.0);
        inlet.run(&mut ctx, Mode::Dp, 0).unwrap();
        assert_relative_eq!(
            ctx.totals.rd,
            100.0 * ctx.ambient.v_flight,
            max_relative = 1e-12
        );
    }
}
