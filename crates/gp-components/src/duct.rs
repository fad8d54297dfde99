//! Duct with a flow-squared pressure loss.

use crate::component::{Component, GaspathLink};
use crate::context::{Mode, SimContext};
use crate::error::ComponentResult;
use crate::gaspath::GaspathFlow;
use gp_core::ids::Station;
use gp_core::units::{k, pa};
use gp_results::OutputRow;
use gp_thermo::GasState;

/// Adiabatic duct: the relative pressure loss scales with the square of
/// the corrected flow, dp = (1 - PRdes) * (Wc/Wcdes)^2. No states or
/// residuals.
pub struct Duct {
    name: String,
    flow: GaspathFlow,
    pr_des: f64,
    gas_in: Option<GasState>,
}

impl Duct {
    pub fn new(
        name: impl Into<String>,
        station_in: Station,
        station_out: Station,
        pr_des: f64,
    ) -> Self {
        Self {
            name: name.into(),
            flow: GaspathFlow::new(station_in, station_out, pr_des),
            pr_des,
            gas_in: None,
        }
    }
}

impl Component for Duct {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        let gas_in = self.flow.begin(ctx, mode)?;
        let dp_rel = (1.0 - self.pr_des) * (self.flow.wc / self.flow.wc_des).powi(2);
        let pr = 1.0 - dp_rel;
        self.flow.pr = Some(pr);

        let mut gas_out = gas_in.clone();
        gas_out.set_tp(k(gas_in.t_k()), pa(gas_in.p_pa() * pr))?;
        ctx.set_station(self.flow.station_out, gas_out);
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
