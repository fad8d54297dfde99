//! Exhaust diffuser for shaft-power engines.

use crate::component::{Component, GaspathLink};
use crate::context::{Mode, SimContext};
use crate::error::ComponentResult;
use crate::gaspath::GaspathFlow;
use gp_core::ids::Station;
use gp_core::units::{k, pa};
use gp_results::OutputRow;
use gp_thermo::GasState;

/// Subsonic exhaust diffuser: instead of a thrust-producing throat it
/// carries a back-pressure residual tying the diffused exit to ambient
/// static pressure, with the usual flow-squared pressure loss.
pub struct ExhaustDiffuser {
    name: String,
    flow: GaspathFlow,
    pr_des: f64,
    ierror_p: Option<usize>,
    gas_in: Option<GasState>,
    t_out: f64,
    p_out: f64,
}

impl ExhaustDiffuser {
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
            ierror_p: None,
            gas_in: None,
            t_out: 0.0,
            p_out: 0.0,
        }
    }
}

impl Component for ExhaustDiffuser {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        let gas_in = self.flow.begin(ctx, mode)?;
        let p_amb = ctx.ambient.psa;

        let dp_rel = (1.0 - self.pr_des) * (self.flow.wc / self.flow.wc_des).powi(2);
        let pr = 1.0 - dp_rel;
        self.flow.pr = Some(pr);

        match mode {
            Mode::Dp => {
                self.ierror_p = Some(ctx.push_error());
            }
            Mode::Od => {
                ctx.set_error(
                    self.ierror_p,
                    "diffuser back pressure",
                    (gas_in.p_pa() * pr - p_amb) / p_amb,
                )?;
            }
        }

        let mut gas_out = gas_in.clone();
        gas_out.set_tp(k(gas_in.t_k()), pa(p_amb))?;
        self.t_out = gas_out.t_k();
        self.p_out = gas_out.p_pa();
        ctx.set_station(self.flow.station_out, gas_out);
        self.gas_in = Some(gas_in);
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        if let Some(gas_in) = &self.gas_in {
            self.flow.write_outputs(&self.name, gas_in, out);
        }
        out.set(&format!("T{}", self.flow.station_out), self.t_out);
        out.set(&format!("P{}", self.flow.station_out), self.p_out);
    }

    fn gaspath_link(&self) -> Option<GaspathLink> {
        Some(GaspathLink {
            station_in: self.flow.station_in,
            station_out: self.flow.station_out,
            pr_des: self.pr_des,
        })
    }
}
