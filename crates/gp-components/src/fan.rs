//! Fan with separate core and bypass-duct maps.

use crate::component::{Component, GaspathLink};
use crate::context::{Mode, SimContext};
use crate::error::{ComponentError, ComponentResult};
use crate::gaspath::{GaspathFlow, write_turbo_outputs};
use gp_core::ids::{ShaftNr, Station};
use gp_core::units::{flow_correction, rotor_speed_correction};
use gp_maps::TurboMap;
use gp_results::OutputRow;
use gp_thermo::{GasState, compression};
use std::path::PathBuf;

/// Map parameters for one side of the fan.
#[derive(Debug, Clone)]
pub struct FanSideSpec {
    pub map_path: PathBuf,
    pub nc_map_des: f64,
    pub beta_map_des: f64,
    pub pr_des: f64,
    pub eta_des: f64,
}

struct FanSide {
    spec: FanSideSpec,
    map: Option<TurboMap>,
    istate_beta: Option<usize>,
    ierror_wc: Option<usize>,
    // per-evaluation diagnostics
    wc: f64,
    pr: f64,
    eta: f64,
    pw: f64,
}

impl FanSide {
    fn new(spec: FanSideSpec) -> Self {
        Self {
            spec,
            map: None,
            istate_beta: None,
            ierror_wc: None,
            wc: 0.0,
            pr: 0.0,
            eta: 0.0,
            pw: 0.0,
        }
    }
}

/// One rotor feeding two streams: the core side and the bypass duct, each
/// matched on its own compressor-style map. The bypass ratio is a free
/// state; the two mass-flow residuals compare each map's flow against the
/// design-split share of the inlet flow, while the actual outlet masses
/// follow the current bypass ratio.
pub struct Fan {
    name: String,
    flow: GaspathFlow,
    station_out_duct: Station,
    shaft_nr: ShaftNr,
    n_des: f64,
    bpr_des: f64,
    core: FanSide,
    duct: FanSide,

    istate_n: Option<usize>,
    istate_bpr: Option<usize>,

    nc_des: f64,
    n: f64,
    nc: f64,
    bpr: f64,
    pw: f64,
    gas_in: Option<GasState>,
}

impl Fan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        station_in: Station,
        station_out_core: Station,
        station_out_duct: Station,
        shaft_nr: ShaftNr,
        n_des: f64,
        bpr_des: f64,
        core: FanSideSpec,
        duct: FanSideSpec,
    ) -> ComponentResult<Self> {
        let name = name.into();
        if bpr_des <= 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design bypass ratio must be positive"),
            });
        }
        if n_des <= 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design speed must be positive"),
            });
        }
        for (side, spec) in [("core", &core), ("duct", &duct)] {
            if spec.pr_des <= 1.0 || spec.eta_des <= 0.0 || spec.eta_des > 1.0 {
                return Err(ComponentError::Config {
                    what: format!("{name}: {side} design point out of range"),
                });
            }
        }
        Ok(Self {
            name,
            flow: GaspathFlow::new(station_in, station_out_core, core.pr_des),
            station_out_duct,
            shaft_nr,
            n_des,
            bpr_des,
            core: FanSide::new(core),
            duct: FanSide::new(duct),
            istate_n: None,
            istate_bpr: None,
            nc_des: 0.0,
            n: n_des,
            nc: 0.0,
            bpr: bpr_des,
            pw: 0.0,
            gas_in: None,
        })
    }

    fn map_key(&self, side: &str) -> String {
        format!("{}.{side}", self.name)
    }
}

impl Component for Fan {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        let gas_in = self.flow.begin(ctx, mode)?;
        ctx.shaft_mut(self.shaft_nr, &self.name);
        let w_in = gas_in.mdot_kgps();
        let corr = flow_correction(gas_in.t_k(), gas_in.p_pa());

        // Residual split is always by the DESIGN bypass ratio; actual
        // outlet masses follow the current one.
        let w_core_split = w_in / (self.bpr_des + 1.0);
        let w_duct_split = w_in * self.bpr_des / (self.bpr_des + 1.0);

        match mode {
            Mode::Dp => {
                self.bpr = self.bpr_des;
                self.nc_des = self.n_des / rotor_speed_correction(gas_in.t_k());
                self.n = self.n_des;
                self.nc = self.nc_des;

                let wc_core_des = w_core_split * corr;
                let mut core_map = TurboMap::load_compressor(
                    &self.core.spec.map_path,
                    self.core.spec.nc_map_des,
                    self.core.spec.beta_map_des,
                )?;
                core_map.set_scaling(
                    self.nc_des,
                    wc_core_des,
                    self.core.spec.pr_des,
                    self.core.spec.eta_des,
                )?;
                self.core.map = Some(core_map);
                let (mut out_core, pw_core) = compression(
                    &gas_in,
                    w_core_split,
                    self.core.spec.pr_des,
                    self.core.spec.eta_des,
                    false,
                )?;
                self.core.wc = wc_core_des;
                self.core.pr = self.core.spec.pr_des;
                self.core.eta = self.core.spec.eta_des;
                self.core.pw = pw_core;

                let wc_duct_des = w_duct_split * corr;
                let mut duct_map = TurboMap::load_compressor(
                    &self.duct.spec.map_path,
                    self.duct.spec.nc_map_des,
                    self.duct.spec.beta_map_des,
                )?;
                duct_map.set_scaling(
                    self.nc_des,
                    wc_duct_des,
                    self.duct.spec.pr_des,
                    self.duct.spec.eta_des,
                )?;
                self.duct.map = Some(duct_map);
                let (mut out_duct, pw_duct) = compression(
                    &gas_in,
                    w_duct_split,
                    self.duct.spec.pr_des,
                    self.duct.spec.eta_des,
                    false,
                )?;
                self.duct.wc = wc_duct_des;
                self.duct.pr = self.duct.spec.pr_des;
                self.duct.eta = self.duct.spec.eta_des;
                self.duct.pw = pw_duct;

                self.pw = pw_core + pw_duct;
                ctx.shaft_mut(self.shaft_nr, &self.name).pw_sum -= self.pw;

                // Rotor speed, bypass ratio, one beta per map.
                let istate_n = ctx.push_state();
                self.istate_n = Some(istate_n);
                ctx.shaft_mut(self.shaft_nr, &self.name).istate = Some(istate_n);
                self.istate_bpr = Some(ctx.push_state());
                self.core.istate_beta = Some(ctx.push_state());
                self.duct.istate_beta = Some(ctx.push_state());
                self.core.ierror_wc = Some(ctx.push_error());
                self.duct.ierror_wc = Some(ctx.push_error());

                out_core.set_mass_flow_kgps(w_in / (self.bpr + 1.0));
                out_duct.set_mass_flow_kgps(w_in * self.bpr / (self.bpr + 1.0));
                ctx.set_station(self.flow.station_out, out_core);
                ctx.set_station(self.station_out_duct, out_duct);
            }
            Mode::Od => {
                let istate = ctx.shaft(self.shaft_nr).and_then(|s| s.istate);
                self.n = ctx.state(istate, "fan shaft speed")? * self.n_des;
                self.nc = self.n / rotor_speed_correction(gas_in.t_k());
                self.bpr = ctx.state(self.istate_bpr, "fan bypass ratio")? * self.bpr_des;

                let core_map = self.core.map.as_ref().ok_or(ComponentError::SlotNotRegistered {
                    what: "fan core map before design pass",
                })?;
                let duct_map = self.duct.map.as_ref().ok_or(ComponentError::SlotNotRegistered {
                    what: "fan duct map before design pass",
                })?;

                let core_beta = ctx.state(self.core.istate_beta, "fan core beta")?;
                let duct_beta = ctx.state(self.duct.istate_beta, "fan duct beta")?;
                let core_point = core_map.scaled_performance(
                    self.nc,
                    core_beta,
                    &ctx.map_modifiers(&self.map_key("core")),
                );
                let duct_point = duct_map.scaled_performance(
                    self.nc,
                    duct_beta,
                    &ctx.map_modifiers(&self.map_key("duct")),
                );

                let w_core_actual = w_in / (self.bpr + 1.0);
                let w_duct_actual = w_in * self.bpr / (self.bpr + 1.0);
                let (mut out_core, pw_core) =
                    compression(&gas_in, w_core_actual, core_point.pr, core_point.eta, false)?;
                let (mut out_duct, pw_duct) =
                    compression(&gas_in, w_duct_actual, duct_point.pr, duct_point.eta, false)?;

                self.core.wc = core_point.wc;
                self.core.pr = core_point.pr;
                self.core.eta = core_point.eta;
                self.core.pw = pw_core;
                self.duct.wc = duct_point.wc;
                self.duct.pr = duct_point.pr;
                self.duct.eta = duct_point.eta;
                self.duct.pw = pw_duct;
                self.pw = pw_core + pw_duct;
                ctx.shaft_mut(self.shaft_nr, &self.name).pw_sum -= self.pw;

                let w_core_map = core_point.wc / corr;
                let w_duct_map = duct_point.wc / corr;
                ctx.set_error(
                    self.core.ierror_wc,
                    "fan core mass flow",
                    (w_core_map - w_core_split) / self.flow.w_des,
                )?;
                ctx.set_error(
                    self.duct.ierror_wc,
                    "fan duct mass flow",
                    (w_duct_map - w_duct_split) / self.flow.w_des,
                )?;

                out_core.set_mass_flow_kgps(w_core_map);
                out_duct.set_mass_flow_kgps(w_duct_map);
                ctx.set_station(self.flow.station_out, out_core);
                ctx.set_station(self.station_out_duct, out_duct);
            }
        }
        self.gas_in = Some(gas_in);
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        if let Some(gas_in) = &self.gas_in {
            let s = self.flow.station_in;
            out.set(&format!("W{s}"), gas_in.mdot_kgps());
            out.set(&format!("Wc{s}"), self.flow.wc);
            out.set(&format!("T{s}"), gas_in.t_k());
            out.set(&format!("P{s}"), gas_in.p_pa());
        }
        write_turbo_outputs(
            out,
            self.shaft_nr,
            self.flow.station_in,
            &self.name,
            self.n,
            self.n_des,
            self.nc,
            self.nc_des,
            None,
            self.pw,
        );
        out.set(&format!("BPR_{}", self.name), self.bpr);
        out.set(&format!("PR_core_{}", self.name), self.core.pr);
        out.set(&format!("PR_duct_{}", self.name), self.duct.pr);
        out.set(&format!("Wc_core_{}", self.name), self.core.wc);
        out.set(&format!("Wc_duct_{}", self.name), self.duct.wc);
        out.set(&format!("Eta_is_core_{}", self.name), self.core.eta);
        out.set(&format!("Eta_is_duct_{}", self.name), self.duct.eta);
    }

    fn gaspath_link(&self) -> Option<GaspathLink> {
        Some(GaspathLink {
            station_in: self.flow.station_in,
            station_out: self.flow.station_out,
            pr_des: self.core.spec.pr_des,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gp_core::units::constants::{P_STD_PA, T_STD_K};
    use gp_core::units::{k, kgps, pa};
    use std::io::Write;

    const MAP: &str = "\
Synthetic fan-side map.
99 1 TEST FAN SIDE
REYNOLDS RNI=1.0 f_RNI=1.0 RNI=1.0 f_RNI=1.0
 MASS FLOW
 5.005 0.20 0.45 0.70 0.95
 0.70  0.62  0.66  0.70  0.74
 0.85  0.78  0.82  0.86  0.90
 1.00  0.94  0.98  1.02  1.06
 1.10  1.06  1.10  1.14  1.18
 EFFICIENCY
 5.005 0.20 0.45 0.70 0.95
 0.70  0.80  0.82  0.83  0.82
 0.85  0.82  0.84  0.85  0.84
 1.00  0.84  0.86  0.87  0.86
 1.10  0.83  0.85  0.86  0.85
 PRESSURE RATIO
 5.005 0.20 0.45 0.70 0.95
 0.70  1.20  1.26  1.32  1.38
 0.85  1.42  1.48  1.54  1.60
 1.00  1.64  1.70  1.76  1.82
 1.10  1.80  1.86  1.92  1.98
 SURGE LINE
 2.005 0.60 0.80 1.00 1.20
 1.0   1.45  1.65  1.90  2.10
";

    fn map_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MAP.as_bytes()).unwrap();
        file
    }

    fn side(map: &tempfile::NamedTempFile, pr_des: f64, eta_des: f64) -> FanSideSpec {
        FanSideSpec {
            map_path: map.path().to_path_buf(),
            nc_map_des: 1.0,
            beta_map_des: 0.70,
            pr_des,
            eta_des,
        }
    }

    #[test]
    fn design_pass_splits_by_bypass_ratio() {
        let map = map_file();
        let mut ctx = SimContext::new();
        ctx.set_station(
            2,
            GasState::air(k(T_STD_K), pa(P_STD_PA), kgps(337.0)).unwrap(),
        );
        let mut fan = Fan::new(
            "FAN",
            2,
            25,
            21,
            1,
            4_880.0,
            5.3,
            side(&map, 1.65, 0.87),
            side(&map, 1.70, 0.86),
        )
        .unwrap();
        fan.run(&mut ctx, Mode::Dp, 0).unwrap();

        // n, BPR, two betas; two mass-flow residuals.
        assert_eq!(ctx.states.len(), 4);
        assert_eq!(ctx.errors.len(), 2);

        let core = ctx.station(25).unwrap();
        let duct = ctx.station(21).unwrap();
        assert_relative_eq!(core.mdot_kgps(), 337.0 / 6.3, max_relative = 1e-9);
        assert_relative_eq!(duct.mdot_kgps(), 337.0 * 5.3 / 6.3, max_relative = 1e-9);
        assert_relative_eq!(core.p_pa(), 1.65 * P_STD_PA, max_relative = 1e-9);
        assert_relative_eq!(duct.p_pa(), 1.70 * P_STD_PA, max_relative = 1e-9);
        // Fan absorbs the sum of both sides' power.
        assert!(ctx.shaft(1).unwrap().pw_sum < 0.0);
    }

    #[test]
    fn off_design_at_design_states_closes_both_residuals() {
        let map = map_file();
        let mut ctx = SimContext::new();
        ctx.set_station(
            2,
            GasState::air(k(T_STD_K), pa(P_STD_PA), kgps(337.0)).unwrap(),
        );
        let mut fan = Fan::new(
            "FAN",
            2,
            25,
            21,
            1,
            4_880.0,
            5.3,
            side(&map, 1.65, 0.87),
            side(&map, 1.70, 0.86),
        )
        .unwrap();
        fan.run(&mut ctx, Mode::Dp, 0).unwrap();
        fan.run(&mut ctx, Mode::Od, 1).unwrap();

        assert!(ctx.errors[0].abs() < 1e-9, "core residual {}", ctx.errors[0]);
        assert!(ctx.errors[1].abs() < 1e-9, "duct residual {}", ctx.errors[1]);
        assert_relative_eq!(fan.bpr, 5.3, max_relative = 1e-12);
    }

    #[test]
    fn current_bpr_moves_the_actual_split_but_not_the_residual_target() {
        let map = map_file();
        let mut ctx = SimContext::new();
        ctx.set_station(
            2,
            GasState::air(k(T_STD_K), pa(P_STD_PA), kgps(337.0)).unwrap(),
        );
        let mut fan = Fan::new(
            "FAN",
            2,
            25,
            21,
            1,
            4_880.0,
            5.3,
            side(&map, 1.65, 0.87),
            side(&map, 1.70, 0.86),
        )
        .unwrap();
        fan.run(&mut ctx, Mode::Dp, 0).unwrap();

        // Nudge the BPR state only: outlet masses shift with the current
        // BPR while the residual targets stay at the design split, so the
        // residuals stay zero (map betas unchanged).
        ctx.states[1] = 1.05;
        fan.run(&mut ctx, Mode::Od, 1).unwrap();
        assert_relative_eq!(fan.bpr, 5.3 * 1.05, max_relative = 1e-12);
        assert!(ctx.errors[0].abs() < 1e-9);
        assert!(ctx.errors[1].abs() < 1e-9);
        let core = ctx.station(25).unwrap();
        // Outlet mass follows the map flow, which did not move.
        assert_relative_eq!(core.mdot_kgps(), 337.0 / 6.3, max_relative = 1e-9);
    }
}
