//! Turbine with map matching, shaft power closure and cooling flows.

use crate::component::{Component, GaspathLink};
use crate::context::{Mode, SimContext};
use crate::coolingflow::CoolingFlow;
use crate::error::{ComponentError, ComponentResult};
use crate::gaspath::{GaspathFlow, write_turbo_outputs};
use gp_core::ids::{ShaftNr, Station};
use gp_core::numeric::{ScalarSolveError, ScalarSolveOptions, solve_scalar};
use gp_core::units::{flow_correction, rotor_speed_correction};
use gp_maps::TurboMap;
use gp_results::OutputRow;
use gp_thermo::{GasState, turbine_expansion};
use std::f64::consts::PI;
use std::path::PathBuf;

/// What the turbine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurbineKind {
    /// Gas generator: sized at the design point to repay the shaft debit
    /// and closing the shaft power balance with its own residual.
    Gg,
    /// Power turbine: speed prescribed, expansion sized so the downstream
    /// design pressure ratios reach ambient; shaft power is the output.
    Pt,
}

/// Result of one expansion evaluation including cooling-flow effects.
struct ExpansionOutcome {
    gas_out: GasState,
    /// Net shaft power: main expansion plus cooling re-expansion minus
    /// pumping work.
    pw: f64,
    /// Effective cooling mass flow counted by the map continuity.
    w_cl_eff: f64,
    /// Injected cooling states to publish, (station, state).
    cooling_states: Vec<(Station, GasState)>,
}

pub struct Turbine {
    name: String,
    flow: GaspathFlow,
    shaft_nr: ShaftNr,
    n_des: f64,
    eta_des: f64,
    eta_mech_des: f64,
    kind: TurbineKind,
    map_path: PathBuf,
    nc_map_des: f64,
    beta_map_des: f64,
    map: Option<TurboMap>,
    cooling: Vec<CoolingFlow>,

    istate_beta: Option<usize>,
    ierror_wc: Option<usize>,
    ierror_shaftpw: Option<usize>,

    pr_des: f64,
    pw_des: f64,
    nc_des: f64,
    n: f64,
    nc: f64,
    eta: f64,
    pw: f64,
    gas_in: Option<GasState>,
}

impl Turbine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        map_path: impl Into<PathBuf>,
        station_in: Station,
        station_out: Station,
        shaft_nr: ShaftNr,
        n_des: f64,
        eta_des: f64,
        nc_map_des: f64,
        beta_map_des: f64,
        eta_mech_des: f64,
        kind: TurbineKind,
        cooling: Vec<CoolingFlow>,
    ) -> ComponentResult<Self> {
        let name = name.into();
        if !(0.0..=1.0).contains(&eta_des) || eta_des == 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design efficiency must be in (0, 1]"),
            });
        }
        if !(0.0..=1.0).contains(&eta_mech_des) || eta_mech_des == 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: mechanical efficiency must be in (0, 1]"),
            });
        }
        if n_des <= 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design speed must be positive"),
            });
        }
        Ok(Self {
            name,
            flow: GaspathFlow::new(station_in, station_out, 1.0),
            shaft_nr,
            n_des,
            eta_des,
            eta_mech_des,
            kind,
            map_path: map_path.into(),
            nc_map_des,
            beta_map_des,
            map: None,
            cooling,
            istate_beta: None,
            ierror_wc: None,
            ierror_shaftpw: None,
            pr_des: 0.0,
            pw_des: 0.0,
            nc_des: 0.0,
            n: n_des,
            nc: 0.0,
            eta: eta_des,
            pw: 0.0,
            gas_in: None,
        })
    }

    /// Expand over `pr` with efficiency `eta`, applying the cooling-flow
    /// pumping, re-expansion and mix-back.
    fn expand_with_cooling(
        &mut self,
        ctx: &SimContext,
        gas_in: &GasState,
        pr: f64,
        eta: f64,
    ) -> ComponentResult<ExpansionOutcome> {
        let (mut gas_out, pw_main) = turbine_expansion(gas_in, pr, eta, None, false)?;
        let mut pw = pw_main;
        let mut w_cl_eff = 0.0;
        let mut cooling_states = Vec::with_capacity(self.cooling.len());

        // Kinetic energy per unit mass at unit radius for the rotor speed.
        let ekin_at_r1 = (PI * self.n / 60.0).powi(2);

        for cf in &mut self.cooling {
            let mut injected = cf.extract(ctx)?;

            if cf.r_exit > 0.0 {
                // Work drawn from the shaft to swing the stream up to the
                // blade exit radius; half of it shows up as an isentropic
                // pressure rise in the rotating frame.
                let dh_pump = ekin_at_r1 * cf.r_exit * cf.r_exit;
                cf.pw_pump = dh_pump * cf.w;
                pw -= cf.pw_pump;

                let dh_for_p = dh_pump / 2.0;
                let tr_pump = (injected.t_k() + dh_for_p / injected.cp()) / injected.t_k();
                let gamma = injected.gamma();
                let pr_pump = tr_pump.powf(gamma / (gamma - 1.0));
                let p_new = injected.p_pa() * pr_pump;
                let h_new = injected.h() + dh_pump;
                injected.set_hp(h_new, gp_core::units::pa(p_new))?;
            } else {
                cf.pw_pump = 0.0;
            }
            cf.t_injected = injected.t_k();
            cf.p_injected = injected.p_pa();

            // Partial re-expansion of the stream through the blade rows.
            let dp_exp = (injected.p_pa() - gas_out.p_pa()) * cf.dp_fraction;
            let cf_out = if dp_exp > 0.0 {
                let pr_exp = (gas_out.p_pa() + dp_exp) / gas_out.p_pa();
                let (cf_out, pw_exp) =
                    turbine_expansion(&injected, pr_exp, eta, Some(cf.w), false)?;
                cf.pw_exp = pw_exp;
                pw += pw_exp;
                cf_out
            } else {
                cf.pw_exp = 0.0;
                injected.clone()
            };

            w_cl_eff += cf.w_tur_eff_fraction * cf.w;

            // Mix back into the main stream, holding the main exit
            // pressure.
            let p_out = gas_out.pressure();
            let mut cf_stream = cf_out;
            cf_stream.set_mass_flow_kgps(cf.w);
            gas_out.mix_in(&cf_stream, p_out)?;
            cooling_states.push((cf.station_out, cf_stream));
        }

        Ok(ExpansionOutcome {
            gas_out,
            pw,
            w_cl_eff,
            cooling_states,
        })
    }
}

impl Component for Turbine {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        let gas_in = self.flow.begin(ctx, mode)?;
        ctx.shaft_mut(self.shaft_nr, &self.name);

        match mode {
            Mode::Dp => {
                self.nc_des = self.n_des / rotor_speed_correction(gas_in.t_k());
                self.n = self.n_des;
                self.nc = self.nc_des;
                self.eta = self.eta_des;

                let outcome = match self.kind {
                    TurbineKind::Gg => {
                        // Repay everything the compressors charged to the
                        // shaft, plus the mechanical losses.
                        let pw_req =
                            -ctx.shaft_mut(self.shaft_nr, &self.name).pw_sum / self.eta_mech_des;
                        if pw_req <= 0.0 {
                            return Err(ComponentError::Config {
                                what: format!(
                                    "{}: gas-generator turbine has no shaft debit to repay",
                                    self.name
                                ),
                            });
                        }
                        let opts = ScalarSolveOptions {
                            f_tol: 1e-9,
                            x_tol: 1e-12,
                            first_step: 1e-3,
                            max_iterations: 80,
                        };
                        let eta = self.eta_des;
                        let pr_des = {
                            // Inner power-matching solve on the pressure
                            // ratio; cooling effects included every probe.
                            let solve = solve_scalar(
                                |pr| {
                                    if pr <= 1.0 {
                                        return Ok(-1.0);
                                    }
                                    let outcome =
                                        self.expand_with_cooling(ctx, &gas_in, pr, eta)?;
                                    Ok::<f64, ComponentError>((outcome.pw - pw_req) / pw_req)
                                },
                                1.9,
                                &opts,
                            );
                            solve.map_err(|e| match e {
                                ScalarSolveError::Residual(inner) => inner,
                                ScalarSolveError::NoConvergence { last_x, .. } => {
                                    ComponentError::InnerRoot {
                                        what: format!(
                                            "{}: design pressure ratio (last PR {last_x})",
                                            self.name
                                        ),
                                    }
                                }
                            })?
                        };
                        tracing::debug!(
                            turbine = %self.name,
                            pr_des,
                            pw_mw = pw_req / 1e6,
                            "design expansion sized to the shaft debit"
                        );
                        self.pr_des = pr_des;
                        let outcome = self.expand_with_cooling(ctx, &gas_in, pr_des, eta)?;
                        self.pw = pw_req;
                        // The balance is closed by construction.
                        ctx.shaft_mut(self.shaft_nr, &self.name).pw_sum = 0.0;
                        outcome
                    }
                    TurbineKind::Pt => {
                        // Expand so the remaining design pressure ratios
                        // land on ambient static pressure.
                        let pr_until_ambient = ctx
                            .pr_des_to_ambient
                            .get(&self.flow.station_out)
                            .copied()
                            .unwrap_or(1.0);
                        let p_out = ctx.ambient.psa * pr_until_ambient;
                        self.pr_des = gas_in.p_pa() / p_out;
                        if self.pr_des <= 1.0 {
                            return Err(ComponentError::Config {
                                what: format!(
                                    "{}: no pressure head left for the power turbine",
                                    self.name
                                ),
                            });
                        }
                        let outcome =
                            self.expand_with_cooling(ctx, &gas_in, self.pr_des, self.eta_des)?;
                        self.pw = outcome.pw;
                        ctx.shaft_mut(self.shaft_nr, &self.name).pw_sum +=
                            outcome.pw * self.eta_mech_des;
                        outcome
                    }
                };
                self.flow.pr = Some(self.pr_des);
                self.pw_des = self.pw;

                // Corrected design flow includes the effective cooling
                // share before the map is pinned to it.
                let corr = flow_correction(gas_in.t_k(), gas_in.p_pa());
                self.flow.wc_des = (self.flow.w_des + outcome.w_cl_eff) * corr;

                let mut map =
                    TurboMap::load_turbine(&self.map_path, self.nc_map_des, self.beta_map_des)?;
                map.set_scaling(self.nc_des, self.flow.wc_des, self.pr_des, self.eta_des)?;
                self.map = Some(map);

                self.istate_beta = Some(ctx.push_state());
                self.ierror_wc = Some(ctx.push_error());
                if self.kind == TurbineKind::Gg {
                    self.ierror_shaftpw = Some(ctx.push_error());
                }

                for (station, gas) in &outcome.cooling_states {
                    ctx.set_station(*station, gas.clone());
                }
                ctx.set_station(self.flow.station_out, outcome.gas_out);
            }
            Mode::Od => {
                if self.kind == TurbineKind::Gg {
                    let istate = ctx.shaft(self.shaft_nr).and_then(|s| s.istate);
                    self.n = ctx.state(istate, "turbine shaft speed")? * self.n_des;
                }
                self.nc = self.n / rotor_speed_correction(gas_in.t_k());

                let (point_wc, point_pr, point_eta) = {
                    let map = self.map.as_ref().ok_or(ComponentError::SlotNotRegistered {
                        what: "turbine map before design pass",
                    })?;
                    let beta_state = ctx.state(self.istate_beta, "turbine beta")?;
                    let mods = ctx.map_modifiers(&self.name);
                    let point = map.scaled_performance(self.nc, beta_state, &mods);
                    (point.wc, point.pr, point.eta)
                };
                self.eta = point_eta;
                self.flow.pr = Some(point_pr);

                let outcome = self.expand_with_cooling(ctx, &gas_in, point_pr, point_eta)?;
                self.pw = outcome.pw;

                let corr = flow_correction(gas_in.t_k(), gas_in.p_pa());
                let w_map = point_wc / corr;
                ctx.set_error(
                    self.ierror_wc,
                    "turbine mass flow",
                    (w_map - gas_in.mdot_kgps() - outcome.w_cl_eff) / self.flow.w_des,
                )?;

                let shaft = ctx.shaft_mut(self.shaft_nr, &self.name);
                shaft.pw_sum += outcome.pw * self.eta_mech_des;
                let pw_sum = shaft.pw_sum;
                if self.kind == TurbineKind::Gg {
                    ctx.set_error(
                        self.ierror_shaftpw,
                        "shaft power balance",
                        pw_sum / self.pw_des,
                    )?;
                }

                for (station, gas) in &outcome.cooling_states {
                    ctx.set_station(*station, gas.clone());
                }
                ctx.set_station(self.flow.station_out, outcome.gas_out);
            }
        }
        self.gas_in = Some(gas_in);
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        if let Some(gas_in) = &self.gas_in {
            self.flow.write_outputs(&self.name, gas_in, out);
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
            Some(self.eta),
            self.pw,
        );
        for cf in &self.cooling {
            cf.write_outputs(out);
        }
    }

    fn gaspath_link(&self) -> Option<GaspathLink> {
        Some(GaspathLink {
            station_in: self.flow.station_in,
            station_out: self.flow.station_out,
            // The design PR is computed, not declared; downstream chains
            // only ever walk components behind the turbine.
            pr_des: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gp_core::units::constants::P_STD_PA;
    use gp_core::units::{k, kgps, pa};
    use std::io::Write;

    const TURBINE_MAP: &str = "\
Synthetic turbine map.
99 2 TEST TURBINE
REYNOLDS RNI=1.0 f_RNI=1.0 RNI=1.0 f_RNI=1.0
 MIN PRESSURE RATIO
 2.005 0.60 0.80 1.00 1.20
 1.0   1.20  1.30  1.40  1.50
 MAX PRESSURE RATIO
 2.005 0.60 0.80 1.00 1.20
 1.0   3.60  4.20  4.80  5.40
 MASS FLOW
 5.005 0.20 0.40 0.60 0.80
 0.60  17.0  17.8  18.6  19.4
 0.80  18.2  19.0  19.8  20.6
 1.00  19.4  20.2  21.0  21.8
 1.20  20.6  21.4  22.2  23.0
 EFFICIENCY
 5.005 0.20 0.40 0.60 0.80
 0.60  0.84  0.86  0.87  0.86
 0.80  0.85  0.87  0.88  0.87
 1.00  0.86  0.88  0.89  0.88
 1.20  0.85  0.87  0.88  0.87
";

    fn map_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TURBINE_MAP.as_bytes()).unwrap();
        file
    }

    fn hot_inlet(ctx: &mut SimContext, w: f64) {
        ctx.set_station(
            4,
            GasState::air(k(1250.0), pa(6.9 * P_STD_PA), kgps(w)).unwrap(),
        );
    }

    #[test]
    fn gas_generator_repays_the_shaft_debit() {
        let map = map_file();
        let mut ctx = SimContext::new();
        hot_inlet(&mut ctx, 20.3);
        // Pretend a compressor charged the shaft 6 MW.
        ctx.shaft_mut(1, "compressor1").pw_sum = -6.0e6;

        let mut turbine = Turbine::new(
            "turbine1",
            map.path(),
            4,
            5,
            1,
            16_540.0,
            0.88,
            0.60,
            0.50,
            0.99,
            TurbineKind::Gg,
            vec![],
        )
        .unwrap();
        turbine.run(&mut ctx, Mode::Dp, 0).unwrap();

        // Shaft closed, PR sized to deliver 6 MW / 0.99.
        assert_eq!(ctx.shaft(1).unwrap().pw_sum, 0.0);
        assert_relative_eq!(turbine.pw, 6.0e6 / 0.99, max_relative = 1e-6);
        assert!(turbine.pr_des > 1.5 && turbine.pr_des < 4.0, "PR = {}", turbine.pr_des);
        // Beta state, mass-flow error, shaft power error.
        assert_eq!(ctx.states.len(), 1);
        assert_eq!(ctx.errors.len(), 2);
        let out = ctx.station(5).unwrap();
        assert!(out.t_k() < 1250.0);
        assert_relative_eq!(
            out.p_pa(),
            6.9 * P_STD_PA / turbine.pr_des,
            max_relative = 1e-9
        );
    }

    #[test]
    fn power_turbine_expands_to_the_ambient_chain() {
        let map = map_file();
        let mut ctx = SimContext::new();
        hot_inlet(&mut ctx, 20.3);
        // Downstream duct+diffuser design PRs multiply to 0.9.
        ctx.pr_des_to_ambient.insert(5, 0.9);

        let mut turbine = Turbine::new(
            "PT",
            map.path(),
            4,
            5,
            2,
            3_000.0,
            0.91,
            0.60,
            0.50,
            0.99,
            TurbineKind::Pt,
            vec![],
        )
        .unwrap();
        turbine.run(&mut ctx, Mode::Dp, 0).unwrap();

        let p_out_expected = ctx.ambient.psa * 0.9;
        assert_relative_eq!(
            ctx.station(5).unwrap().p_pa(),
            p_out_expected,
            max_relative = 1e-9
        );
        // The PT shaft carries the useful output.
        assert!(ctx.shaft(2).unwrap().pw_sum > 1.0e6);
        // No shaft-power residual for a prescribed-speed spool.
        assert_eq!(ctx.errors.len(), 1);
    }

    #[test]
    fn off_design_at_design_states_closes_the_residuals() {
        let map = map_file();
        let mut ctx = SimContext::new();
        hot_inlet(&mut ctx, 20.3);
        ctx.shaft_mut(1, "compressor1").pw_sum = -6.0e6;
        // Rotor speed state owned by the compressor side.
        let istate = ctx.push_state();
        ctx.shaft_mut(1, "compressor1").istate = Some(istate);

        let mut turbine = Turbine::new(
            "turbine1",
            map.path(),
            4,
            5,
            1,
            16_540.0,
            0.88,
            0.60,
            0.50,
            0.99,
            TurbineKind::Gg,
            vec![],
        )
        .unwrap();
        turbine.run(&mut ctx, Mode::Dp, 0).unwrap();

        // Re-charge the shaft like the compressor would and evaluate OD at
        // all-ones states.
        ctx.shaft_mut(1, "c").pw_sum = -6.0e6;
        turbine.run(&mut ctx, Mode::Od, 1).unwrap();
        // The map reproduces the design point, so both residuals vanish.
        assert!(ctx.errors[0].abs() < 1e-6, "wc residual {}", ctx.errors[0]);
        assert!(ctx.errors[1].abs() < 1e-6, "pw residual {}", ctx.errors[1]);
    }

    #[test]
    fn cooling_flow_raises_exit_mass_and_charges_pumping_work() {
        let map = map_file();

        let mut ctx = SimContext::new();
        hot_inlet(&mut ctx, 20.3);
        // Bleed air available at station 30.
        ctx.set_station(
            30,
            GasState::air(k(550.0), pa(4.0 * P_STD_PA), kgps(1.0)).unwrap(),
        );
        ctx.shaft_mut(1, "compressor1").pw_sum = -6.0e6;

        let cooling = CoolingFlow::new("ngv_cooling", 30, 41, 0.8, 0.5, 0.6, 0.25);
        let mut turbine = Turbine::new(
            "turbine1",
            map.path(),
            4,
            5,
            1,
            16_540.0,
            0.88,
            0.60,
            0.50,
            0.99,
            TurbineKind::Gg,
            vec![cooling],
        )
        .unwrap();
        turbine.run(&mut ctx, Mode::Dp, 0).unwrap();

        let out = ctx.station(5).unwrap();
        // Main flow plus the 0.8 kg/s cooling stream.
        assert_relative_eq!(out.mdot_kgps(), 20.3 + 0.8, max_relative = 1e-9);
        // Cooler than the uncooled expansion would leave it.
        assert!(out.t_k() < 1100.0);
        let cf = &turbine.cooling[0];
        assert!(cf.pw_pump > 0.0);
        assert!(cf.p_injected > 4.0 * P_STD_PA);
        // Injected stream published for inspection.
        assert!(ctx.station(41).is_ok());
    }
}
