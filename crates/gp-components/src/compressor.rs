//! Compressor with map matching and optional interstage bleeds.

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

/// How the spool speed behaves off-design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedMode {
    /// Gas generator: the rotor speed is a free state closed by the shaft
    /// power balance of the driving turbine.
    Gg,
    /// Constant speed (synchronous drive): the speed stays at design and
    /// no speed state is registered.
    Cs,
}

/// An interstage bleed extraction: a fraction of the inlet flow compressed
/// only to a fraction of the stage pressure rise, published at its own
/// station for cooling-flow consumers.
#[derive(Debug, Clone)]
pub struct BleedSpec {
    pub name: String,
    pub station_out: Station,
    /// Fraction of the compressor inlet flow taken.
    pub fraction: f64,
    /// Fraction of the compressor pressure rise at the offtake.
    pub dp_fraction: f64,
}

/// Single-spool compressor matched on a scaled map.
///
/// Registers a rotor-speed state (unless constant-speed), one map beta
/// state and one mass-flow residual tying the map flow to the inlet flow.
pub struct Compressor {
    name: String,
    flow: GaspathFlow,
    shaft_nr: ShaftNr,
    n_des: f64,
    eta_des: f64,
    pr_des: f64,
    speed_mode: SpeedMode,
    map_path: PathBuf,
    nc_map_des: f64,
    beta_map_des: f64,
    map: Option<TurboMap>,
    bleeds: Vec<BleedSpec>,

    istate_n: Option<usize>,
    istate_beta: Option<usize>,
    ierror_wc: Option<usize>,

    nc_des: f64,
    n: f64,
    nc: f64,
    eta: f64,
    pw: f64,
    gas_in: Option<GasState>,
}

impl Compressor {
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
        pr_des: f64,
        speed_mode: SpeedMode,
        bleeds: Vec<BleedSpec>,
    ) -> ComponentResult<Self> {
        let name = name.into();
        if !(0.0..=1.0).contains(&eta_des) || eta_des == 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design efficiency must be in (0, 1]"),
            });
        }
        if pr_des <= 1.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design pressure ratio must exceed 1"),
            });
        }
        if n_des <= 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design speed must be positive"),
            });
        }
        for bleed in &bleeds {
            if !(0.0..1.0).contains(&bleed.fraction) || !(0.0..=1.0).contains(&bleed.dp_fraction) {
                return Err(ComponentError::Config {
                    what: format!("{name}: bleed '{}' fractions out of range", bleed.name),
                });
            }
        }
        Ok(Self {
            name,
            flow: GaspathFlow::new(station_in, station_out, pr_des),
            shaft_nr,
            n_des,
            eta_des,
            pr_des,
            speed_mode,
            map_path: map_path.into(),
            nc_map_des,
            beta_map_des,
            map: None,
            bleeds,
            istate_n: None,
            istate_beta: None,
            ierror_wc: None,
            nc_des: 0.0,
            n: n_des,
            nc: 0.0,
            eta: eta_des,
            pw: 0.0,
            gas_in: None,
        })
    }

    /// Compress the main stream and the bleed offtakes; returns the main
    /// outlet state (full inlet flow, mass fixed up by the caller), the
    /// net shaft power and the bleed states to publish.
    fn compress_with_bleeds(
        &self,
        gas_in: &GasState,
        pr: f64,
        eta: f64,
    ) -> ComponentResult<(GasState, f64, Vec<(Station, GasState)>)> {
        let w_in = gas_in.mdot_kgps();
        let (out_full, pw_full) = compression(gas_in, w_in, pr, eta, false)?;
        let mut pw_net = pw_full;
        let mut bleed_states = Vec::with_capacity(self.bleeds.len());
        for bleed in &self.bleeds {
            let w_b = bleed.fraction * w_in;
            let pr_b = 1.0 + bleed.dp_fraction * (pr - 1.0);
            let (mut b_out, _) = compression(gas_in, w_b, pr_b, eta, false)?;
            b_out.set_mass_flow_kgps(w_b);
            // The bleed mass never sees the remaining pressure rise.
            pw_net -= w_b * (out_full.h() - b_out.h());
            bleed_states.push((bleed.station_out, b_out));
        }
        Ok((out_full, pw_net, bleed_states))
    }

    fn bleed_mass(&self, w_in: f64) -> f64 {
        self.bleeds.iter().map(|b| b.fraction * w_in).sum()
    }
}

impl Component for Compressor {
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
                self.flow.pr = Some(self.pr_des);

                let (mut gas_out, pw, bleed_states) =
                    self.compress_with_bleeds(&gas_in, self.pr_des, self.eta_des)?;
                gas_out.set_mass_flow_kgps(gas_in.mdot_kgps() - self.bleed_mass(gas_in.mdot_kgps()));
                self.pw = pw;
                ctx.shaft_mut(self.shaft_nr, &self.name).pw_sum -= pw;

                let mut map =
                    TurboMap::load_compressor(&self.map_path, self.nc_map_des, self.beta_map_des)?;
                map.set_scaling(self.nc_des, self.flow.wc_des, self.pr_des, self.eta_des)?;
                self.map = Some(map);

                if self.speed_mode != SpeedMode::Cs {
                    let istate = ctx.push_state();
                    self.istate_n = Some(istate);
                    ctx.shaft_mut(self.shaft_nr, &self.name).istate = Some(istate);
                }
                self.istate_beta = Some(ctx.push_state());
                self.ierror_wc = Some(ctx.push_error());

                for (station, gas) in bleed_states {
                    ctx.set_station(station, gas);
                }
                ctx.set_station(self.flow.station_out, gas_out);
            }
            Mode::Od => {
                self.n = match self.speed_mode {
                    SpeedMode::Cs => self.n_des,
                    SpeedMode::Gg => {
                        let istate = ctx
                            .shaft(self.shaft_nr)
                            .and_then(|s| s.istate);
                        ctx.state(istate, "compressor shaft speed")? * self.n_des
                    }
                };
                self.nc = self.n / rotor_speed_correction(gas_in.t_k());

                let map = self.map.as_ref().ok_or(ComponentError::SlotNotRegistered {
                    what: "compressor map before design pass",
                })?;
                let beta_state = ctx.state(self.istate_beta, "compressor beta")?;
                let mods = ctx.map_modifiers(&self.name);
                let point = map.scaled_performance(self.nc, beta_state, &mods);
                self.eta = point.eta;
                self.flow.pr = Some(point.pr);

                let (mut gas_out, pw, bleed_states) =
                    self.compress_with_bleeds(&gas_in, point.pr, point.eta)?;
                self.pw = pw;
                ctx.shaft_mut(self.shaft_nr, &self.name).pw_sum -= pw;

                // Map flow vs. actual inlet flow closes the operating point.
                let corr = flow_correction(gas_in.t_k(), gas_in.p_pa());
                let w_map = point.wc / corr;
                ctx.set_error(
                    self.ierror_wc,
                    "compressor mass flow",
                    (w_map - gas_in.mdot_kgps()) / self.flow.w_des,
                )?;

                // Downstream sees the map flow, less the bleed offtakes.
                gas_out.set_mass_flow_kgps(w_map - self.bleed_mass(gas_in.mdot_kgps()));
                for (station, gas) in bleed_states {
                    ctx.set_station(station, gas);
                }
                ctx.set_station(self.flow.station_out, gas_out);
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
    }

    fn gaspath_link(&self) -> Option<GaspathLink> {
        Some(GaspathLink {
            station_in: self.flow.station_in,
            station_out: self.flow.station_out,
            pr_des: self.pr_des,
        })
    }
}
