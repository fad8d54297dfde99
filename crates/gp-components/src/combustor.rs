//! Combustor with two fuel models and two input modes.

use crate::component::{Component, GaspathLink};
use crate::context::{Mode, SimContext};
use crate::control::ControlLink;
use crate::error::{ComponentError, ComponentResult};
use crate::gaspath::GaspathFlow;
use gp_core::ids::Station;
use gp_core::numeric::{ScalarSolveError, ScalarSolveOptions, solve_scalar};
use gp_core::units::constants::{P_REF_PA, T_REF_K};
use gp_core::units::{k, kgps, pa};
use gp_results::OutputRow;
use gp_thermo::composition::{AIR_AR_MASS, AIR_CO2_MASS, AIR_N2_MASS, AIR_O2_MASS};
use gp_thermo::{Composition, Element, GasState, Species, stagnation_pressure};

/// How the fuel is specified.
#[derive(Debug, Clone)]
pub enum FuelSpec {
    /// Virtual CHyOz fuel given by heating value and atom ratios; products
    /// are synthesized assuming complete combustion with excess air and
    /// the energy balance is closed against the LHV.
    LhvRatio {
        /// Lower heating value (kJ/kg).
        lhv: f64,
        /// H/C mole ratio of the virtual molecule.
        hc_ratio: f64,
        /// O/C mole ratio of the virtual molecule.
        oc_ratio: f64,
    },
    /// Real fuel stream mixed in by composition; reaction enthalpy comes
    /// from the species formation enthalpies via equilibration.
    Composition {
        composition: Composition,
        /// Fuel injection temperature (K); inlet air temperature if None.
        t_fuel: Option<f64>,
    },
}

/// Burner: adds fuel, equilibrates the products and applies the pressure
/// losses.
///
/// Input modes: fuel flow taken from the linked control (clamped
/// non-negative), or — when a design exit temperature is declared and the
/// control is open-loop — the exit temperature is commanded and the fuel
/// flow is found by an inner root solve.
pub struct Combustor {
    name: String,
    flow: GaspathFlow,
    wf_des: f64,
    texit_des: Option<f64>,
    pr_des: f64,
    eta_des: f64,
    fuel: FuelSpec,
    /// Reference cross-section (m2) enabling the Rayleigh fundamental
    /// pressure loss; None disables it.
    area: Option<f64>,
    control: Option<ControlLink>,

    wf: f64,
    texit: Option<f64>,
    gas_in: Option<GasState>,
}

impl Combustor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        station_in: Station,
        station_out: Station,
        wf_des: f64,
        texit_des: Option<f64>,
        pr_des: f64,
        eta_des: f64,
        fuel: FuelSpec,
        area: Option<f64>,
        control: Option<ControlLink>,
    ) -> ComponentResult<Self> {
        let name = name.into();
        if wf_des < 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design fuel flow must be non-negative"),
            });
        }
        if !(0.0..=1.0).contains(&pr_des) || pr_des == 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: design pressure ratio must be in (0, 1]"),
            });
        }
        if !(0.0..=1.0).contains(&eta_des) || eta_des == 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: combustion efficiency must be in (0, 1]"),
            });
        }
        if let FuelSpec::LhvRatio { lhv, hc_ratio, .. } = &fuel {
            if *lhv <= 0.0 || *hc_ratio < 0.0 {
                return Err(ComponentError::Config {
                    what: format!("{name}: LHV fuel specification out of range"),
                });
            }
        }
        Ok(Self {
            name,
            flow: GaspathFlow::new(station_in, station_out, pr_des),
            wf_des,
            texit_des,
            pr_des,
            eta_des,
            fuel,
            area,
            control,
            wf: wf_des,
            texit: None,
            gas_in: None,
        })
    }

    /// Burn `wf` into `gas_in` and return the exit state at the inlet
    /// total pressure (losses applied afterwards).
    fn burn(&self, gas_in: &GasState, wf: f64) -> ComponentResult<GasState> {
        let w_air = gas_in.mdot_kgps();
        let p_in = pa(gas_in.p_pa());

        let mut gas_out = match &self.fuel {
            FuelSpec::LhvRatio {
                lhv,
                hc_ratio,
                oc_ratio,
            } => {
                // Complete combustion of the virtual CHyOz molecule.
                let mole_mass = Element::C.atomic_mass()
                    + Element::H.atomic_mass() * hc_ratio
                    + Element::O.atomic_mass() * oc_ratio;
                let n_fuel = wf / mole_mass;
                let o2_mass = w_air * AIR_O2_MASS
                    + n_fuel * (oc_ratio / 2.0 - 1.0 - hc_ratio / 4.0) * Species::O2.molar_mass();
                if o2_mass < 0.0 {
                    return Err(ComponentError::Config {
                        what: format!("{}: fuel flow beyond stoichiometric air", self.name),
                    });
                }
                let co2_mass = n_fuel * Species::CO2.molar_mass() + w_air * AIR_CO2_MASS;
                let h2o_mass = n_fuel * (hc_ratio / 2.0) * Species::H2O.molar_mass();
                let product_comp = Composition::from_mass_fractions(&[
                    (Species::O2, o2_mass),
                    (Species::CO2, co2_mass),
                    (Species::H2O, h2o_mass),
                    (Species::Ar, w_air * AIR_AR_MASS),
                    (Species::N2, w_air * AIR_N2_MASS),
                ])?;

                // Product and air enthalpies at the chemical reference
                // state anchor the LHV energy balance.
                let mut out = GasState::from_tpy(
                    k(T_REF_K),
                    pa(P_REF_PA),
                    product_comp,
                    kgps(w_air + wf),
                )?;
                let h_prod_ref = out.h();
                let h_air_ref = GasState::air(k(T_REF_K), pa(P_REF_PA), kgps(1.0))?.h();

                let h_final = (wf * lhv * 1000.0 * self.eta_des
                    + w_air * (gas_in.h() - h_air_ref))
                    / (w_air + wf)
                    + h_prod_ref;
                out.set_hp(h_final, p_in)?;
                out.equilibrate_hp()?;
                out
            }
            FuelSpec::Composition {
                composition,
                t_fuel,
            } => {
                let t_fuel = (*t_fuel).unwrap_or(gas_in.t_k());
                // Fuel injected at the inlet total pressure; the declared
                // loss comes off afterwards.
                let fuel = GasState::from_tpy(k(t_fuel), p_in, *composition, kgps(wf))?;
                let mut out = gas_in.clone();
                out.mix_in(&fuel, p_in)?;

                if self.eta_des < 1.0 {
                    // Infer the full reaction enthalpy at the mixed
                    // temperature, then retarget enthalpy for the heat loss.
                    let h_mixed = out.h();
                    let t_mixed = out.t_k();
                    let frozen = *out.composition();
                    out.equilibrate_tp()?;
                    let dh_rxn = out.h() - h_mixed;
                    let h_target = h_mixed + (1.0 - self.eta_des) * dh_rxn;
                    out.set_tpy(k(t_mixed), p_in, frozen)?;
                    out.set_hp(h_target, p_in)?;
                } else {
                    out.set_hp(out.h(), p_in)?;
                }
                out.equilibrate_hp()?;
                out
            }
        };

        // Pressure drop: fundamental (Rayleigh) loss when a reference
        // cross-section is declared, times the declared loss.
        let pr_fund = match self.area {
            Some(area) if area > 0.0 => self.rayleigh_loss(gas_in, &gas_out, area)?,
            _ => 1.0,
        };
        let p_out = gas_in.p_pa() * pr_fund * self.pr_des;
        gas_out.set_hp(gas_out.h(), pa(p_out))?;
        Ok(gas_out)
    }

    /// Fundamental total-pressure ratio across frictionless heating at
    /// constant area. Velocities come from continuity at the shared
    /// cross-section; the full exit flow is accelerated, fuel included.
    fn rayleigh_loss(
        &self,
        gas_in: &GasState,
        gas_out: &GasState,
        area: f64,
    ) -> ComponentResult<f64> {
        let w_out = gas_out.mdot_kgps();
        let v_in = w_out / (gas_in.rho() * area);
        let v_out = w_out / (gas_out.rho() * area);
        let p0_in = stagnation_pressure(gas_in, v_in)?;
        let p0_out = stagnation_pressure(gas_out, v_out)?;
        Ok(p0_in / p0_out)
    }
}

impl Component for Combustor {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        let gas_in = self.flow.begin(ctx, mode)?;
        self.flow.pr = Some(self.pr_des);

        match mode {
            Mode::Dp => {
                if self.texit_des.is_some() {
                    // Design fuel flow is the first guess for the exit
                    // temperature iteration.
                    self.texit = self.texit_des;
                    self.wf = self.wf_des;
                } else {
                    self.wf = self.wf_des;
                }
            }
            Mode::Od => {
                if let Some(wf) = ctx.override_value(&self.name, "Wf") {
                    // Adaptive-model runs command the fuel flow directly.
                    self.wf = wf.max(0.0);
                    self.texit = None;
                } else if let Some(control) = &self.control {
                    let value = ctx.control_value(&control.name)?;
                    if !control.closed_loop && self.texit.is_some() {
                        self.texit = Some(value);
                    } else {
                        self.wf = value.max(0.0);
                    }
                }
            }
        }

        // Exit-temperature mode applies unless a closed-loop control is
        // iterating the fuel flow through its own state.
        let texit_target = if self.control.as_ref().is_none_or(|c| !c.closed_loop) {
            self.texit
        } else {
            None
        };

        if let Some(target) = texit_target {
            let wf0 = self.wf.max(1e-4);
            let opts = ScalarSolveOptions {
                f_tol: 1e-3, // K
                x_tol: 1e-10,
                first_step: 1e-2,
                max_iterations: 60,
            };
            let wf = solve_scalar(
                |wf| {
                    let wf = wf.max(0.0);
                    let out = self.burn(&gas_in, wf)?;
                    Ok::<f64, ComponentError>(out.t_k() - target)
                },
                wf0,
                &opts,
            )
            .map_err(|e| match e {
                ScalarSolveError::Residual(inner) => inner,
                ScalarSolveError::NoConvergence { last_x, .. } => ComponentError::InnerRoot {
                    what: format!(
                        "{}: fuel flow for exit temperature {target} K (last Wf {last_x})",
                        self.name
                    ),
                },
            })?;
            self.wf = wf.max(0.0);
            tracing::debug!(
                combustor = %self.name,
                wf = self.wf,
                texit = target,
                "fuel flow matched to exit temperature"
            );
        }

        let gas_out = self.burn(&gas_in, self.wf)?;
        ctx.set_station(self.flow.station_out, gas_out);
        ctx.totals.wf += self.wf;
        self.gas_in = Some(gas_in);
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        if let Some(gas_in) = &self.gas_in {
            self.flow.write_outputs(&self.name, gas_in, out);
        }
        out.set(&format!("Wf_{}", self.name), self.wf);
    }

    fn gaspath_link(&self) -> Option<GaspathLink> {
        Some(GaspathLink {
            station_in: self.flow.station_in,
            station_out: self.flow.station_out,
            pr_des: self.pr_des,
        })
    }
}
