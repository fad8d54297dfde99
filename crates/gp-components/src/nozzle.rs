//! Propelling exhaust nozzle.

use crate::component::{Component, GaspathLink};
use crate::context::{Mode, SimContext};
use crate::error::{ComponentError, ComponentResult};
use crate::gaspath::GaspathFlow;
use gp_core::ids::Station;
use gp_core::numeric::{ScalarSolveError, ScalarSolveOptions, solve_scalar};
use gp_core::units::{k, pa};
use gp_results::OutputRow;
use gp_thermo::{GasState, exit_velocity, expansion_to_area};

/// Convergent propelling nozzle.
///
/// The design pass expands to ambient, detects choking, sizes the throat
/// area from continuity and registers the exit-flow residual; off-design
/// the throat area is fixed and the residual compares the incoming flow
/// with what the throat passes. Gross thrust accumulates into the system
/// totals.
pub struct ExhaustNozzle {
    name: String,
    flow: GaspathFlow,
    station_throat: Station,
    /// Thrust, velocity and discharge coefficients.
    cx: f64,
    cv: f64,
    cd: f64,

    ierror_w: Option<usize>,
    a_throat_des: f64,

    // per-evaluation diagnostics
    a_throat: f64,
    p_throat: f64,
    t_throat: f64,
    v_throat: f64,
    mach_throat: f64,
    fg: f64,
    gas_in: Option<GasState>,
    t_out: f64,
}

impl ExhaustNozzle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        station_in: Station,
        station_throat: Station,
        station_out: Station,
        cx: f64,
        cv: f64,
        cd: f64,
    ) -> ComponentResult<Self> {
        let name = name.into();
        for (label, value) in [("CX", cx), ("CV", cv), ("CD", cd)] {
            if !(0.0..=1.5).contains(&value) || value == 0.0 {
                return Err(ComponentError::Config {
                    what: format!("{name}: coefficient {label} out of range"),
                });
            }
        }
        Ok(Self {
            name,
            flow: GaspathFlow::new(station_in, station_out, 1.0),
            station_throat,
            cx,
            cv,
            cd,
            ierror_w: None,
            a_throat_des: 0.0,
            a_throat: 0.0,
            p_throat: 0.0,
            t_throat: 0.0,
            v_throat: 0.0,
            mach_throat: 0.0,
            fg: 0.0,
            gas_in: None,
            t_out: 0.0,
        })
    }

}

impl Component for ExhaustNozzle {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, _point: usize) -> ComponentResult<()> {
        let gas_in = self.flow.begin(ctx, mode)?;
        let p_amb = ctx.ambient.psa;
        let pr = gas_in.p_pa() / p_amb;
        self.flow.pr = Some(pr);

        let mut throat;
        match mode {
            Mode::Dp => {
                let (v_is, exit) = exit_velocity(&gas_in, pr)?;
                throat = exit;
                let mach = v_is / throat.sound_speed();
                let mut v_throat = v_is;
                if mach > 1.0 {
                    // Full expansion overshoots sonic: pull the throat back
                    // to Mach one.
                    let s_in = gas_in.s();
                    let h_in = gas_in.h();
                    let mut probe = gas_in.clone();
                    let residual = |ps: f64| -> ComponentResult<f64> {
                        if ps <= 0.0 || !ps.is_finite() {
                            return Err(ComponentError::InnerRoot {
                                what: format!("{}: throat pressure left range", self.name),
                            });
                        }
                        probe.set_sp(s_in, pa(ps))?;
                        let dh = h_in - probe.h();
                        let v = if dh < 0.0 {
                            -(2.0 * dh.abs()).sqrt()
                        } else {
                            (2.0 * dh).sqrt()
                        };
                        Ok(v / probe.sound_speed() - 1.0)
                    };
                    let opts = ScalarSolveOptions {
                        f_tol: 1e-8,
                        x_tol: 1e-12,
                        first_step: 1e-3,
                        max_iterations: 60,
                    };
                    let p_throat = solve_scalar(residual, gas_in.p_pa() / 1.9, &opts).map_err(
                        |e| match e {
                            ScalarSolveError::Residual(inner) => inner,
                            ScalarSolveError::NoConvergence { .. } => ComponentError::InnerRoot {
                                what: format!("{}: choked throat pressure", self.name),
                            },
                        },
                    )?;
                    throat.set_sp(s_in, pa(p_throat))?;
                    self.mach_throat = 1.0;
                    self.p_throat = p_throat;
                    v_throat = throat.sound_speed();
                } else {
                    self.mach_throat = mach;
                    self.p_throat = p_amb;
                }
                self.t_throat = throat.t_k();

                self.ierror_w = Some(ctx.push_error());

                // A vanishing design velocity would blow the area up; keep
                // a minimal flow speed instead.
                if v_throat <= 0.0 {
                    v_throat = 1e-3;
                }
                self.a_throat_des = gas_in.mdot_kgps() / throat.rho() / v_throat;
                self.a_throat = self.a_throat_des;
                // Velocity coefficient applies to thrust, not sizing.
                self.v_throat = v_throat * self.cv;
            }
            Mode::Od => {
                self.a_throat = self.a_throat_des;
                let result = expansion_to_area(&gas_in, pr, self.a_throat)?;
                self.p_throat = result.p_throat;
                self.t_throat = result.t_throat;
                self.v_throat = result.velocity * self.cv;
                self.mach_throat = result.velocity / result.throat.sound_speed();
                ctx.set_error(
                    self.ierror_w,
                    "nozzle continuity",
                    (gas_in.mdot_kgps() - result.mass_flow) / self.flow.w_des,
                )?;
                throat = result.throat;
            }
        }
        throat.set_mass_flow_kgps(gas_in.mdot_kgps());

        // Static exit at ambient pressure, no further expansion modelled.
        let mut gas_out = throat.clone();
        gas_out.set_tp(k(self.t_throat), pa(p_amb))?;
        self.t_out = gas_out.t_k();

        self.fg = self.cx
            * (gas_out.mdot_kgps() * self.v_throat + self.a_throat * (self.p_throat - p_amb));
        ctx.totals.fg += self.fg;

        ctx.set_station(self.station_throat, throat);
        ctx.set_station(self.flow.station_out, gas_out);
        self.gas_in = Some(gas_in);
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        if let Some(gas_in) = &self.gas_in {
            self.flow.write_outputs(&self.name, gas_in, out);
        }
        let th = self.station_throat;
        out.set(&format!("T{th}"), self.t_throat);
        out.set(&format!("P{th}"), self.p_throat);
        out.set(&format!("V{th}"), self.v_throat);
        out.set(&format!("Mach{th}"), self.mach_throat);
        out.set(&format!("T{}", self.flow.station_out), self.t_out);
        out.set(&format!("A{th}"), self.a_throat);
        out.set(&format!("A{th}_geom"), self.a_throat / self.cd);
        out.set(&format!("FG_{}", self.name), self.fg / 1000.0);
    }

    fn gaspath_link(&self) -> Option<GaspathLink> {
        Some(GaspathLink {
            station_in: self.flow.station_in,
            station_out: self.flow.station_out,
            pr_des: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gp_core::units::constants::P_STD_PA;
    use gp_core::units::kgps;

    fn nozzle() -> ExhaustNozzle {
        ExhaustNozzle::new("exhaust1", 7, 8, 9, 1.0, 1.0, 1.0).unwrap()
    }

    #[test]
    fn supercritical_design_point_chokes() {
        let mut ctx = SimContext::new();
        ctx.set_station(
            7,
            GasState::air(k(950.0), pa(3.2 * P_STD_PA), kgps(20.0)).unwrap(),
        );
        let mut noz = nozzle();
        noz.run(&mut ctx, Mode::Dp, 0).unwrap();

        assert_relative_eq!(noz.mach_throat, 1.0, epsilon = 1e-9);
        assert!(noz.p_throat > P_STD_PA, "throat above ambient when choked");
        assert!(noz.a_throat_des > 0.0);
        assert!(ctx.totals.fg > 0.0);
        assert_eq!(ctx.errors.len(), 1);
        assert!(ctx.station(8).is_ok() && ctx.station(9).is_ok());
    }

    #[test]
    fn subcritical_design_point_exits_at_ambient() {
        let mut ctx = SimContext::new();
        ctx.set_station(
            7,
            GasState::air(k(700.0), pa(1.3 * P_STD_PA), kgps(10.0)).unwrap(),
        );
        let mut noz = nozzle();
        noz.run(&mut ctx, Mode::Dp, 0).unwrap();

        assert!(noz.mach_throat < 1.0);
        assert_relative_eq!(noz.p_throat, P_STD_PA, max_relative = 1e-12);
    }

    #[test]
    fn off_design_with_matching_flow_closes_continuity() {
        let mut ctx = SimContext::new();
        ctx.set_station(
            7,
            GasState::air(k(950.0), pa(3.2 * P_STD_PA), kgps(20.0)).unwrap(),
        );
        let mut noz = nozzle();
        noz.run(&mut ctx, Mode::Dp, 0).unwrap();

        // Same inlet state off-design: the fixed throat passes exactly the
        // design flow.
        noz.run(&mut ctx, Mode::Od, 1).unwrap();
        assert!(ctx.errors[0].abs() < 1e-6, "residual {}", ctx.errors[0]);
        assert_relative_eq!(noz.mach_throat, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn off_design_excess_flow_shows_in_the_residual() {
        let mut ctx = SimContext::new();
        ctx.set_station(
            7,
            GasState::air(k(950.0), pa(3.2 * P_STD_PA), kgps(20.0)).unwrap(),
        );
        let mut noz = nozzle();
        noz.run(&mut ctx, Mode::Dp, 0).unwrap();

        ctx.station_mut(7).unwrap().set_mass_flow_kgps(21.0);
        noz.run(&mut ctx, Mode::Od, 1).unwrap();
        // One extra kg/s over 20 design: residual ~ +0.05.
        assert_relative_eq!(ctx.errors[0], 0.05, epsilon = 1e-3);
    }

    #[test]
    fn velocity_coefficient_scales_thrust_not_area() {
        let mut ctx_ideal = SimContext::new();
        ctx_ideal.set_station(
            7,
            GasState::air(k(950.0), pa(3.2 * P_STD_PA), kgps(20.0)).unwrap(),
        );
        let mut ideal = nozzle();
        ideal.run(&mut ctx_ideal, Mode::Dp, 0).unwrap();

        let mut ctx_real = SimContext::new();
        ctx_real.set_station(
            7,
            GasState::air(k(950.0), pa(3.2 * P_STD_PA), kgps(20.0)).unwrap(),
        );
        let mut real = ExhaustNozzle::new("exhaust1", 7, 8, 9, 1.0, 0.98, 1.0).unwrap();
        real.run(&mut ctx_real, Mode::Dp, 0).unwrap();

        assert_relative_eq!(real.a_throat_des, ideal.a_throat_des, max_relative = 1e-12);
        assert!(ctx_real.totals.fg < ctx_ideal.totals.fg);
    }
}
