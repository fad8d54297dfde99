//! Gas-path process utilities shared by the component models.

use crate::error::{ThermoError, ThermoResult};
use crate::state::GasState;
use gp_core::numeric::{ScalarSolveError, ScalarSolveOptions, solve_scalar};
use gp_core::units::pa;

/// Initial guess for the critical pressure ratio of a choking throat.
const PR_CRIT_GUESS: f64 = 1.9;

/// Compress `gas_in` over pressure ratio `pr` (> 1) with isentropic
/// efficiency `eta`, or polytropic efficiency when `polytropic` is set.
///
/// `w_kgps` is the mass flow doing the work (a fan compresses only its own
/// split of the inlet flow). Returns the outlet state carrying `w_kgps`
/// and the shaft power absorbed (W, positive).
pub fn compression(
    gas_in: &GasState,
    w_kgps: f64,
    pr: f64,
    eta: f64,
    polytropic: bool,
) -> ThermoResult<(GasState, f64)> {
    if pr < 1.0 {
        return Err(ThermoError::InvalidArg {
            what: "compression requires PR >= 1",
        });
    }
    if eta <= 0.0 || eta > 1.0 {
        return Err(ThermoError::InvalidArg {
            what: "efficiency must be in (0, 1]",
        });
    }
    let p_out = pa(gas_in.p_pa() * pr);
    let mut out = gas_in.clone();
    out.set_mass_flow_kgps(w_kgps);
    if polytropic {
        // Entropy production of the polytropic path folded into s directly.
        let s_out = gas_in.s() + gas_in.r_specific() * pr.ln() * (1.0 / eta - 1.0);
        out.set_sp(s_out, p_out)?;
    } else {
        out.set_sp(gas_in.s(), p_out)?;
        let h_is = out.h();
        let h_out = gas_in.h() + (h_is - gas_in.h()) / eta;
        out.set_hp(h_out, p_out)?;
    }
    let pw = w_kgps * (out.h() - gas_in.h());
    Ok((out, pw))
}

/// Expand `gas_in` over pressure ratio `pr` (> 1, inlet over outlet) with
/// isentropic or polytropic efficiency.
///
/// `w_exp` is the expanding mass flow; `None` means the inlet flow.
/// Returns the outlet state (carrying the inlet mass flow) and the shaft
/// power extracted (W, positive).
pub fn turbine_expansion(
    gas_in: &GasState,
    pr: f64,
    eta: f64,
    w_exp: Option<f64>,
    polytropic: bool,
) -> ThermoResult<(GasState, f64)> {
    if pr <= 0.0 {
        return Err(ThermoError::InvalidArg {
            what: "expansion requires PR > 0",
        });
    }
    if eta <= 0.0 || eta > 1.0 {
        return Err(ThermoError::InvalidArg {
            what: "efficiency must be in (0, 1]",
        });
    }
    let p_out = pa(gas_in.p_pa() / pr);
    let mut out = gas_in.clone();
    if polytropic {
        let s_out = gas_in.s() - gas_in.r_specific() * pr.ln() * (1.0 / eta - 1.0);
        out.set_sp(s_out, p_out)?;
    } else {
        out.set_sp(gas_in.s(), p_out)?;
        let h_is = out.h();
        let h_out = gas_in.h() - (gas_in.h() - h_is) * eta;
        out.set_hp(h_out, p_out)?;
    }
    let w = w_exp.unwrap_or(gas_in.mdot_kgps());
    let pw = w * (gas_in.h() - out.h());
    Ok((out, pw))
}

/// Isentropic exit velocity for expansion over `pr`, with the exit static
/// state. A negative enthalpy drop (possible while the outer solver
/// explores) reports a negative velocity rather than a NaN.
pub fn exit_velocity(gas_in: &GasState, pr: f64) -> ThermoResult<(f64, GasState)> {
    let p_exit = pa(gas_in.p_pa() / pr);
    let mut exit = gas_in.clone();
    exit.set_sp(gas_in.s(), p_exit)?;
    let dh = gas_in.h() - exit.h();
    let v = signed_sqrt_2dh(dh);
    Ok((v, exit))
}

/// Result of expanding through a fixed throat area.
#[derive(Debug, Clone)]
pub struct AreaExpansion {
    /// Throat static pressure (Pa).
    pub p_throat: f64,
    /// Throat static temperature (K).
    pub t_throat: f64,
    /// Throat velocity (m/s); the sound speed on the choked branch.
    pub velocity: f64,
    /// Mass flow through the throat (kg/s).
    pub mass_flow: f64,
    /// Whether the throat runs sonic.
    pub choked: bool,
    /// Static state at the throat.
    pub throat: GasState,
}

/// Expand `gas_in` through a fixed throat area toward an overall pressure
/// ratio `pr`. In the subsonic branch the throat sits at the exit pressure
/// and continuity gives the flow directly; when the isentropic exit Mach
/// exceeds one, the throat pressure is solved so the velocity matches the
/// local sound speed.
pub fn expansion_to_area(gas_in: &GasState, pr: f64, area_m2: f64) -> ThermoResult<AreaExpansion> {
    if area_m2 <= 0.0 {
        return Err(ThermoError::InvalidArg {
            what: "throat area must be positive",
        });
    }
    let h_in = gas_in.h();
    let s_in = gas_in.s();
    let p_in = gas_in.p_pa();

    let mut throat = gas_in.clone();
    throat.set_sp(s_in, pa(p_in / pr))?;
    let v = signed_sqrt_2dh(h_in - throat.h());
    let mach = v / throat.sound_speed();

    if mach < 1.0 {
        let mass_flow = area_m2 * v * throat.rho();
        return Ok(AreaExpansion {
            p_throat: p_in / pr,
            t_throat: throat.t_k(),
            velocity: v,
            mass_flow,
            choked: false,
            throat,
        });
    }

    // Choked: find the throat static pressure where the isentropic velocity
    // equals the local sound speed.
    let mut probe = gas_in.clone();
    let residual = |ps: f64| -> ThermoResult<f64> {
        if ps <= 0.0 || !ps.is_finite() {
            return Err(ThermoError::NonPhysical {
                what: "throat pressure left the physical range",
            });
        }
        probe.set_sp(s_in, pa(ps))?;
        let v = signed_sqrt_2dh(h_in - probe.h());
        Ok(v - probe.sound_speed())
    };
    let opts = ScalarSolveOptions {
        f_tol: 1e-4,
        x_tol: 1e-12,
        first_step: 1e-3,
        max_iterations: 60,
    };
    let p_throat = solve_scalar(residual, p_in / PR_CRIT_GUESS, &opts).map_err(|e| match e {
        ScalarSolveError::Residual(inner) => inner,
        ScalarSolveError::NoConvergence { .. } => ThermoError::EosConvergence {
            what: "choked throat pressure",
            target: p_in / PR_CRIT_GUESS,
        },
    })?;

    throat.set_sp(s_in, pa(p_throat))?;
    let v_sonic = throat.sound_speed();
    let mass_flow = area_m2 * v_sonic * throat.rho();
    Ok(AreaExpansion {
        p_throat,
        t_throat: throat.t_k(),
        velocity: v_sonic,
        mass_flow,
        choked: true,
        throat,
    })
}

/// Stagnation pressure for a state moving at `velocity`: h0 = h + V^2/2 and
/// p0 such that s(T0, p0, Y) = s(T, P, Y), bisected in ln(p). Falls back to
/// the static pressure when no bracket can be found.
pub fn stagnation_pressure(gas: &GasState, velocity: f64) -> ThermoResult<f64> {
    let s_target = gas.s();
    let h0 = gas.h() + 0.5 * velocity * velocity;

    let mut probe = gas.clone();
    probe.set_hp(h0, gas.pressure())?;
    let t0 = probe.temperature();

    let mut s_at = |p: f64| -> ThermoResult<f64> {
        probe.set_tp(t0, pa(p))?;
        Ok(probe.s())
    };

    let p_ref = gas.p_pa();
    let mut p_lo = (0.02 * p_ref).max(1.0);
    let mut p_hi = 50.0 * p_ref;
    let mut s_lo = s_at(p_lo)?;
    let mut s_hi = s_at(p_hi)?;

    let mut tries = 0;
    while (s_lo - s_target) * (s_hi - s_target) > 0.0 && tries < 6 {
        p_lo *= 0.2;
        p_hi *= 5.0;
        s_lo = s_at(p_lo)?;
        s_hi = s_at(p_hi)?;
        tries += 1;
    }
    if (s_lo - s_target) * (s_hi - s_target) > 0.0 {
        // Could not bracket; conservative fallback.
        return Ok(gas.p_pa());
    }

    let mut ln_lo = p_lo.ln();
    let mut ln_hi = p_hi.ln();
    for _ in 0..60 {
        let ln_mid = 0.5 * (ln_lo + ln_hi);
        let s_mid = s_at(ln_mid.exp())?;
        if (s_lo - s_target) * (s_mid - s_target) <= 0.0 {
            ln_hi = ln_mid;
        } else {
            ln_lo = ln_mid;
            s_lo = s_mid;
        }
    }
    Ok((0.5 * (ln_lo + ln_hi)).exp())
}

fn signed_sqrt_2dh(dh: f64) -> f64 {
    if dh < 0.0 {
        -(2.0 * dh.abs()).sqrt()
    } else {
        (2.0 * dh).sqrt()
    }
}
