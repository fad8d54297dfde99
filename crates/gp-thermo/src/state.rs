//! Flowing gas-mixture state.

use crate::composition::Composition;
use crate::equilibrium;
use crate::error::{ThermoError, ThermoResult};
use crate::nasa7;
use gp_core::units::constants::R_UNIVERSAL;
use gp_core::units::{MassRate, Pressure, Temperature, k, kgps};

/// Derived properties cached against the defining (T,P,Y) triple.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedProps {
    /// Specific enthalpy (J/kg), including formation enthalpy.
    h: f64,
    /// Specific entropy (J/(kg*K)) at the mixture state.
    s: f64,
    /// Specific heat at constant pressure (J/(kg*K)).
    cp: f64,
    /// Mean molar mass (kg/kmol).
    mmw: f64,
}

/// A thermodynamic state of a gas mixture carrying mass flow.
///
/// The defining variables are (T, P, Y) plus the absolute mass flow; the
/// enthalpy, entropy and heat-capacity caches are refreshed on every
/// assignment so derived queries are consistent by construction.
///
/// Station states are created once at the design point and mutated in
/// place on every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct GasState {
    mdot: MassRate,
    p: Pressure,
    t: Temperature,
    comp: Composition,
    props: CachedProps,
}

/// Bounds for the inner temperature solves.
const T_MIN_K: f64 = 150.0;
const T_MAX_K: f64 = 4000.0;
const EOS_MAX_ITERS: usize = 80;
/// Convergence threshold on the enthalpy defect (J/kg); ~2e-5 K in air.
const EOS_H_TOL: f64 = 2e-2;

impl GasState {
    /// Create a state from temperature, pressure, composition and flow.
    pub fn from_tpy(
        t: Temperature,
        p: Pressure,
        comp: Composition,
        mdot: MassRate,
    ) -> ThermoResult<Self> {
        validate_tp(t.value, p.value)?;
        if !mdot.value.is_finite() || mdot.value < 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "mass flow must be non-negative and finite",
            });
        }
        let props = compute_props(t.value, p.value, &comp);
        Ok(Self {
            mdot,
            p,
            t,
            comp,
            props,
        })
    }

    /// Air at the given conditions.
    pub fn air(t: Temperature, p: Pressure, mdot: MassRate) -> ThermoResult<Self> {
        Self::from_tpy(t, p, Composition::air(), mdot)
    }

    // ---- accessors -------------------------------------------------------

    pub fn pressure(&self) -> Pressure {
        self.p
    }
    pub fn temperature(&self) -> Temperature {
        self.t
    }
    pub fn mass_flow(&self) -> MassRate {
        self.mdot
    }
    pub fn composition(&self) -> &Composition {
        &self.comp
    }
    pub fn p_pa(&self) -> f64 {
        self.p.value
    }
    pub fn t_k(&self) -> f64 {
        self.t.value
    }
    pub fn mdot_kgps(&self) -> f64 {
        self.mdot.value
    }

    /// Specific enthalpy (J/kg).
    pub fn h(&self) -> f64 {
        self.props.h
    }
    /// Specific entropy (J/(kg*K)).
    pub fn s(&self) -> f64 {
        self.props.s
    }
    /// Specific heat at constant pressure (J/(kg*K)).
    pub fn cp(&self) -> f64 {
        self.props.cp
    }
    /// Specific heat at constant volume (J/(kg*K)).
    pub fn cv(&self) -> f64 {
        self.props.cp - self.r_specific()
    }
    /// Heat capacity ratio.
    pub fn gamma(&self) -> f64 {
        self.props.cp / self.cv()
    }
    /// Specific gas constant (J/(kg*K)).
    pub fn r_specific(&self) -> f64 {
        R_UNIVERSAL / self.props.mmw
    }
    /// Mean molar mass (kg/kmol).
    pub fn mean_molar_mass(&self) -> f64 {
        self.props.mmw
    }
    /// Density from the ideal-gas mixture EOS (kg/m3).
    pub fn rho(&self) -> f64 {
        self.p.value / (self.r_specific() * self.t.value)
    }
    /// Frozen-composition sound speed (m/s).
    pub fn sound_speed(&self) -> f64 {
        (self.gamma() * self.r_specific() * self.t.value).sqrt()
    }
    /// Total enthalpy flow H = mdot * h (W).
    pub fn enthalpy_flow(&self) -> f64 {
        self.mdot.value * self.props.h
    }

    // ---- assignments -----------------------------------------------------

    pub fn set_mass_flow(&mut self, mdot: MassRate) {
        self.mdot = mdot;
    }

    pub fn set_mass_flow_kgps(&mut self, w: f64) {
        self.mdot = kgps(w);
    }

    /// Assign (T, P) at frozen composition.
    pub fn set_tp(&mut self, t: Temperature, p: Pressure) -> ThermoResult<()> {
        validate_tp(t.value, p.value)?;
        self.t = t;
        self.p = p;
        self.props = compute_props(t.value, p.value, &self.comp);
        Ok(())
    }

    /// Assign (T, P, Y).
    pub fn set_tpy(&mut self, t: Temperature, p: Pressure, comp: Composition) -> ThermoResult<()> {
        validate_tp(t.value, p.value)?;
        self.t = t;
        self.p = p;
        self.comp = comp;
        self.props = compute_props(t.value, p.value, &self.comp);
        Ok(())
    }

    /// Assign (H, P) at frozen composition: Newton on T with the cp slope.
    pub fn set_hp(&mut self, h_target: f64, p: Pressure) -> ThermoResult<()> {
        validate_tp(self.t.value, p.value)?;
        let t = solve_t_from_h(&self.comp, h_target, self.t.value)?;
        self.p = p;
        self.t = k(t);
        self.props = compute_props(t, p.value, &self.comp);
        Ok(())
    }

    /// Assign (S, P) at frozen composition: Newton on T with the cp/T slope.
    pub fn set_sp(&mut self, s_target: f64, p: Pressure) -> ThermoResult<()> {
        validate_tp(self.t.value, p.value)?;
        let mut t = self.t.value;
        for _ in 0..EOS_MAX_ITERS {
            let props = compute_props(t, p.value, &self.comp);
            let ds = s_target - props.s;
            if ds.abs() <= EOS_H_TOL / t {
                self.p = p;
                self.t = k(t);
                self.props = compute_props(t, p.value, &self.comp);
                return Ok(());
            }
            let mut t_next = t + ds * t / props.cp;
            if !t_next.is_finite() {
                break;
            }
            t_next = t_next.clamp(T_MIN_K, T_MAX_K);
            if (t_next - t).abs() < 1e-12 * t {
                t = t_next;
                break;
            }
            t = t_next;
        }
        let props = compute_props(t, p.value, &self.comp);
        if (s_target - props.s).abs() <= 1e-6 * s_target.abs().max(1.0) {
            self.p = p;
            self.t = k(t);
            self.props = props;
            return Ok(());
        }
        Err(ThermoError::EosConvergence {
            what: "T from (S,P)",
            target: s_target,
        })
    }

    /// Chemical equilibration at fixed (T, P): updates the composition.
    pub fn equilibrate_tp(&mut self) -> ThermoResult<()> {
        let comp = equilibrium::equilibrate_tp(&self.comp, self.t.value, self.p.value)?;
        self.comp = comp;
        self.props = compute_props(self.t.value, self.p.value, &self.comp);
        Ok(())
    }

    /// Chemical equilibration at fixed (H, P): updates composition and T.
    pub fn equilibrate_hp(&mut self) -> ThermoResult<()> {
        let h_target = self.props.h;
        let (comp, t) =
            equilibrium::equilibrate_hp(&self.comp, h_target, self.p.value, self.t.value)?;
        self.comp = comp;
        self.t = k(t);
        self.props = compute_props(t, self.p.value, &self.comp);
        Ok(())
    }

    /// Add another stream to this one: mass-weighted composition, conserved
    /// total enthalpy, resolved to a new temperature at the given pressure.
    pub fn mix_in(&mut self, other: &GasState, p_out: Pressure) -> ThermoResult<()> {
        let w_a = self.mdot.value;
        let w_b = other.mdot.value;
        if w_a + w_b <= 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "mixing two zero-flow streams",
            });
        }
        let comp = Composition::blend(&self.comp, w_a, &other.comp, w_b)?;
        let h = (w_a * self.props.h + w_b * other.props.h) / (w_a + w_b);
        self.comp = comp;
        self.mdot = kgps(w_a + w_b);
        // refresh the cache for the blended composition before the T solve
        self.props = compute_props(self.t.value, p_out.value, &self.comp);
        self.set_hp(h, p_out)
    }
}

fn validate_tp(t_k: f64, p_pa: f64) -> ThermoResult<()> {
    if !t_k.is_finite() || t_k <= 0.0 {
        return Err(ThermoError::NonPhysical {
            what: "temperature must be positive and finite",
        });
    }
    if !p_pa.is_finite() || p_pa <= 0.0 {
        return Err(ThermoError::NonPhysical {
            what: "pressure must be positive and finite",
        });
    }
    Ok(())
}

/// Mixture properties at (T, P, Y) from the NASA polynomials.
fn compute_props(t_k: f64, p_pa: f64, comp: &Composition) -> CachedProps {
    let mmw = comp.mean_molar_mass();
    let p_ref = gp_core::units::constants::P_REF_PA;
    let mut h = 0.0;
    let mut cp = 0.0;
    let mut s = 0.0;
    for (species, y) in comp.iter() {
        let m = species.molar_mass();
        h += y * nasa7::h_mol(species, t_k) / m;
        cp += y * nasa7::cp_mol(species, t_k) / m;
        // Partial-pressure entropy: s_i = s0_i - R ln(x_i P / P_ref).
        let x = y / m * mmw;
        let s_mol = nasa7::s0_mol(species, t_k) - R_UNIVERSAL * (x * p_pa / p_ref).ln();
        s += y * s_mol / m;
    }
    CachedProps { h, s, cp, mmw }
}

/// Specific enthalpy (J/kg) of a composition at a temperature, without
/// building a full state; used by the (H,P) equilibration loop.
pub(crate) fn mixture_enthalpy(comp: &Composition, t_k: f64) -> f64 {
    comp.iter()
        .map(|(species, y)| y * nasa7::h_mol(species, t_k) / species.molar_mass())
        .sum()
}

/// Newton iteration for T at fixed (H, Y); shared by set_hp and mixing.
pub(crate) fn solve_t_from_h(comp: &Composition, h_target: f64, t_guess: f64) -> ThermoResult<f64> {
    let mut t = t_guess.clamp(T_MIN_K, T_MAX_K);
    for _ in 0..EOS_MAX_ITERS {
        let props = compute_props(t, gp_core::units::constants::P_REF_PA, comp);
        let dh = h_target - props.h;
        if dh.abs() <= EOS_H_TOL {
            return Ok(t);
        }
        let mut t_next = t + dh / props.cp;
        if !t_next.is_finite() {
            break;
        }
        t_next = t_next.clamp(T_MIN_K, T_MAX_K);
        if (t_next - t).abs() < 1e-13 * t {
            // Pinned at a bound with a residual defect.
            break;
        }
        t = t_next;
    }
    let props = compute_props(t, gp_core::units::constants::P_REF_PA, comp);
    if (h_target - props.h).abs() <= 1.0 {
        return Ok(t);
    }
    Err(ThermoError::EosConvergence {
        what: "T from (H,P)",
        target: h_target,
    })
}
