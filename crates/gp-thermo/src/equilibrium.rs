//! Chemical equilibrium by element-potential Gibbs minimization.
//!
//! The equilibrium set is the seven product species {O2, N2, Ar, CO2, H2O,
//! CO, H2}; fuel species contribute their elements and leave the set, which
//! reproduces the lean-combustion behaviour of a full mechanism (fuel
//! fractions at equilibrium are vanishingly small at gas-turbine
//! temperatures).
//!
//! For an ideal-gas mixture the equilibrium condition is
//!
//! ```text
//! ln n_j = ln n_tot + sum_e a_je * pi_e - mu0_j/(RT) - ln(P/P0)
//! ```
//!
//! with the element potentials pi_e and the total mole count closing the
//! element balances. The resulting (m+1)-dimensional system is solved with
//! a damped Newton iteration started from the complete-combustion split.

use crate::composition::{Composition, SPECIES_COUNT};
use crate::error::{ThermoError, ThermoResult};
use crate::nasa7;
use crate::species::{Element, Species};
use crate::state::mixture_enthalpy;
use gp_core::numeric::{ScalarSolveError, ScalarSolveOptions, solve_scalar};
use gp_core::units::constants::P_REF_PA;
use nalgebra::{DMatrix, DVector};

/// Product species participating in the equilibrium.
const EQ_SPECIES: [Species; 7] = [
    Species::O2,
    Species::N2,
    Species::Ar,
    Species::CO2,
    Species::H2O,
    Species::CO,
    Species::H2,
];

const MAX_NEWTON_ITERS: usize = 120;
const ELEMENT_TOL: f64 = 1e-10;
/// Presence threshold for an element (kmol of atoms per kg of mixture).
const ELEMENT_PRESENT: f64 = 1e-14;
/// Relative floor for species mole numbers in the initial guess.
const N_FLOOR_REL: f64 = 1e-12;

/// Equilibrate at fixed (T, P); returns the equilibrium composition.
pub(crate) fn equilibrate_tp(comp: &Composition, t_k: f64, p_pa: f64) -> ThermoResult<Composition> {
    let b = comp.element_kmol_per_kg();

    let present: Vec<usize> = (0..Element::ALL.len())
        .filter(|&e| b[e] > ELEMENT_PRESENT)
        .collect();
    if present.is_empty() {
        return Err(ThermoError::Equilibrium {
            what: "no elements present".to_string(),
        });
    }

    // A species is active when every element it contains is present.
    let active: Vec<Species> = EQ_SPECIES
        .iter()
        .copied()
        .filter(|&s| {
            Element::ALL
                .iter()
                .enumerate()
                .all(|(e, &el)| s.atoms_of(el) == 0.0 || b[e] > ELEMENT_PRESENT)
        })
        .collect();

    let m = present.len();
    let n_act = active.len();
    if n_act == 0 {
        return Err(ThermoError::Equilibrium {
            what: "no active species for the element set".to_string(),
        });
    }

    // Element matrix restricted to present elements: a[j][e].
    let a = |j: usize, e: usize| -> f64 { active[j].atoms_of(Element::ALL[present[e]]) };

    // Dimensionless potentials mu0/(RT) + ln(P/P0) per active species.
    let ln_p = (p_pa / P_REF_PA).ln();
    let g: Vec<f64> = active
        .iter()
        .map(|&s| nasa7::mu0_over_rt(s, t_k) + ln_p)
        .collect();

    // Complete-combustion initial guess (kmol per kg of mixture).
    let n0 = complete_combustion_split(&b, &active);
    let n_scale: f64 = n0.iter().sum();
    let n0: Vec<f64> = n0
        .iter()
        .map(|&n| n.max(N_FLOOR_REL * n_scale))
        .collect();
    let mut ln_ntot = n0.iter().sum::<f64>().ln();

    // Weighted least squares for the starting element potentials:
    // sum_e a_je pi_e = ln(n_j) - ln_ntot + g_j.
    let mut pi = {
        let mut rows = DMatrix::zeros(n_act, m);
        let mut rhs = DVector::zeros(n_act);
        for j in 0..n_act {
            let w = n0[j].sqrt();
            for e in 0..m {
                rows[(j, e)] = w * a(j, e);
            }
            rhs[j] = w * (n0[j].ln() - ln_ntot + g[j]);
        }
        let svd = rows.svd(true, true);
        svd.solve(&rhs, 1e-12).map_err(|_| ThermoError::Equilibrium {
            what: "initial potential estimate failed".to_string(),
        })?
    };

    let mut n = vec![0.0; n_act];
    for iter in 0..MAX_NEWTON_ITERS {
        // Species mole numbers from the potentials.
        let mut n_tot_from_species = 0.0;
        for j in 0..n_act {
            let mut expo = ln_ntot - g[j];
            for e in 0..m {
                expo += a(j, e) * pi[e];
            }
            n[j] = expo.clamp(-400.0, 60.0).exp();
            n_tot_from_species += n[j];
        }
        let n_tot = ln_ntot.exp();

        // Residuals: element balances + mole-count closure.
        let mut r = DVector::zeros(m + 1);
        for e in 0..m {
            let sum: f64 = (0..n_act).map(|j| a(j, e) * n[j]).sum();
            r[e] = sum - b[present[e]];
        }
        r[m] = n_tot_from_species - n_tot;

        let converged = (0..m)
            .all(|e| r[e].abs() <= ELEMENT_TOL * b[present[e]].max(1e-12))
            && r[m].abs() <= ELEMENT_TOL * n_tot;
        if converged {
            return composition_from_moles(&active, &n);
        }

        // Jacobian in (pi_0..pi_{m-1}, ln n_tot).
        let mut jac = DMatrix::zeros(m + 1, m + 1);
        for e in 0..m {
            for f in 0..m {
                jac[(e, f)] = (0..n_act).map(|j| a(j, e) * a(j, f) * n[j]).sum();
            }
            jac[(e, m)] = (0..n_act).map(|j| a(j, e) * n[j]).sum();
        }
        for f in 0..m {
            jac[(m, f)] = (0..n_act).map(|j| a(j, f) * n[j]).sum();
        }
        // The corner entry tends to zero at the solution; the bordered
        // system stays non-singular through the element rows.
        jac[(m, m)] = n_tot_from_species - n_tot;

        let delta = jac
            .lu()
            .solve(&(-r))
            .ok_or_else(|| ThermoError::Equilibrium {
                what: format!("singular Jacobian at iteration {iter}"),
            })?;

        // Damp large potential steps.
        let max_step = delta.amax();
        let lambda = if max_step > 2.0 { 2.0 / max_step } else { 1.0 };
        for e in 0..m {
            pi[e] += lambda * delta[e];
        }
        ln_ntot += lambda * delta[m];
    }

    Err(ThermoError::Equilibrium {
        what: format!("element-potential Newton exceeded {MAX_NEWTON_ITERS} iterations"),
    })
}

/// Equilibrate at fixed (H, P): nested T iteration around the TP solve.
pub(crate) fn equilibrate_hp(
    comp: &Composition,
    h_target: f64,
    p_pa: f64,
    t_guess: f64,
) -> ThermoResult<(Composition, f64)> {
    let t0 = t_guess.clamp(250.0, 3500.0);
    let opts = ScalarSolveOptions {
        f_tol: 1.0, // J/kg, ~1e-3 K in combustion gas
        x_tol: 1e-9,
        first_step: 5e-3,
        max_iterations: 60,
    };
    let t_eq = solve_scalar(
        |t| {
            let t = t.clamp(200.0, 3900.0);
            let eq = equilibrate_tp(comp, t, p_pa)?;
            Ok::<f64, ThermoError>(mixture_enthalpy(&eq, t) - h_target)
        },
        t0,
        &opts,
    )
    .map_err(|e| match e {
        ScalarSolveError::Residual(inner) => inner,
        ScalarSolveError::NoConvergence { last_x, .. } => ThermoError::EosConvergence {
            what: "T for (H,P) equilibrium",
            target: last_x,
        },
    })?;
    let t_eq = t_eq.clamp(200.0, 3900.0);
    let eq = equilibrate_tp(comp, t_eq, p_pa)?;
    Ok((eq, t_eq))
}

/// Complete-combustion split of the element pool: all carbon to CO2, all
/// hydrogen to H2O, leftover oxygen to O2, nitrogen and argon inert.
/// Used as the Newton starting point; the lean formula with a floor also
/// starts rich cases well enough for the damped iteration.
fn complete_combustion_split(b: &[f64; 5], active: &[Species]) -> Vec<f64> {
    let b_c = b[0];
    let b_h = b[1];
    let b_o = b[2];
    let b_n = b[3];
    let b_ar = b[4];

    let n_co2 = b_c;
    let n_h2o = b_h / 2.0;
    let n_o2 = ((b_o - 2.0 * n_co2 - n_h2o) / 2.0).max(0.0);

    active
        .iter()
        .map(|&s| match s {
            Species::O2 => n_o2,
            Species::N2 => b_n / 2.0,
            Species::Ar => b_ar,
            Species::CO2 => n_co2,
            Species::H2O => n_h2o,
            _ => 0.0,
        })
        .collect()
}

fn composition_from_moles(active: &[Species], n: &[f64]) -> ThermoResult<Composition> {
    let mut y = [0.0; SPECIES_COUNT];
    for (j, &s) in active.iter().enumerate() {
        y[s as usize] = n[j] * s.molar_mass();
    }
    Composition::from_raw(y)
}
