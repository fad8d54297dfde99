//! NASA 7-coefficient thermodynamic polynomials.
//!
//! Two temperature ranges per species with the break at 1000 K. The air and
//! product species carry the GRI-3.0 coefficient sets; the kerosene
//! surrogate is a documented fit to n-dodecane vapor data (formation
//! enthalpy −290.9 kJ/mol, cp matched at 300 K and 1000 K), adequate for
//! the 250–1500 K fuel-injection window in which it is evaluated.

use crate::species::Species;
use gp_core::units::constants::R_UNIVERSAL;

/// One NASA-7 coefficient set: cp/R = a1 + a2 T + a3 T² + a4 T³ + a5 T⁴,
/// with a6 the enthalpy and a7 the entropy integration constant.
#[derive(Clone, Copy, Debug)]
pub struct Nasa7 {
    pub a: [f64; 7],
}

#[derive(Clone, Copy, Debug)]
struct SpeciesThermo {
    low: Nasa7,
    high: Nasa7,
    /// Range break (K); `low` applies below, `high` above.
    t_mid: f64,
}

const fn coeffs(a: [f64; 7]) -> Nasa7 {
    Nasa7 { a }
}

fn thermo_of(species: Species) -> SpeciesThermo {
    match species {
        Species::O2 => SpeciesThermo {
            low: coeffs([
                3.78245636e+00,
                -2.99673416e-03,
                9.84730201e-06,
                -9.68129509e-09,
                3.24372837e-12,
                -1.06394356e+03,
                3.65767573e+00,
            ]),
            high: coeffs([
                3.28253784e+00,
                1.48308754e-03,
                -7.57966669e-07,
                2.09470555e-10,
                -2.16717794e-14,
                -1.08845772e+03,
                5.45323129e+00,
            ]),
            t_mid: 1000.0,
        },
        Species::N2 => SpeciesThermo {
            low: coeffs([
                3.29867700e+00,
                1.40824040e-03,
                -3.96322200e-06,
                5.64151500e-09,
                -2.44485400e-12,
                -1.02089990e+03,
                3.95037200e+00,
            ]),
            high: coeffs([
                2.92664000e+00,
                1.48797680e-03,
                -5.68476000e-07,
                1.00970380e-10,
                -6.75335100e-15,
                -9.22797700e+02,
                5.98052800e+00,
            ]),
            t_mid: 1000.0,
        },
        Species::Ar => SpeciesThermo {
            low: coeffs([2.5, 0.0, 0.0, 0.0, 0.0, -7.45375000e+02, 4.36600000e+00]),
            high: coeffs([2.5, 0.0, 0.0, 0.0, 0.0, -7.45375000e+02, 4.36600000e+00]),
            t_mid: 1000.0,
        },
        Species::CO2 => SpeciesThermo {
            low: coeffs([
                2.35677352e+00,
                8.98459677e-03,
                -7.12356269e-06,
                2.45919022e-09,
                -1.43699548e-13,
                -4.83719697e+04,
                9.90105222e+00,
            ]),
            high: coeffs([
                3.85746029e+00,
                4.41437026e-03,
                -2.21481404e-06,
                5.23490188e-10,
                -4.72084164e-14,
                -4.87591660e+04,
                2.27163806e+00,
            ]),
            t_mid: 1000.0,
        },
        Species::H2O => SpeciesThermo {
            low: coeffs([
                4.19864056e+00,
                -2.03643410e-03,
                6.52040211e-06,
                -5.48797062e-09,
                1.77197817e-12,
                -3.02937267e+04,
                -8.49032208e-01,
            ]),
            high: coeffs([
                3.03399249e+00,
                2.17691804e-03,
                -1.64072518e-07,
                -9.70419870e-11,
                1.68200992e-14,
                -3.00042971e+04,
                4.96677010e+00,
            ]),
            t_mid: 1000.0,
        },
        Species::CO => SpeciesThermo {
            low: coeffs([
                3.57953347e+00,
                -6.10353680e-04,
                1.01681433e-06,
                9.07005884e-10,
                -9.04424499e-13,
                -1.43440860e+04,
                3.50840928e+00,
            ]),
            high: coeffs([
                2.71518561e+00,
                2.06252743e-03,
                -9.98825771e-07,
                2.30053008e-10,
                -2.03647716e-14,
                -1.41518724e+04,
                7.81868772e+00,
            ]),
            t_mid: 1000.0,
        },
        Species::H2 => SpeciesThermo {
            low: coeffs([
                2.34433112e+00,
                7.98052075e-03,
                -1.94781510e-05,
                2.01572094e-08,
                -7.37611761e-12,
                -9.17935173e+02,
                6.83010238e-01,
            ]),
            high: coeffs([
                3.33727920e+00,
                -4.94024731e-05,
                4.99456778e-07,
                -1.79566394e-10,
                2.00255376e-14,
                -9.50158922e+02,
                -3.20502331e+00,
            ]),
            t_mid: 1000.0,
        },
        Species::CH4 => SpeciesThermo {
            low: coeffs([
                5.14987613e+00,
                -1.36709788e-02,
                4.91800599e-05,
                -4.84743026e-08,
                1.66693956e-11,
                -1.02466476e+04,
                -4.64130376e+00,
            ]),
            high: coeffs([
                7.48514950e-02,
                1.33909467e-02,
                -5.73285809e-06,
                1.22292535e-09,
                -1.01815230e-13,
                -9.46834459e+03,
                1.84373180e+01,
            ]),
            t_mid: 1000.0,
        },
        // Surrogate fit, single range, see module docs.
        Species::NC12H26 => SpeciesThermo {
            low: coeffs([
                1.80400000e+01,
                5.18600000e-02,
                0.0,
                0.0,
                0.0,
                -4.26727000e+04,
                -4.33200000e+01,
            ]),
            high: coeffs([
                1.80400000e+01,
                5.18600000e-02,
                0.0,
                0.0,
                0.0,
                -4.26727000e+04,
                -4.33200000e+01,
            ]),
            t_mid: 1000.0,
        },
    }
}

fn range_for(species: Species, t_k: f64) -> Nasa7 {
    let th = thermo_of(species);
    if t_k < th.t_mid { th.low } else { th.high }
}

/// Molar heat capacity cp (J/(kmol*K)).
pub fn cp_mol(species: Species, t_k: f64) -> f64 {
    let a = range_for(species, t_k).a;
    R_UNIVERSAL * (a[0] + a[1] * t_k + a[2] * t_k * t_k + a[3] * t_k.powi(3) + a[4] * t_k.powi(4))
}

/// Molar enthalpy including formation enthalpy (J/kmol).
pub fn h_mol(species: Species, t_k: f64) -> f64 {
    let a = range_for(species, t_k).a;
    R_UNIVERSAL
        * t_k
        * (a[0]
            + a[1] / 2.0 * t_k
            + a[2] / 3.0 * t_k * t_k
            + a[3] / 4.0 * t_k.powi(3)
            + a[4] / 5.0 * t_k.powi(4)
            + a[5] / t_k)
}

/// Standard-state molar entropy at the reference pressure (J/(kmol*K)).
pub fn s0_mol(species: Species, t_k: f64) -> f64 {
    let a = range_for(species, t_k).a;
    R_UNIVERSAL
        * (a[0] * t_k.ln()
            + a[1] * t_k
            + a[2] / 2.0 * t_k * t_k
            + a[3] / 3.0 * t_k.powi(3)
            + a[4] / 4.0 * t_k.powi(4)
            + a[6])
}

/// Dimensionless standard-state chemical potential mu0/(R T).
pub fn mu0_over_rt(species: Species, t_k: f64) -> f64 {
    (h_mol(species, t_k) - t_k * s0_mol(species, t_k)) / (R_UNIVERSAL * t_k)
}
