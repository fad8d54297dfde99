//! Mass-fraction compositions over the fixed species set.

use crate::error::{ThermoError, ThermoResult};
use crate::species::{Element, Species};

/// Number of species in the fixed gas model.
pub const SPECIES_COUNT: usize = Species::ALL.len();

/// Normalized mass fractions over the fixed species set.
///
/// The invariant |sum(Y) - 1| <= 1e-9 holds for every constructed value;
/// all constructors normalize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composition {
    y: [f64; SPECIES_COUNT],
}

/// Dry-air mass fractions (CO2, O2, Ar, N2), matching the calibration
/// composition of the legacy model family.
pub const AIR_CO2_MASS: f64 = 0.00048469;
pub const AIR_O2_MASS: f64 = 0.2314151;
pub const AIR_AR_MASS: f64 = 0.0129159;
pub const AIR_N2_MASS: f64 = 0.75518431;

impl Composition {
    /// Dry air.
    pub fn air() -> Self {
        let mut y = [0.0; SPECIES_COUNT];
        y[Species::CO2 as usize] = AIR_CO2_MASS;
        y[Species::O2 as usize] = AIR_O2_MASS;
        y[Species::Ar as usize] = AIR_AR_MASS;
        y[Species::N2 as usize] = AIR_N2_MASS;
        Self { y }
    }

    /// Single-species composition.
    pub fn pure(species: Species) -> Self {
        let mut y = [0.0; SPECIES_COUNT];
        y[species as usize] = 1.0;
        Self { y }
    }

    /// Build from (species, mass amount) pairs.
    ///
    /// Amounts are relative weights; they must be finite and non-negative
    /// with a positive sum, and are normalized to mass fractions.
    pub fn from_mass_fractions(fractions: &[(Species, f64)]) -> ThermoResult<Self> {
        if fractions.is_empty() {
            return Err(ThermoError::InvalidArg {
                what: "empty composition",
            });
        }
        let mut y = [0.0; SPECIES_COUNT];
        for &(species, frac) in fractions {
            if !frac.is_finite() {
                return Err(ThermoError::NonPhysical {
                    what: "non-finite mass fraction",
                });
            }
            if frac < 0.0 {
                return Err(ThermoError::NonPhysical {
                    what: "negative mass fraction",
                });
            }
            y[species as usize] += frac;
        }
        let sum: f64 = y.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(ThermoError::NonPhysical {
                what: "mass fractions sum to zero or non-finite",
            });
        }
        for v in &mut y {
            *v /= sum;
        }
        Ok(Self { y })
    }

    /// Parse a legacy composition string like `"NC12H26:1"` or
    /// `"CH4:5, H2:1"` (mass ratios).
    pub fn parse(text: &str) -> ThermoResult<Self> {
        let mut pairs = Vec::new();
        for item in text.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (name, amount) = item.split_once(':').ok_or(ThermoError::InvalidArg {
                what: "composition entries must be NAME:amount",
            })?;
            let amount: f64 = amount
                .trim()
                .parse()
                .map_err(|_| ThermoError::InvalidArg {
                    what: "composition amount is not a number",
                })?;
            pairs.push((Species::from_name(name)?, amount));
        }
        Self::from_mass_fractions(&pairs)
    }

    /// Mass fraction of a species.
    pub fn mass_fraction(&self, species: Species) -> f64 {
        self.y[species as usize]
    }

    /// Iterate (species, mass fraction) over non-zero entries.
    pub fn iter(&self) -> impl Iterator<Item = (Species, f64)> + '_ {
        Species::ALL
            .iter()
            .map(|&s| (s, self.y[s as usize]))
            .filter(|&(_, y)| y > 0.0)
    }

    /// Mean molar mass (kg/kmol): 1 / sum(Y_i / M_i).
    pub fn mean_molar_mass(&self) -> f64 {
        let inv: f64 = self
            .iter()
            .map(|(s, y)| y / s.molar_mass())
            .sum();
        1.0 / inv
    }

    /// Mole fraction of a species.
    pub fn mole_fraction(&self, species: Species) -> f64 {
        self.mass_fraction(species) / species.molar_mass() * self.mean_molar_mass()
    }

    /// Element abundances in kmol of atoms per kg of mixture, ordered as
    /// [`Element::ALL`].
    pub fn element_kmol_per_kg(&self) -> [f64; 5] {
        let mut b = [0.0; 5];
        for (s, y) in self.iter() {
            let n_species = y / s.molar_mass(); // kmol/kg
            for (ie, &e) in Element::ALL.iter().enumerate() {
                b[ie] += n_species * s.atoms_of(e);
            }
        }
        b
    }

    /// Mass-weighted blend of two compositions.
    pub fn blend(a: &Composition, w_a: f64, b: &Composition, w_b: f64) -> ThermoResult<Self> {
        if w_a < 0.0 || w_b < 0.0 || w_a + w_b <= 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "blend weights must be non-negative with positive sum",
            });
        }
        let total = w_a + w_b;
        let mut y = [0.0; SPECIES_COUNT];
        for i in 0..SPECIES_COUNT {
            y[i] = (a.y[i] * w_a + b.y[i] * w_b) / total;
        }
        Ok(Self { y })
    }

    /// Replace the fractions wholesale (internal use); normalizes.
    pub(crate) fn from_raw(mut y: [f64; SPECIES_COUNT]) -> ThermoResult<Self> {
        let sum: f64 = y.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(ThermoError::NonPhysical {
                what: "raw mass fractions sum to zero or non-finite",
            });
        }
        for v in &mut y {
            if *v < 0.0 && *v > -1e-12 {
                *v = 0.0; // clip roundoff
            }
            *v /= sum;
        }
        if y.iter().any(|v| *v < 0.0) {
            return Err(ThermoError::NonPhysical {
                what: "negative mass fraction",
            });
        }
        Ok(Self { y })
    }

    /// Sum of mass fractions (1.0 up to the normalization tolerance).
    pub fn sum(&self) -> f64 {
        self.y.iter().sum()
    }
}
