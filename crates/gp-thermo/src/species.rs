//! Chemical species definitions.

use crate::error::{ThermoError, ThermoResult};

/// Chemical elements tracked for combustion bookkeeping and equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    C,
    H,
    O,
    N,
    Ar,
}

impl Element {
    pub const ALL: [Element; 5] = [Element::C, Element::H, Element::O, Element::N, Element::Ar];

    /// Atomic mass (kg/kmol).
    pub fn atomic_mass(self) -> f64 {
        match self {
            Element::C => 12.011,
            Element::H => 1.008,
            Element::O => 15.999,
            Element::N => 14.007,
            Element::Ar => 39.948,
        }
    }
}

/// The fixed species set of the gas model: dry-air constituents, complete
/// and dissociated combustion products, and two fuels (methane plus a
/// kerosene surrogate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    /// Oxygen (O₂)
    O2,
    /// Nitrogen (N₂)
    N2,
    /// Argon (Ar)
    Ar,
    /// Carbon dioxide (CO₂)
    CO2,
    /// Water vapor (H₂O)
    H2O,
    /// Carbon monoxide (CO)
    CO,
    /// Hydrogen (H₂)
    H2,
    /// Methane (CH₄)
    CH4,
    /// n-dodecane (C₁₂H₂₆), kerosene/Jet-A surrogate
    NC12H26,
}

impl Species {
    pub const ALL: [Species; 9] = [
        Species::O2,
        Species::N2,
        Species::Ar,
        Species::CO2,
        Species::H2O,
        Species::CO,
        Species::H2,
        Species::CH4,
        Species::NC12H26,
    ];

    /// Molar mass (kg/kmol).
    pub fn molar_mass(self) -> f64 {
        match self {
            Species::O2 => 31.9988,
            Species::N2 => 28.0134,
            Species::Ar => 39.948,
            Species::CO2 => 44.0095,
            Species::H2O => 18.01528,
            Species::CO => 28.0101,
            Species::H2 => 2.01588,
            Species::CH4 => 16.04246,
            Species::NC12H26 => 170.33484,
        }
    }

    /// Atoms of `element` per molecule.
    pub fn atoms_of(self, element: Element) -> f64 {
        use Element::*;
        use Species::*;
        let (c, h, o, n, ar) = match self {
            O2 => (0, 0, 2, 0, 0),
            N2 => (0, 0, 0, 2, 0),
            Species::Ar => (0, 0, 0, 0, 1),
            CO2 => (1, 0, 2, 0, 0),
            H2O => (0, 2, 1, 0, 0),
            CO => (1, 0, 1, 0, 0),
            H2 => (0, 2, 0, 0, 0),
            CH4 => (1, 4, 0, 0, 0),
            NC12H26 => (12, 26, 0, 0, 0),
        };
        match element {
            C => c as f64,
            H => h as f64,
            O => o as f64,
            N => n as f64,
            Element::Ar => ar as f64,
        }
    }

    /// Legacy map-file / composition-string name.
    pub fn name(self) -> &'static str {
        match self {
            Species::O2 => "O2",
            Species::N2 => "N2",
            Species::Ar => "AR",
            Species::CO2 => "CO2",
            Species::H2O => "H2O",
            Species::CO => "CO",
            Species::H2 => "H2",
            Species::CH4 => "CH4",
            Species::NC12H26 => "NC12H26",
        }
    }

    /// Resolve a species from its composition-string name (case-insensitive).
    pub fn from_name(name: &str) -> ThermoResult<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Species::ALL
            .iter()
            .copied()
            .find(|s| s.name() == upper)
            .ok_or_else(|| ThermoError::UnknownSpecies {
                name: name.to_string(),
            })
    }

    /// True for the fuel species that take part in combustion but are
    /// excluded from the product equilibrium set.
    pub fn is_fuel(self) -> bool {
        matches!(self, Species::CH4 | Species::NC12H26)
    }
}
