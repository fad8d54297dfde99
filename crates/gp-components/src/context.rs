//! The shared simulation context.
//!
//! Everything the legacy architecture kept as process-wide module state —
//! the station dictionary, the state and error vectors, the shaft list,
//! the aggregate totals and the output dictionary — lives here and is
//! passed explicitly to every component call.

use crate::error::{ComponentError, ComponentResult};
use gp_core::ids::{ShaftNr, Station};
use gp_maps::MapModifiers;
use gp_results::OutputRow;
use gp_thermo::GasState;
use std::collections::HashMap;

/// Run mode of the current evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Design point: components size themselves and register unknowns.
    Dp,
    /// Off-design: components evaluate against the trial state vector.
    Od,
}

/// A rotor spool shared by the turbo components that reference its number.
///
/// Created automatically on first reference. `pw_sum` accumulates power
/// contributions over one evaluation (positive = delivered to the shaft);
/// at convergence it is zero for gas-generator spools and the useful
/// output for power-turbine and constant-speed spools.
#[derive(Debug, Clone)]
pub struct Shaft {
    pub number: ShaftNr,
    pub label: String,
    pub pw_sum: f64,
    /// State-vector slot of the rotor-speed multiplier; `None` while no
    /// speed-free component has registered one.
    pub istate: Option<usize>,
}

/// System-level aggregates over one evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Totals {
    /// Gross thrust (N), summed over propelling nozzles.
    pub fg: f64,
    /// Ram drag (N), summed over inlets.
    pub rd: f64,
    /// Total fuel flow (kg/s).
    pub wf: f64,
}

/// Flight and ambient conditions of the current evaluation, published by
/// the ambient component for everyone downstream.
#[derive(Debug, Clone, Copy)]
pub struct AmbientState {
    pub altitude_m: f64,
    pub mach: f64,
    /// Static temperature (K) and pressure (Pa).
    pub tsa: f64,
    pub psa: f64,
    /// Total temperature (K) and pressure (Pa).
    pub tta: f64,
    pub pta: f64,
    /// Flight speed (m/s).
    pub v_flight: f64,
}

impl Default for AmbientState {
    fn default() -> Self {
        use gp_core::units::constants::{P_STD_PA, T_STD_K};
        Self {
            altitude_m: 0.0,
            mach: 0.0,
            tsa: T_STD_K,
            psa: P_STD_PA,
            tta: T_STD_K,
            pta: P_STD_PA,
            v_flight: 0.0,
        }
    }
}

/// Which map quantity a health modifier scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapModKind {
    Wc,
    Pr,
    Eta,
}

impl MapModKind {
    pub fn tag(self) -> &'static str {
        match self {
            MapModKind::Wc => "wc",
            MapModKind::Pr => "pr",
            MapModKind::Eta => "eta",
        }
    }
}

/// Shared mutable state of one engine simulation.
#[derive(Debug, Default)]
pub struct SimContext {
    /// Gas state per gas-path station, owned here, populated by the
    /// producing component of each station.
    pub stations: HashMap<Station, GasState>,
    /// Free unknowns; all 1.0 at the design point.
    pub states: Vec<f64>,
    /// Residuals driven to zero off-design.
    pub errors: Vec<f64>,
    pub shafts: Vec<Shaft>,
    pub totals: Totals,
    pub ambient: AmbientState,
    /// Per-evaluation output dictionary; discovery order fixes the output
    /// table columns.
    pub outputs: OutputRow,
    /// Current input value per control, keyed by control name.
    pub control_values: HashMap<String, f64>,
    /// Direct parameter overrides (component name, parameter name), used
    /// by the adaptive-model control to drive power settings.
    pub overrides: HashMap<(String, String), f64>,
    /// Map health modifiers keyed by (map key, kind); absent means 1.0.
    pub map_mods: HashMap<(String, MapModKind), f64>,
    /// Product of downstream design pressure ratios per station, used by
    /// power turbines to size their design expansion to ambient.
    pub pr_des_to_ambient: HashMap<Station, f64>,
}

impl SimContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- state/error registration ---------------------------------------

    /// Append a free state (value 1.0) and return its slot.
    pub fn push_state(&mut self) -> usize {
        self.states.push(1.0);
        self.states.len() - 1
    }

    /// Append a residual slot (value 0.0) and return its index.
    pub fn push_error(&mut self) -> usize {
        self.errors.push(0.0);
        self.errors.len() - 1
    }

    pub fn state(&self, slot: Option<usize>, what: &'static str) -> ComponentResult<f64> {
        let slot = slot.ok_or(ComponentError::SlotNotRegistered { what })?;
        self.states
            .get(slot)
            .copied()
            .ok_or(ComponentError::SlotNotRegistered { what })
    }

    pub fn set_error(
        &mut self,
        slot: Option<usize>,
        what: &'static str,
        value: f64,
    ) -> ComponentResult<()> {
        let slot = slot.ok_or(ComponentError::SlotNotRegistered { what })?;
        *self
            .errors
            .get_mut(slot)
            .ok_or(ComponentError::SlotNotRegistered { what })? = value;
        Ok(())
    }

    // ---- stations --------------------------------------------------------

    pub fn station(&self, station: Station) -> ComponentResult<&GasState> {
        self.stations
            .get(&station)
            .ok_or(ComponentError::MissingStation { station })
    }

    pub fn station_mut(&mut self, station: Station) -> ComponentResult<&mut GasState> {
        self.stations
            .get_mut(&station)
            .ok_or(ComponentError::MissingStation { station })
    }

    pub fn set_station(&mut self, station: Station, gas: GasState) {
        self.stations.insert(station, gas);
    }

    // ---- shafts ----------------------------------------------------------

    /// Shaft by number, created on first reference.
    pub fn shaft_mut(&mut self, number: ShaftNr, label_hint: &str) -> &mut Shaft {
        if let Some(idx) = self.shafts.iter().position(|s| s.number == number) {
            return &mut self.shafts[idx];
        }
        self.shafts.push(Shaft {
            number,
            label: format!("{label_hint} shaft {number}"),
            pw_sum: 0.0,
            istate: None,
        });
        self.shafts.last_mut().expect("just pushed")
    }

    pub fn shaft(&self, number: ShaftNr) -> Option<&Shaft> {
        self.shafts.iter().find(|s| s.number == number)
    }

    // ---- controls, overrides, map modifiers ------------------------------

    pub fn control_value(&self, name: &str) -> ComponentResult<f64> {
        self.control_values
            .get(name)
            .copied()
            .ok_or_else(|| ComponentError::Config {
                what: format!("control '{name}' has not run before its consumer"),
            })
    }

    pub fn override_value(&self, component: &str, parameter: &str) -> Option<f64> {
        self.overrides
            .get(&(component.to_string(), parameter.to_string()))
            .copied()
    }

    pub fn set_map_mod(&mut self, map_key: &str, kind: MapModKind, value: f64) {
        self.map_mods.insert((map_key.to_string(), kind), value);
    }

    pub fn map_mod(&self, map_key: &str, kind: MapModKind) -> f64 {
        self.map_mods
            .get(&(map_key.to_string(), kind))
            .copied()
            .unwrap_or(1.0)
    }

    /// All three health modifiers for a map, for scaled evaluation.
    pub fn map_modifiers(&self, map_key: &str) -> MapModifiers {
        MapModifiers {
            wc: self.map_mod(map_key, MapModKind::Wc),
            pr: self.map_mod(map_key, MapModKind::Pr),
            eta: self.map_mod(map_key, MapModKind::Eta),
        }
    }

    // ---- evaluation lifecycle -------------------------------------------

    /// Reset the per-evaluation accumulators and adopt a trial state
    /// vector. Stations, shafts and registered slots persist.
    pub fn begin_evaluation(&mut self, states: &[f64]) {
        self.states.clear();
        self.states.extend_from_slice(states);
        for shaft in &mut self.shafts {
            shaft.pw_sum = 0.0;
        }
        self.totals = Totals::default();
        self.outputs = OutputRow::new();
        self.control_values.clear();
        self.overrides.clear();
    }

    /// Full reset before a design-point pass: registration starts over.
    pub fn reset_design(&mut self) {
        self.states.clear();
        self.errors.clear();
        self.shafts.clear();
        self.stations.clear();
        self.map_mods.clear();
        self.begin_evaluation(&[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_and_error_registration() {
        let mut ctx = SimContext::new();
        let s0 = ctx.push_state();
        let s1 = ctx.push_state();
        let e0 = ctx.push_error();
        assert_eq!((s0, s1, e0), (0, 1, 0));
        assert_eq!(ctx.states, vec![1.0, 1.0]);
        assert_eq!(ctx.state(Some(1), "test").unwrap(), 1.0);
        assert!(ctx.state(None, "test").is_err());
        ctx.set_error(Some(0), "test", -0.25).unwrap();
        assert_eq!(ctx.errors, vec![-0.25]);
    }

    #[test]
    fn shaft_auto_creation_is_idempotent() {
        let mut ctx = SimContext::new();
        ctx.shaft_mut(1, "compressor1").pw_sum = -5.0e6;
        ctx.shaft_mut(1, "turbine1").pw_sum += 5.0e6;
        assert_eq!(ctx.shafts.len(), 1);
        assert_eq!(ctx.shaft(1).unwrap().pw_sum, 0.0);
        assert!(ctx.shaft(1).unwrap().label.contains("compressor1"));
    }

    #[test]
    fn map_modifiers_default_to_unity() {
        let mut ctx = SimContext::new();
        let mods = ctx.map_modifiers("compressor1");
        assert_eq!((mods.wc, mods.pr, mods.eta), (1.0, 1.0, 1.0));
        ctx.set_map_mod("compressor1", MapModKind::Eta, 0.96);
        assert_eq!(ctx.map_modifiers("compressor1").eta, 0.96);
    }

    #[test]
    fn begin_evaluation_resets_accumulators_but_keeps_shafts() {
        let mut ctx = SimContext::new();
        ctx.shaft_mut(1, "x").pw_sum = 1.0;
        ctx.totals.fg = 9.9;
        ctx.begin_evaluation(&[1.1, 0.9]);
        assert_eq!(ctx.states, vec![1.1, 0.9]);
        assert_eq!(ctx.totals.fg, 0.0);
        assert_eq!(ctx.shafts.len(), 1);
        assert_eq!(ctx.shaft(1).unwrap().pw_sum, 0.0);
    }
}
