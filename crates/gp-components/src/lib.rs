//! gp-components: engine component models and the simulation context.
//!
//! Components are trait objects walked in gas-path order by the engine.
//! During the design-point pass each component sizes itself, registers its
//! free states and residual equations and loads its maps; during
//! off-design evaluations it reads the trial state vector, evaluates its
//! physics and writes its residuals. All shared data lives in an explicit
//! [`SimContext`] passed by reference, so several engines can coexist in
//! one process.

pub mod ambient;
pub mod amcontrol;
pub mod combustor;
pub mod component;
pub mod compressor;
pub mod context;
pub mod control;
pub mod coolingflow;
pub mod diffuser;
pub mod duct;
pub mod error;
pub mod fan;
pub mod gaspath;
pub mod inlet;
pub mod nozzle;
pub mod turbine;

pub use ambient::{Ambient, AmbientConditions, Atmosphere, IsaAtmosphere};
pub use amcontrol::{AmControl, MapModTarget, MeasuredParam, PowerSetting};
pub use combustor::{Combustor, FuelSpec};
pub use component::{Component, GaspathLink};
pub use compressor::{BleedSpec, Compressor, SpeedMode};
pub use context::{MapModKind, Mode, Shaft, SimContext, Totals};
pub use control::{Control, ControlLink, SweepSpec};
pub use coolingflow::CoolingFlow;
pub use diffuser::ExhaustDiffuser;
pub use duct::Duct;
pub use error::{ComponentError, ComponentResult};
pub use fan::Fan;
pub use inlet::Inlet;
pub use nozzle::ExhaustNozzle;
pub use turbine::{Turbine, TurbineKind};
