//! The component interface walked by the engine.

use crate::context::{Mode, SimContext};
use crate::error::ComponentResult;
use gp_core::ids::Station;
use gp_results::OutputRow;

/// Gas-path connectivity of a component, used by the engine to precompute
/// the downstream design-pressure-ratio chain each power turbine needs.
#[derive(Debug, Clone, Copy)]
pub struct GaspathLink {
    pub station_in: Station,
    pub station_out: Station,
    /// Declared design pressure ratio (1.0 where none applies).
    pub pr_des: f64,
}

/// One engine component.
///
/// The engine walks the ordered component list once per evaluation:
/// `run` for every component in order (each immediately followed by
/// `add_outputs`), then system totals, then `post_run` for every
/// component — which is where closed-loop controls read the freshly
/// written outputs and close their equations.
pub trait Component {
    fn name(&self) -> &str;

    /// Evaluate the component. On the design-point pass this also sizes
    /// the component and registers its states and residuals.
    fn run(&mut self, ctx: &mut SimContext, mode: Mode, point: usize) -> ComponentResult<()>;

    /// Hook after the full forward walk; default is a no-op.
    fn post_run(&mut self, _ctx: &mut SimContext, _mode: Mode, _point: usize) -> ComponentResult<()> {
        Ok(())
    }

    /// Publish this component's parameters into the output row.
    fn add_outputs(&self, _out: &mut OutputRow) {}

    /// Gas-path connectivity, `None` for non-gas-path components.
    fn gaspath_link(&self) -> Option<GaspathLink> {
        None
    }
}
