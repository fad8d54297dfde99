//! Sweep controls: open-loop input schedules and closed-loop set points.

use crate::component::Component;
use crate::context::{Mode, SimContext};
use crate::error::{ComponentError, ComponentResult};
use gp_results::OutputRow;

/// A control's sweep definition.
///
/// Open-loop (no `controlled_param`): the swept values feed the consuming
/// component's input directly (a fuel flow, an exit temperature).
/// Closed-loop: the swept values are set points of the named output
/// parameter, and the control adjusts a free state multiplying the design
/// input until the set point is met.
#[derive(Debug, Clone)]
pub struct SweepSpec {
    /// Design-point input value of the consuming component.
    pub dp_value: f64,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    /// Output-dictionary key of the controlled parameter, e.g. "N1%".
    pub controlled_param: Option<String>,
}

/// Identity handed to consuming components at model assembly.
#[derive(Debug, Clone)]
pub struct ControlLink {
    pub name: String,
    pub closed_loop: bool,
}

pub struct Control {
    name: String,
    spec: SweepSpec,
    istate_control: Option<usize>,
    ierror_control: Option<usize>,
    dp_controlled_value: f64,
    input_value: f64,
    demand: Option<f64>,
}

impl Control {
    pub fn new(name: impl Into<String>, spec: SweepSpec) -> ComponentResult<Self> {
        let name = name.into();
        if spec.step == 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: sweep step must be non-zero"),
            });
        }
        if (spec.end - spec.start) * spec.step < 0.0 {
            return Err(ComponentError::Config {
                what: format!("{name}: sweep step sign does not reach the end value"),
            });
        }
        Ok(Self {
            name,
            input_value: spec.dp_value,
            spec,
            istate_control: None,
            ierror_control: None,
            dp_controlled_value: 0.0,
            demand: None,
        })
    }

    /// The off-design point indices of this control's sweep.
    pub fn od_input_points(&self) -> Vec<usize> {
        let count =
            ((self.spec.end - self.spec.start) / self.spec.step).abs().round() as usize + 1;
        (0..count).collect()
    }

    /// Link for the component consuming this control's input.
    pub fn link(&self) -> ControlLink {
        ControlLink {
            name: self.name.clone(),
            closed_loop: self.spec.controlled_param.is_some(),
        }
    }

    fn swept_value(&self, point: usize) -> f64 {
        self.spec.start + point as f64 * self.spec.step
    }
}

impl Component for Control {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, point: usize) -> ComponentResult<()> {
        self.input_value = match mode {
            Mode::Dp => self.spec.dp_value,
            Mode::Od => match &self.spec.controlled_param {
                // Open loop: the sweep drives the input directly.
                None => self.swept_value(point),
                // Closed loop: the input is iterated through its state.
                Some(_) => {
                    self.spec.dp_value * ctx.state(self.istate_control, "control input state")?
                }
            },
        };
        ctx.control_values
            .insert(self.name.clone(), self.input_value);
        Ok(())
    }

    fn post_run(&mut self, ctx: &mut SimContext, mode: Mode, point: usize) -> ComponentResult<()> {
        let Some(param) = self.spec.controlled_param.clone() else {
            return Ok(());
        };
        match mode {
            Mode::Dp => {
                self.istate_control = Some(ctx.push_state());
                self.ierror_control = Some(ctx.push_error());
                self.dp_controlled_value =
                    ctx.outputs
                        .num(&param)
                        .ok_or_else(|| ComponentError::MissingOutput {
                            name: param.clone(),
                        })?;
            }
            Mode::Od => {
                let demand = self.swept_value(point);
                self.demand = Some(demand);
                let actual = ctx
                    .outputs
                    .num(&param)
                    .ok_or_else(|| ComponentError::MissingOutput { name: param })?;
                // The DP value of the controlled parameter can be zero
                // (net thrust at static conditions); guard the divide.
                let denom = if self.dp_controlled_value.abs() < 1e-9 {
                    1.0
                } else {
                    self.dp_controlled_value
                };
                ctx.set_error(
                    self.ierror_control,
                    "control set point",
                    (demand - actual) / denom,
                )?;
            }
        }
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        match self.demand {
            Some(demand) => out.set(&format!("Control_input_{}", self.name), demand),
            None => out.set_text(&format!("Control_input_{}", self.name), ""),
        }
        out.set(&format!("Control_output_{}", self.name), self.input_value);
    }
}
