//! Adaptive-model control: tunes map health modifiers onto test data.

use crate::component::Component;
use crate::context::{MapModKind, Mode, SimContext};
use crate::error::{ComponentError, ComponentResult};
use gp_results::{MeasurementTable, OutputRow};

/// How the measured power setting drives the model.
#[derive(Debug, Clone)]
pub enum PowerSetting {
    /// Command the component's fuel flow directly from the `Wf` column.
    FuelFlow { component: String },
    /// Match a measured speed parameter (e.g. "N1%"): the fuel flow is the
    /// measured `Wf` times a free scale state, closed by the speed
    /// residual.
    SpeedPercent { component: String, param: String },
}

/// One map health modifier opened up as a free state.
#[derive(Debug, Clone)]
pub struct MapModTarget {
    /// Map key as registered by the owning component (component name, or
    /// `name.core` / `name.duct` for a fan side).
    pub map_key: String,
    pub kind: MapModKind,
    /// Allowed deviation band in percent, e.g. (-20.0, 20.0).
    pub bounds_pct: (f64, f64),
}

/// A measured parameter matched by the tuner, with a residual weight.
#[derive(Debug, Clone)]
pub struct MeasuredParam {
    /// Output-dictionary key, which must equal the CSV column name.
    pub name: String,
    pub tolerance: f64,
}

/// Reads a table of measured operating points and registers one state and
/// one residual per declared map modifier: the solver then finds the
/// modifier values reproducing the measurements. Out-of-band modifier
/// values are discouraged with a quadratic penalty on the whole residual
/// vector.
pub struct AmControl {
    name: String,
    table: MeasurementTable,
    power: PowerSetting,
    /// Name of the ambient component receiving condition overrides.
    ambient_component: String,
    /// Measurement columns applied as ambient-condition overrides.
    ambient_params: Vec<String>,
    measured: Vec<MeasuredParam>,
    targets: Vec<MapModTarget>,

    istate_wf: Option<usize>,
    ierror_power: Option<usize>,
    mod_states: Vec<usize>,
    mod_errors: Vec<usize>,
    measured_dp: Vec<f64>,
    power_dp: f64,
    /// Last applied modifier values, for outputs.
    applied: Vec<f64>,
}

impl AmControl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        table: MeasurementTable,
        power: PowerSetting,
        ambient_component: impl Into<String>,
        ambient_params: Vec<String>,
        measured: Vec<MeasuredParam>,
        targets: Vec<MapModTarget>,
    ) -> ComponentResult<Self> {
        let name = name.into();
        if measured.len() != targets.len() {
            return Err(ComponentError::Config {
                what: format!(
                    "{name}: need as many measured parameters as map modifiers ({} vs {})",
                    measured.len(),
                    targets.len()
                ),
            });
        }
        if !table.has_column("Wf") {
            return Err(ComponentError::Config {
                what: format!("{name}: measurement table lacks the 'Wf' column"),
            });
        }
        for param in measured.iter().map(|m| &m.name).chain(ambient_params.iter()) {
            if !table.has_column(param) {
                return Err(ComponentError::Config {
                    what: format!("{name}: measurement table lacks column '{param}'"),
                });
            }
        }
        if let PowerSetting::SpeedPercent { param, .. } = &power {
            if !table.has_column(param) {
                return Err(ComponentError::Config {
                    what: format!("{name}: measurement table lacks column '{param}'"),
                });
            }
        }
        let applied = vec![1.0; targets.len()];
        Ok(Self {
            name,
            table,
            power,
            ambient_component: ambient_component.into(),
            ambient_params,
            measured,
            targets,
            istate_wf: None,
            ierror_power: None,
            mod_states: Vec::new(),
            mod_errors: Vec::new(),
            measured_dp: Vec::new(),
            power_dp: 0.0,
            applied,
        })
    }

    /// The sweep points are the measurement rows, in file order.
    pub fn od_input_points(&self) -> Vec<usize> {
        self.table.points().to_vec()
    }
}

impl Component for AmControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext, mode: Mode, point: usize) -> ComponentResult<()> {
        match mode {
            Mode::Dp => {
                // Clean baseline: all modifiers at one.
                for (i, target) in self.targets.iter().enumerate() {
                    ctx.set_map_mod(&target.map_key, target.kind, 1.0);
                    self.applied[i] = 1.0;
                }
                if matches!(self.power, PowerSetting::SpeedPercent { .. }) {
                    self.istate_wf = Some(ctx.push_state());
                    self.ierror_power = Some(ctx.push_error());
                }
            }
            Mode::Od => {
                for param in &self.ambient_params {
                    let value = self.table.value(point, param)?;
                    ctx.overrides
                        .insert((self.ambient_component.clone(), param.clone()), value);
                }

                match &self.power {
                    PowerSetting::FuelFlow { component } => {
                        let wf = self.table.value(point, "Wf")?;
                        ctx.overrides
                            .insert((component.clone(), "Wf".to_string()), wf);
                    }
                    PowerSetting::SpeedPercent { component, .. } => {
                        let wf_meas = self.table.value(point, "Wf")?;
                        let scale = ctx.state(self.istate_wf, "adaptive fuel scale")?;
                        ctx.overrides
                            .insert((component.clone(), "Wf".to_string()), wf_meas * scale);
                    }
                }

                for (i, target) in self.targets.iter().enumerate() {
                    let slot = *self.mod_states.get(i).ok_or(
                        ComponentError::SlotNotRegistered {
                            what: "map modifier state before design pass",
                        },
                    )?;
                    let value = ctx.state(Some(slot), "map modifier state")?;
                    ctx.set_map_mod(&target.map_key, target.kind, value);
                    self.applied[i] = value;
                    tracing::trace!(
                        map = %target.map_key,
                        kind = target.kind.tag(),
                        value,
                        "map health modifier applied"
                    );
                }
            }
        }
        Ok(())
    }

    fn post_run(&mut self, ctx: &mut SimContext, mode: Mode, point: usize) -> ComponentResult<()> {
        match mode {
            Mode::Dp => {
                self.mod_states.clear();
                self.mod_errors.clear();
                for target in &self.targets {
                    ctx.set_map_mod(&target.map_key, target.kind, 1.0);
                    self.mod_states.push(ctx.push_state());
                    self.mod_errors.push(ctx.push_error());
                }
                self.measured_dp = self
                    .measured
                    .iter()
                    .map(|m| {
                        ctx.outputs
                            .num(&m.name)
                            .ok_or_else(|| ComponentError::MissingOutput {
                                name: m.name.clone(),
                            })
                    })
                    .collect::<ComponentResult<Vec<_>>>()?;
                if let PowerSetting::SpeedPercent { param, .. } = &self.power {
                    self.power_dp =
                        ctx.outputs
                            .num(param)
                            .ok_or_else(|| ComponentError::MissingOutput {
                                name: param.clone(),
                            })?;
                }
            }
            Mode::Od => {
                for (i, mp) in self.measured.iter().enumerate() {
                    let measured = self.table.value(point, &mp.name)?;
                    let model =
                        ctx.outputs
                            .num(&mp.name)
                            .ok_or_else(|| ComponentError::MissingOutput {
                                name: mp.name.clone(),
                            })?;
                    ctx.set_error(
                        Some(self.mod_errors[i]),
                        "adaptive measured parameter",
                        mp.tolerance * (model - measured) / self.measured_dp[i],
                    )?;
                }

                // Soft bounds: out-of-band modifier states penalize every
                // residual so the solver backs away regardless of which
                // equation it is working on.
                const PENALTY: f64 = 1e3;
                for (i, target) in self.targets.iter().enumerate() {
                    let value = ctx.state(Some(self.mod_states[i]), "map modifier state")?;
                    let lower = 1.0 + target.bounds_pct.0 / 100.0;
                    let upper = 1.0 + target.bounds_pct.1 / 100.0;
                    let excess = if value < lower {
                        lower - value
                    } else if value > upper {
                        value - upper
                    } else {
                        continue;
                    };
                    let penalty = excess * excess * PENALTY;
                    for error in ctx.errors.iter_mut() {
                        *error += penalty;
                    }
                }

                if let PowerSetting::SpeedPercent { param, .. } = &self.power {
                    let measured = self.table.value(point, param)?;
                    let model =
                        ctx.outputs
                            .num(param)
                            .ok_or_else(|| ComponentError::MissingOutput {
                                name: param.clone(),
                            })?;
                    let denom = if self.power_dp.abs() < 1e-9 {
                        1.0
                    } else {
                        self.power_dp
                    };
                    ctx.set_error(
                        self.ierror_power,
                        "adaptive power setting",
                        (measured - model) / denom,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn add_outputs(&self, out: &mut OutputRow) {
        for (target, value) in self.targets.iter().zip(&self.applied) {
            out.set(
                &format!("{}_SF_{}_deter", target.map_key, target.kind.tag()),
                *value,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Point,Wf,N1%,T3,P3,T5
0,0.380,100.0,548.0,698000,948.0
1,0.330,95.5,531.0,642000,921.0
";

    fn targets() -> Vec<MapModTarget> {
        vec![
            MapModTarget {
                map_key: "compressor1".to_string(),
                kind: MapModKind::Eta,
                bounds_pct: (-20.0, 20.0),
            },
            MapModTarget {
                map_key: "compressor1".to_string(),
                kind: MapModKind::Wc,
                bounds_pct: (-20.0, 20.0),
            },
        ]
    }

    fn measured() -> Vec<MeasuredParam> {
        vec![
            MeasuredParam {
                name: "T3".to_string(),
                tolerance: 1.0,
            },
            MeasuredParam {
                name: "P3".to_string(),
                tolerance: 1.0,
            },
        ]
    }

    fn am(power: PowerSetting) -> AmControl {
        AmControl::new(
            "AMcontrol",
            MeasurementTable::from_csv_str(CSV).unwrap(),
            power,
            "Ambient",
            vec![],
            measured(),
            targets(),
        )
        .unwrap()
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let result = AmControl::new(
            "AMcontrol",
            MeasurementTable::from_csv_str(CSV).unwrap(),
            PowerSetting::FuelFlow {
                component: "combustor1".to_string(),
            },
            "Ambient",
            vec![],
            measured(),
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_measurement_column_is_rejected() {
        let result = AmControl::new(
            "AMcontrol",
            MeasurementTable::from_csv_str(CSV).unwrap(),
            PowerSetting::FuelFlow {
                component: "combustor1".to_string(),
            },
            "Ambient",
            vec![],
            vec![MeasuredParam {
                name: "EGT".to_string(),
                tolerance: 1.0,
            }],
            targets()[..1].to_vec(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn design_pass_registers_one_state_per_modifier() {
        let mut ctx = SimContext::new();
        let mut am = am(PowerSetting::FuelFlow {
            component: "combustor1".to_string(),
        });
        am.run(&mut ctx, Mode::Dp, 0).unwrap();
        ctx.outputs.set("T3", 548.0);
        ctx.outputs.set("P3", 698_000.0);
        am.post_run(&mut ctx, Mode::Dp, 0).unwrap();

        assert_eq!(ctx.states.len(), 2);
        assert_eq!(ctx.errors.len(), 2);
        assert_eq!(ctx.map_mod("compressor1", MapModKind::Eta), 1.0);
    }

    #[test]
    fn fuel_flow_power_setting_writes_the_override() {
        let mut ctx = SimContext::new();
        let mut am = am(PowerSetting::FuelFlow {
            component: "combustor1".to_string(),
        });
        am.run(&mut ctx, Mode::Dp, 0).unwrap();
        ctx.outputs.set("T3", 548.0);
        ctx.outputs.set("P3", 698_000.0);
        am.post_run(&mut ctx, Mode::Dp, 0).unwrap();

        ctx.states[0] = 0.97; // eta modifier
        am.run(&mut ctx, Mode::Od, 1).unwrap();
        assert_eq!(ctx.override_value("combustor1", "Wf"), Some(0.330));
        assert_eq!(ctx.map_mod("compressor1", MapModKind::Eta), 0.97);
    }

    #[test]
    fn measured_residuals_are_weighted_and_normalized() {
        let mut ctx = SimContext::new();
        let mut am = am(PowerSetting::FuelFlow {
            component: "combustor1".to_string(),
        });
        am.run(&mut ctx, Mode::Dp, 0).unwrap();
        ctx.outputs.set("T3", 548.0);
        ctx.outputs.set("P3", 698_000.0);
        am.post_run(&mut ctx, Mode::Dp, 0).unwrap();

        am.run(&mut ctx, Mode::Od, 1).unwrap();
        // Model reads 536 K where the rig measured 531 K.
        ctx.outputs.set("T3", 536.0);
        ctx.outputs.set("P3", 642_000.0);
        am.post_run(&mut ctx, Mode::Od, 1).unwrap();
        assert!((ctx.errors[0] - (536.0 - 531.0) / 548.0).abs() < 1e-12);
        assert_eq!(ctx.errors[1], 0.0);
    }

    #[test]
    fn out_of_band_modifiers_penalize_every_residual() {
        let mut ctx = SimContext::new();
        let mut am = am(PowerSetting::FuelFlow {
            component: "combustor1".to_string(),
        });
        am.run(&mut ctx, Mode::Dp, 0).unwrap();
        ctx.outputs.set("T3", 548.0);
        ctx.outputs.set("P3", 698_000.0);
        am.post_run(&mut ctx, Mode::Dp, 0).unwrap();

        ctx.states[0] = 1.5; // far beyond +20%
        am.run(&mut ctx, Mode::Od, 1).unwrap();
        ctx.outputs.set("T3", 531.0);
        ctx.outputs.set("P3", 642_000.0);
        am.post_run(&mut ctx, Mode::Od, 1).unwrap();
        assert!(ctx.errors.iter().all(|e| *e > 1.0));
    }

    #[test]
    fn speed_power_setting_scales_the_measured_fuel_flow() {
        let mut ctx = SimContext::new();
        let mut am = am(PowerSetting::SpeedPercent {
            component: "combustor1".to_string(),
            param: "N1%".to_string(),
        });
        am.run(&mut ctx, Mode::Dp, 0).unwrap();
        ctx.outputs.set("T3", 548.0);
        ctx.outputs.set("P3", 698_000.0);
        ctx.outputs.set("N1%", 100.0);
        am.post_run(&mut ctx, Mode::Dp, 0).unwrap();
        // Wf scale + two modifiers.
        assert_eq!(ctx.states.len(), 3);
        assert_eq!(ctx.errors.len(), 3);

        ctx.states[0] = 1.02;
        am.run(&mut ctx, Mode::Od, 1).unwrap();
        let wf = ctx.override_value("combustor1", "Wf").unwrap();
        assert!((wf - 0.330 * 1.02).abs() < 1e-12);

        ctx.outputs.set("T3", 531.0);
        ctx.outputs.set("P3", 642_000.0);
        ctx.outputs.set("N1%", 96.0);
        am.post_run(&mut ctx, Mode::Od, 1).unwrap();
        assert!((ctx.errors[0] - (95.5 - 96.0) / 100.0).abs() < 1e-12);
    }
}
