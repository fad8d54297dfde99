//! Engine orchestration: design-point pass and off-design sweeps.

use crate::error::{EngineError, EngineResult};
use gp_components::{Component, Mode, SimContext};
use gp_results::{OutputTable, RunManifest};
use gp_solver::{NewtonKrylovConfig, SolverError, newton_krylov};
use nalgebra::DVector;
use std::collections::HashMap;

/// Process-wide simulation configuration.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Convergence threshold on the residual max-norm (relative, since
    /// all residuals are normalized by design quantities).
    pub error_tolerance: f64,
    /// Outer Newton-Krylov iteration cap per off-design point.
    pub max_iterations: usize,
    /// Record every N-th off-design point into the output table.
    pub output_interval: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_tolerance: 1e-4,
            max_iterations: 50,
            output_interval: 1,
        }
    }
}

/// Outcome of an off-design sweep.
#[derive(Clone, Copy, Debug, Default)]
pub struct OdSummary {
    pub attempted: usize,
    pub converged: usize,
    pub failed: usize,
}

/// One assembled engine model: ordered components plus their shared
/// context. Several engines can run independently in one process.
pub struct Engine {
    name: String,
    components: Vec<Box<dyn Component>>,
    ctx: SimContext,
    config: EngineConfig,
    table: OutputTable,
}

impl Engine {
    pub fn new(
        name: impl Into<String>,
        components: Vec<Box<dyn Component>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            name: name.into(),
            components,
            ctx: SimContext::new(),
            config,
            table: OutputTable::new(),
        }
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn output_table(&self) -> &OutputTable {
        &self.table
    }

    pub fn manifest(&self, summary: OdSummary) -> RunManifest {
        RunManifest::new(
            self.name.clone(),
            1,
            summary.attempted,
            summary.converged,
            self.config.error_tolerance,
        )
    }

    /// Product of downstream declared design pressure ratios per station,
    /// following the chain of gas-path links. Power turbines use this to
    /// size their design expansion to ambient static pressure.
    fn precompute_pr_chains(&mut self) {
        let links: Vec<_> = self
            .components
            .iter()
            .filter_map(|c| c.gaspath_link())
            .collect();
        let by_inlet: HashMap<_, _> = links
            .iter()
            .map(|link| (link.station_in, (link.station_out, link.pr_des)))
            .collect();

        self.ctx.pr_des_to_ambient.clear();
        for link in &links {
            let mut product = 1.0;
            let mut station = link.station_out;
            for _ in 0..links.len() {
                match by_inlet.get(&station) {
                    Some(&(next, pr_des)) => {
                        product *= pr_des;
                        station = next;
                    }
                    None => break,
                }
            }
            self.ctx.pr_des_to_ambient.insert(link.station_out, product);
        }
    }

    /// One forward walk: run every component in order (each immediately
    /// publishing its outputs), add the system totals, then the post-run
    /// hooks where closed-loop controls evaluate their equations. Returns
    /// the residual vector.
    fn evaluate(&mut self, mode: Mode, point: usize, states: &[f64]) -> EngineResult<Vec<f64>> {
        self.ctx.begin_evaluation(states);
        self.ctx.outputs.set("Point/Time", point as f64);
        self.ctx.outputs.set_text(
            "Mode",
            match mode {
                Mode::Dp => "DP",
                Mode::Od => "OD",
            },
        );

        for comp in &mut self.components {
            comp.run(&mut self.ctx, mode, point)
                .map_err(|source| match mode {
                    Mode::Dp => EngineError::DesignPoint {
                        component: comp.name().to_string(),
                        source,
                    },
                    Mode::Od => EngineError::Evaluation {
                        component: comp.name().to_string(),
                        source,
                    },
                })?;
            comp.add_outputs(&mut self.ctx.outputs);
        }

        self.add_system_outputs();

        for comp in &mut self.components {
            comp.post_run(&mut self.ctx, mode, point)
                .map_err(|source| match mode {
                    Mode::Dp => EngineError::DesignPoint {
                        component: comp.name().to_string(),
                        source,
                    },
                    Mode::Od => EngineError::Evaluation {
                        component: comp.name().to_string(),
                        source,
                    },
                })?;
        }

        Ok(self.ctx.errors.clone())
    }

    fn add_system_outputs(&mut self) {
        let totals = self.ctx.totals;
        let out = &mut self.ctx.outputs;
        out.set("FG", totals.fg / 1000.0);
        out.set("FN", (totals.fg - totals.rd) / 1000.0);
        out.set("RD", totals.rd / 1000.0);
        out.set("WF", totals.wf);
        for shaft in &self.ctx.shafts {
            out.set(&format!("PW{}", shaft.number), shaft.pw_sum / 1000.0);
        }
    }

    fn record_row(&mut self, comment: &str) {
        let mut row = self.ctx.outputs.clone();
        row.set_text("Comment", comment);
        self.table.push_row(row);
    }

    /// Design-point pass: registration starts from scratch, every
    /// component sizes itself, and the single DP row is recorded.
    pub fn run_design_point(&mut self) -> EngineResult<()> {
        self.ctx.reset_design();
        self.precompute_pr_chains();
        match self.evaluate(Mode::Dp, 0, &[]) {
            Ok(_) => {
                tracing::info!(
                    engine = %self.name,
                    states = self.ctx.states.len(),
                    errors = self.ctx.errors.len(),
                    "design point sized"
                );
                self.record_row("");
                Ok(())
            }
            Err(e) => {
                self.record_row("Exception error");
                Err(e)
            }
        }
    }

    /// Off-design sweep over the given point sequence, in order.
    ///
    /// The state vector carries over from point to point (and from the
    /// design pass, where every state starts at one); this warm start
    /// along the operating line is what keeps the matching robust, so the
    /// order of `points` is part of the model definition. Failed points
    /// are flagged and the sweep continues with the state vector as the
    /// failing solve left it.
    pub fn run_off_design(&mut self, points: &[usize]) -> EngineResult<OdSummary> {
        if self.ctx.states.len() != self.ctx.errors.len() {
            return Err(EngineError::Solver(SolverError::Numeric {
                what: format!(
                    "model is not square: {} states against {} residuals",
                    self.ctx.states.len(),
                    self.ctx.errors.len()
                ),
            }));
        }
        let nk_config = NewtonKrylovConfig {
            tolerance: self.config.error_tolerance,
            max_iterations: self.config.max_iterations,
            ..Default::default()
        };
        let mut summary = OdSummary::default();

        for (sweep_index, &point) in points.iter().enumerate() {
            summary.attempted += 1;
            let x0 = DVector::from_vec(self.ctx.states.clone());
            let solve = newton_krylov(
                x0,
                |x| {
                    self.evaluate(Mode::Od, point, x.as_slice())
                        .map(DVector::from_vec)
                        .map_err(|e| SolverError::Residual {
                            what: e.to_string(),
                        })
                },
                &nk_config,
            );

            let comment = match solve {
                Ok(result) => {
                    // Refresh the context at the accepted state so the
                    // recorded outputs and the warm start match it.
                    match self.evaluate(Mode::Od, point, result.x.as_slice()) {
                        Ok(_) if result.converged => {
                            summary.converged += 1;
                            tracing::info!(
                                point,
                                iterations = result.iterations,
                                residual = result.residual_norm,
                                "operating point converged"
                            );
                            ""
                        }
                        Ok(_) => {
                            summary.failed += 1;
                            tracing::warn!(
                                point,
                                residual = result.residual_norm,
                                "operating point not converged after {} iterations",
                                result.iterations
                            );
                            "Not converged"
                        }
                        Err(e) => {
                            summary.failed += 1;
                            tracing::warn!(point, error = %e, "operating point raised");
                            "Exception error"
                        }
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(point, error = %e, "operating point raised");
                    "Exception error"
                }
            };

            if sweep_index % self.config.output_interval.max(1) == 0 {
                self.record_row(comment);
            }
        }

        tracing::info!(
            engine = %self.name,
            converged = summary.converged,
            failed = summary.failed,
            "off-design sweep finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gp_components::component::GaspathLink;
    use gp_components::{ComponentResult, Mode};
    use gp_results::OutputRow;

    /// Minimal algebraic component: one state, one residual
    /// (state * scale - target) / target.
    struct ScalarMatcher {
        name: String,
        scale: f64,
        target: f64,
        istate: Option<usize>,
        ierror: Option<usize>,
        value: f64,
    }

    impl ScalarMatcher {
        fn new(name: &str, scale: f64, target: f64) -> Self {
            Self {
                name: name.to_string(),
                scale,
                target,
                istate: None,
                ierror: None,
                value: 0.0,
            }
        }
    }

    impl Component for ScalarMatcher {
        fn name(&self) -> &str {
            &self.name
        }

        fn run(&mut self, ctx: &mut SimContext, mode: Mode, point: usize) -> ComponentResult<()> {
            match mode {
                Mode::Dp => {
                    self.istate = Some(ctx.push_state());
                    self.ierror = Some(ctx.push_error());
                    self.value = self.scale;
                }
                Mode::Od => {
                    self.value = ctx.state(self.istate, "matcher state")? * self.scale;
                    // Target drifts with the point index.
                    let target = self.target + point as f64;
                    ctx.set_error(
                        self.ierror,
                        "matcher residual",
                        (self.value - target) / self.target,
                    )?;
                }
            }
            Ok(())
        }

        fn add_outputs(&self, out: &mut OutputRow) {
            out.set(&format!("Value_{}", self.name), self.value);
        }

        fn gaspath_link(&self) -> Option<GaspathLink> {
            None
        }
    }

    #[test]
    fn design_point_registers_and_records_one_row() {
        let mut engine = Engine::new(
            "test",
            vec![Box::new(ScalarMatcher::new("a", 10.0, 10.0))],
            EngineConfig::default(),
        );
        engine.run_design_point().unwrap();
        assert_eq!(engine.context().states, vec![1.0]);
        assert_eq!(engine.output_table().len(), 1);
        let row = &engine.output_table().rows()[0];
        assert_eq!(row.num("Value_a"), Some(10.0));
    }

    #[test]
    fn off_design_sweep_converges_every_point_with_warm_start() {
        let mut engine = Engine::new(
            "test",
            vec![
                Box::new(ScalarMatcher::new("a", 10.0, 10.0)),
                Box::new(ScalarMatcher::new("b", 5.0, 5.0)),
            ],
            EngineConfig::default(),
        );
        engine.run_design_point().unwrap();
        let summary = engine.run_off_design(&[0, 1, 2, 3]).unwrap();
        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.converged, 4);
        assert_eq!(summary.failed, 0);

        // DP row + 4 OD rows, last point solved to its drifted target.
        assert_eq!(engine.output_table().len(), 5);
        let last = &engine.output_table().rows()[4];
        assert!((last.num("Value_a").unwrap() - 13.0).abs() < 1e-2);
        assert!((last.num("Value_b").unwrap() - 8.0).abs() < 1e-2);
        // Warm start: final states moved away from one.
        assert!(engine.context().states[0] > 1.0);
    }

    #[test]
    fn output_interval_strides_the_table() {
        let mut engine = Engine::new(
            "test",
            vec![Box::new(ScalarMatcher::new("a", 10.0, 10.0))],
            EngineConfig {
                output_interval: 2,
                ..Default::default()
            },
        );
        engine.run_design_point().unwrap();
        engine.run_off_design(&[0, 1, 2, 3]).unwrap();
        // DP + points 0 and 2.
        assert_eq!(engine.output_table().len(), 3);
    }

    #[test]
    fn pr_chain_products_follow_the_links() {
        struct LinkOnly {
            name: String,
            link: GaspathLink,
        }
        impl Component for LinkOnly {
            fn name(&self) -> &str {
                &self.name
            }
            fn run(
                &mut self,
                _ctx: &mut SimContext,
                _mode: Mode,
                _point: usize,
            ) -> ComponentResult<()> {
                Ok(())
            }
            fn gaspath_link(&self) -> Option<GaspathLink> {
                Some(self.link)
            }
        }

        let mut engine = Engine::new(
            "chain",
            vec![
                Box::new(LinkOnly {
                    name: "turbine".to_string(),
                    link: GaspathLink {
                        station_in: 4,
                        station_out: 5,
                        pr_des: 1.0,
                    },
                }),
                Box::new(LinkOnly {
                    name: "duct".to_string(),
                    link: GaspathLink {
                        station_in: 5,
                        station_out: 7,
                        pr_des: 0.95,
                    },
                }),
                Box::new(LinkOnly {
                    name: "diffuser".to_string(),
                    link: GaspathLink {
                        station_in: 7,
                        station_out: 9,
                        pr_des: 0.9,
                    },
                }),
            ],
            EngineConfig::default(),
        );
        engine.run_design_point().unwrap();
        let chain = &engine.context().pr_des_to_ambient;
        // Downstream of the turbine: duct times diffuser.
        assert!((chain[&5] - 0.95 * 0.9).abs() < 1e-12);
        assert!((chain[&7] - 0.9).abs() < 1e-12);
        assert!((chain[&9] - 1.0).abs() < 1e-12);
    }
}
