//! Two-spool turboshaft: free gas generator, constant-speed power turbine.

mod common;

use common::*;
use gp_components::{
    Ambient, AmbientConditions, Combustor, Component, Compressor, Control, Duct, ExhaustDiffuser,
    FuelSpec, Inlet, IsaAtmosphere, SpeedMode, SweepSpec, Turbine, TurbineKind,
};
use gp_engine::{Engine, EngineConfig};
use gp_thermo::{Composition, Species};

fn turboshaft_engine() -> (Engine, Vec<usize>, TurbojetMaps, TurbojetMaps) {
    // Separate map files for the two spools' machines.
    let gg_maps = TurbojetMaps::create();
    let pt_maps = TurbojetMaps::create();

    let fuel_control = Control::new(
        "Control",
        SweepSpec {
            dp_value: 2.5,
            start: 2.5,
            end: 2.2,
            step: -0.1,
            controlled_param: None,
        },
    )
    .unwrap();
    let points = fuel_control.od_input_points();
    let link = fuel_control.link();

    let components: Vec<Box<dyn Component>> = vec![
        Box::new(Ambient::new(
            "Ambient",
            0,
            AmbientConditions::default(),
            Box::new(IsaAtmosphere),
        )),
        Box::new(fuel_control),
        Box::new(Inlet::new("Inlet1", 0, 2, 100.0, 0.9901)),
        Box::new(
            Compressor::new(
                "compressor1",
                gg_maps.compressor.path(),
                2,
                3,
                1,
                4_780.0,
                0.915,
                1.0,
                0.60,
                20.0,
                SpeedMode::Gg,
                vec![],
            )
            .unwrap(),
        ),
        Box::new(
            Combustor::new(
                "combustor1",
                3,
                4,
                2.5,
                None,
                0.95,
                0.9998,
                FuelSpec::Composition {
                    composition: Composition::pure(Species::CH4),
                    t_fuel: Some(458.15),
                },
                None,
                Some(link),
            )
            .unwrap(),
        ),
        Box::new(
            Turbine::new(
                "GGT",
                gg_maps.turbine.path(),
                4,
                45,
                1,
                4_780.0,
                0.80,
                0.90,
                0.50,
                0.99,
                TurbineKind::Gg,
                vec![],
            )
            .unwrap(),
        ),
        Box::new(
            Turbine::new(
                "PT",
                pt_maps.turbine.path(),
                45,
                5,
                2,
                3_000.0,
                0.91,
                0.90,
                0.50,
                0.99,
                TurbineKind::Pt,
                vec![],
            )
            .unwrap(),
        ),
        Box::new(Duct::new("exhduct", 5, 7, 0.95)),
        Box::new(ExhaustDiffuser::new("exhaust1", 7, 9, 0.95)),
    ];

    (
        Engine::new("turboshaft", components, EngineConfig::default()),
        points,
        gg_maps,
        pt_maps,
    )
}

#[test]
fn design_point_sizes_the_power_turbine_to_ambient() {
    let (mut engine, _points, _gg, _pt) = turboshaft_engine();
    engine.run_design_point().unwrap();

    // States: inlet, GG speed, compressor beta, two turbine betas.
    // Errors: compressor flow, GGT flow + shaft power, PT flow, diffuser
    // back pressure.
    assert_eq!(engine.context().states.len(), 5);
    assert_eq!(engine.context().errors.len(), 5);

    let ctx = engine.context();
    // The PT expands so that the duct and diffuser design losses land on
    // ambient static pressure.
    let p5 = ctx.station(5).unwrap().p_pa();
    assert!(
        (p5 * 0.95 * 0.95 - ctx.ambient.psa).abs() / ctx.ambient.psa < 1e-9,
        "P5 = {p5}"
    );

    let row = &engine.output_table().rows()[0];
    // The gas-generator spool balances; the PT shaft carries the output.
    assert!(row.num("PW1").unwrap().abs() < 1e-6);
    assert!(row.num("PW2").unwrap() > 1_000.0, "PW2 = {:?}", row.num("PW2"));
}

#[test]
fn scenario_e_fuel_sweep_on_the_free_spool() {
    init_tracing();
    let (mut engine, points, _gg, _pt) = turboshaft_engine();
    assert_eq!(points.len(), 4);

    engine.run_design_point().unwrap();
    let summary = engine.run_off_design(&points).unwrap();
    assert_eq!(summary.converged, 4, "failed points: {}", summary.failed);

    let table = engine.output_table();
    let od_rows = &table.rows()[1..];

    // Throttling back the gas generator: its free speed and the delivered
    // shaft power both fall monotonically with fuel flow, while the PT
    // speed stays prescribed.
    let n_gg: Vec<f64> = od_rows.iter().map(|r| r.num("N1").unwrap()).collect();
    let pw_pt: Vec<f64> = od_rows.iter().map(|r| r.num("PW2").unwrap()).collect();
    assert_monotone_decreasing(&n_gg, "gas generator speed");
    assert_monotone_decreasing(&pw_pt, "power turbine output");
    for row in od_rows {
        // Prescribed-speed spool: no speed state, output power non-zero.
        assert!((row.num("N2").unwrap() - 3_000.0).abs() < 1e-9);
        assert!(row.num("PW2").unwrap() > 0.0);
        // The free spool stays balanced within tolerance (kW scale).
        let pw_des_ggt = table.rows()[0].num("PW_GGT").unwrap();
        assert!(row.num("PW1").unwrap().abs() * 1000.0 <= 1.1e-4 * pw_des_ggt);
    }
}
