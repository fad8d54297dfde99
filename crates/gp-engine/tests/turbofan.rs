//! Two-spool turbofan at altitude with exit-temperature control.

mod common;

use common::*;
use gp_components::fan::FanSideSpec;
use gp_components::{
    Ambient, AmbientConditions, Combustor, Component, Compressor, Control, Duct, ExhaustNozzle,
    Fan, Inlet, IsaAtmosphere, Mode, SpeedMode, SweepSpec, Turbine, TurbineKind,
};
use gp_engine::{Engine, EngineConfig};
use tempfile::NamedTempFile;

/// A fan-pressure-ratio class compressor map for the fan sides.
const FAN_MAP: &str = "\
Synthetic fan map.
99 1 SYNTHETIC FAN
REYNOLDS RNI=0.50 f_RNI=0.97 RNI=1.00 f_RNI=1.00
 MASS FLOW
 6.005 0.20 0.40 0.60 0.80
 0.60  0.66  0.64  0.62  0.60
 0.75  0.78  0.76  0.74  0.72
 0.90  0.90  0.88  0.86  0.84
 1.00  0.98  0.96  0.94  0.92
 1.10  1.06  1.04  1.02  1.00
 EFFICIENCY
 6.005 0.20 0.40 0.60 0.80
 0.60  0.80  0.82  0.83  0.81
 0.75  0.82  0.84  0.85  0.83
 0.90  0.84  0.86  0.87  0.85
 1.00  0.85  0.87  0.88  0.86
 1.10  0.84  0.86  0.87  0.85
 PRESSURE RATIO
 6.005 0.20 0.40 0.60 0.80
 0.60  1.14  1.18  1.22  1.26
 0.75  1.30  1.34  1.38  1.42
 0.90  1.50  1.54  1.58  1.62
 1.00  1.66  1.70  1.74  1.78
 1.10  1.82  1.86  1.90  1.94
 SURGE LINE
 2.005 0.60 0.75 0.90 1.05
 1.0   1.30  1.48  1.68  1.90
";

struct TurbofanMaps {
    fan: NamedTempFile,
    hpc: NamedTempFile,
    hpt: NamedTempFile,
    lpt: NamedTempFile,
}

fn turbofan_engine(texit_sweep: SweepSpec) -> (Engine, TurbofanMaps, Vec<usize>) {
    let maps = TurbofanMaps {
        fan: write_map(FAN_MAP),
        hpc: write_map(COMPRESSOR_MAP),
        hpt: write_map(TURBINE_MAP),
        lpt: write_map(TURBINE_MAP),
    };

    let mut ambient = Ambient::new(
        "Ambient",
        0,
        AmbientConditions::default(),
        Box::new(IsaAtmosphere),
    );
    // Design at sea level static, fly the sweep at cruise.
    ambient.set_conditions(
        Mode::Od,
        AmbientConditions {
            altitude_m: 10_000.0,
            mach: 0.8,
            ..Default::default()
        },
    );

    let fuel_control = Control::new("Control", texit_sweep).unwrap();
    let points = fuel_control.od_input_points();
    let link = fuel_control.link();

    let fan_side = |pr_des: f64, eta_des: f64| FanSideSpec {
        map_path: maps.fan.path().to_path_buf(),
        nc_map_des: 1.0,
        beta_map_des: 0.60,
        pr_des,
        eta_des,
    };

    let components: Vec<Box<dyn Component>> = vec![
        Box::new(ambient),
        Box::new(fuel_control),
        Box::new(Inlet::new("Inlet1", 0, 2, 337.0, 1.0)),
        Box::new(
            Fan::new(
                "FAN",
                2,
                25,
                21,
                1,
                4_880.0,
                5.3,
                fan_side(1.74, 0.87),
                fan_side(1.70, 0.86),
            )
            .unwrap(),
        ),
        Box::new(
            Compressor::new(
                "HPC",
                maps.hpc.path(),
                25,
                3,
                2,
                14_000.0,
                0.8433,
                1.0,
                0.60,
                10.9,
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
                1.1,
                Some(1500.0),
                1.0,
                1.0,
                kerosene_lhv(),
                None,
                Some(link),
            )
            .unwrap(),
        ),
        Box::new(
            Turbine::new(
                "HPT",
                maps.hpt.path(),
                4,
                45,
                2,
                14_000.0,
                0.8732,
                0.90,
                0.50,
                1.0,
                TurbineKind::Gg,
                vec![],
            )
            .unwrap(),
        ),
        Box::new(
            Turbine::new(
                "LPT",
                maps.lpt.path(),
                45,
                5,
                1,
                4_480.0,
                0.8682,
                0.90,
                0.50,
                1.0,
                TurbineKind::Gg,
                vec![],
            )
            .unwrap(),
        ),
        Box::new(Duct::new("Exhduct_hot", 5, 7, 1.0)),
        Box::new(ExhaustNozzle::new("HotNozzle", 7, 8, 9, 1.0, 1.0, 1.0).unwrap()),
        Box::new(Duct::new("Exhduct_cold", 21, 23, 1.0)),
        Box::new(ExhaustNozzle::new("ColdNozzle", 23, 18, 19, 1.0, 1.0, 1.0).unwrap()),
    ];

    (
        Engine::new("turbofan", components, EngineConfig::default()),
        maps,
        points,
    )
}

#[test]
fn turbofan_design_point_balances_both_spools() {
    let (mut engine, _maps, _points) = turbofan_engine(SweepSpec {
        dp_value: 1.1,
        start: 1500.0,
        end: 1350.0,
        step: -50.0,
        controlled_param: None,
    });
    engine.run_design_point().unwrap();

    // States: inlet + fan (n, BPR, 2 betas) + HPC (n, beta) + 2 turbine
    // betas. Errors: 2 fan flows + HPC flow + 2x(turbine flow + shaft
    // power) + 2 nozzle continuities.
    assert_eq!(engine.context().states.len(), 9);
    assert_eq!(engine.context().errors.len(), 9);

    let row = &engine.output_table().rows()[0];
    // Both gas-generator shafts closed at the design point.
    assert!(row.num("PW1").unwrap().abs() < 1e-6);
    assert!(row.num("PW2").unwrap().abs() < 1e-6);
    // The commanded exit temperature was met by the fuel iteration.
    let t4 = row.num("T4").unwrap();
    assert!((t4 - 1500.0).abs() < 0.5, "T4 = {t4}");

    // Bypass split at the design ratio.
    let ctx = engine.context();
    let w_core = ctx.station(25).unwrap().mdot_kgps();
    let w_duct = ctx.station(21).unwrap().mdot_kgps();
    assert!((w_duct / w_core - 5.3).abs() < 1e-6);
}

#[test]
fn scenario_d_altitude_texit_sweep() {
    init_tracing();
    let (mut engine, _maps, points) = turbofan_engine(SweepSpec {
        dp_value: 1.1,
        start: 1500.0,
        end: 1350.0,
        step: -50.0,
        controlled_param: None,
    });
    assert_eq!(points.len(), 4);

    engine.run_design_point().unwrap();
    let summary = engine.run_off_design(&points).unwrap();
    assert_eq!(summary.converged, 4, "failed points: {}", summary.failed);

    let table = engine.output_table();
    let od_rows = &table.rows()[1..];

    for row in od_rows {
        // Flying at altitude: gross thrust beats ram drag, net thrust is
        // positive.
        let fg = row.num("FG").unwrap();
        let rd = row.num("RD").unwrap();
        let fn_ = row.num("FN").unwrap();
        assert!(fg > rd, "FG {fg} <= RD {rd}");
        assert!(fn_ > 0.0);

        // Both spools balanced within the solver tolerance.
        assert!(row.num("PW1").unwrap().abs() < 5.0, "PW1 {}", row.num("PW1").unwrap());
        assert!(row.num("PW2").unwrap().abs() < 5.0, "PW2 {}", row.num("PW2").unwrap());

        // Core and bypass flows add up to the inlet flow at convergence.
        let w2 = row.num("W2").unwrap();
        let w25 = row.num("W25").unwrap();
        let w21 = row.num("W21").unwrap();
        assert!(
            ((w25 + w21 - w2) / w2).abs() < 1e-3,
            "split: {w25} + {w21} vs {w2}"
        );
    }

    // Net thrust walks down with the commanded turbine temperature.
    let fn_values: Vec<f64> = od_rows.iter().map(|r| r.num("FN").unwrap()).collect();
    assert_monotone_decreasing(&fn_values, "net thrust");
    let t4_values: Vec<f64> = od_rows.iter().map(|r| r.num("T4").unwrap()).collect();
    assert_monotone_decreasing(&t4_values, "turbine entry temperature");
    // The commanded temperatures were hit.
    for (i, t4) in t4_values.iter().enumerate() {
        let demand = 1500.0 - 50.0 * i as f64;
        assert!((t4 - demand).abs() < 1.0, "point {i}: T4 {t4} vs {demand}");
    }
}
