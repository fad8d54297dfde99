//! Shared model-building helpers for the end-to-end scenarios.
#![allow(dead_code)]

use gp_components::{
    Ambient, AmbientConditions, Combustor, Component, Compressor, Control, ControlLink, Duct,
    ExhaustNozzle, FuelSpec, Inlet, IsaAtmosphere, SpeedMode, SweepSpec, Turbine, TurbineKind,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Generic single-spool compressor map: corrected flow falls from the
/// choke side (beta 0) toward surge, pressure ratio rises, efficiency
/// peaks mid-line.
pub const COMPRESSOR_MAP: &str = "\
Synthetic compressor map for scenario tests.
99 1 SYNTHETIC COMPRESSOR
REYNOLDS RNI=0.50 f_RNI=0.97 RNI=1.00 f_RNI=1.00
 MASS FLOW
 6.005 0.20 0.40 0.60 0.80
 0.60  12.6  12.2  11.8  11.4
 0.75  15.6  15.2  14.8  14.4
 0.90  18.6  18.2  17.8  17.4
 1.00  20.6  20.2  19.8  19.4
 1.10  22.6  22.2  21.8  21.4
 EFFICIENCY
 6.005 0.20 0.40 0.60 0.80
 0.60  0.74  0.76  0.77  0.75
 0.75  0.78  0.80  0.81  0.79
 0.90  0.82  0.84  0.85  0.83
 1.00  0.84  0.86  0.87  0.85
 1.10  0.83  0.85  0.86  0.84
 PRESSURE RATIO
 6.005 0.20 0.40 0.60 0.80
 0.60  1.6   1.8   2.0   2.2
 0.75  2.4   2.6   2.8   3.0
 0.90  3.2   3.4   3.6   3.8
 1.00  3.8   4.0   4.2   4.4
 1.10  4.4   4.6   4.8   5.0
 SURGE LINE
 2.005 11.0 15.0 19.0 23.0
 1.0   2.4   3.4   4.6   5.6
";

/// Generic turbine map: nearly choked corrected flow with mild speed and
/// beta slopes; the pressure-ratio table comes from the per-speed limits.
pub const TURBINE_MAP: &str = "\
Synthetic turbine map for scenario tests.
99 2 SYNTHETIC TURBINE
REYNOLDS RNI=0.50 f_RNI=0.97 RNI=1.00 f_RNI=1.00
 MIN PRESSURE RATIO
 2.005 0.60 0.80 1.00 1.20
 1.0   1.30  1.35  1.40  1.45
 MAX PRESSURE RATIO
 2.005 0.60 0.80 1.00 1.20
 1.0   4.10  4.30  4.50  4.70
 MASS FLOW
 5.005 0.20 0.40 0.60 0.80
 0.60  20.4  20.6  20.8  21.0
 0.80  20.8  21.0  21.2  21.4
 1.00  21.2  21.4  21.6  21.8
 1.20  21.6  21.8  22.0  22.2
 EFFICIENCY
 5.005 0.20 0.40 0.60 0.80
 0.60  0.84  0.85  0.86  0.85
 0.80  0.85  0.86  0.87  0.86
 1.00  0.86  0.87  0.88  0.87
 1.20  0.85  0.86  0.87  0.86
";

pub fn write_map(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Route solver/component logging through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Kerosene by heating value, as flown on the single-spool demos.
pub fn kerosene_lhv() -> FuelSpec {
    FuelSpec::LhvRatio {
        lhv: 43_031.0,
        hc_ratio: 1.9167,
        oc_ratio: 0.0,
    }
}

/// The single-spool turbojet of scenarios A-C: sea-level static design
/// point, 19.9 kg/s, PR 6.92, 0.38 kg/s fuel.
///
/// Station plan: 0 ambient, 2 inlet exit, 3 compressor exit, 4 combustor
/// exit, 5 turbine exit, 7 nozzle entry, 8 throat, 9 exit.
pub struct TurbojetMaps {
    pub compressor: NamedTempFile,
    pub turbine: NamedTempFile,
}

impl TurbojetMaps {
    pub fn create() -> Self {
        Self {
            compressor: write_map(COMPRESSOR_MAP),
            turbine: write_map(TURBINE_MAP),
        }
    }
}

pub fn turbojet_components(
    maps: &TurbojetMaps,
    fuel_control: Control,
    combustor_link: Option<ControlLink>,
) -> Vec<Box<dyn Component>> {
    let ambient = Ambient::new(
        "Ambient",
        0,
        AmbientConditions::default(),
        Box::new(IsaAtmosphere),
    );
    let inlet = Inlet::new("Inlet1", 0, 2, 19.9, 1.0);
    let compressor = Compressor::new(
        "compressor1",
        maps.compressor.path(),
        2,
        3,
        1,
        16_540.0,
        0.825,
        1.0,
        0.60,
        6.92,
        SpeedMode::Gg,
        vec![],
    )
    .unwrap();
    let combustor = Combustor::new(
        "combustor1",
        3,
        4,
        0.38,
        None,
        1.0,
        1.0,
        kerosene_lhv(),
        None,
        combustor_link,
    )
    .unwrap();
    let turbine = Turbine::new(
        "turbine1",
        maps.turbine.path(),
        4,
        5,
        1,
        16_540.0,
        0.88,
        0.90,
        0.50,
        0.99,
        TurbineKind::Gg,
        vec![],
    )
    .unwrap();
    let duct = Duct::new("exhduct", 5, 7, 1.0);
    let nozzle = ExhaustNozzle::new("exhaust1", 7, 8, 9, 1.0, 1.0, 1.0).unwrap();

    vec![
        Box::new(ambient),
        Box::new(fuel_control),
        Box::new(inlet),
        Box::new(compressor),
        Box::new(combustor),
        Box::new(turbine),
        Box::new(duct),
        Box::new(nozzle),
    ]
}

/// Open-loop fuel-flow control for the turbojet.
pub fn fuel_control(start: f64, end: f64, step: f64) -> Control {
    Control::new(
        "Control",
        SweepSpec {
            dp_value: 0.38,
            start,
            end,
            step,
            controlled_param: None,
        },
    )
    .unwrap()
}

/// A column must fall strictly as the sweep proceeds.
pub fn assert_monotone_decreasing(values: &[f64], what: &str) {
    assert!(values.len() > 1, "{what}: need at least two values");
    for pair in values.windows(2) {
        assert!(
            pair[1] < pair[0] + 1e-9,
            "{what} not monotone decreasing: {pair:?}"
        );
    }
}
