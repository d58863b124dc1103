//! Seeded synthetic well data and a built-in model bundle.
//!
//! Lets the CLI and the integration tests exercise the full pipeline
//! without proprietary log data. The generated table walks three
//! formation zones — background shale, a sand pay interval, and an
//! overpressured reservoir at the bottom — so every fluid class, a
//! porosity contrast, and a pore-pressure kick all show up in one run.
//!
//! Everything here is deterministic under a fixed seed: the same
//! `(rows, seed)` pair always yields the same table, byte for byte,
//! and the bundle is handcrafted rather than trained.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::config::FeaturesConfig;
use crate::models::{
    GbtClassifier, GbtRegressor, LabelEncoder, ModelBundle, ModelError, RegressionTree, TreeNode,
};
use crate::types::{channels, LogTable, TableError};

// ============================================================================
// Depth Profile
// ============================================================================

/// First log sample (ft MD).
const START_DEPTH_FT: f64 = 2000.0;
/// Sample spacing (ft).
const DEPTH_STEP_FT: f64 = 0.5;

/// Formation zones, ordered top-down as a fraction of the logged interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// Upper 40%: high gamma, low resistivity, normal pressure.
    Shale,
    /// 40–70%: clean sand with moderate resistivity and gas shows.
    Sand,
    /// Bottom 30%: high resistivity, depressed d-exponent, raised mud weight.
    Reservoir,
}

impl Zone {
    fn from_progress(progress: f64) -> Self {
        if progress < 0.4 {
            Zone::Shale
        } else if progress < 0.7 {
            Zone::Sand
        } else {
            Zone::Reservoir
        }
    }
}

// ============================================================================
// Synthetic Table
// ============================================================================

/// Generate a deterministic synthetic log table.
///
/// Channels cover all default model feature groups plus the raw inputs
/// the target derivations need (`RHOB`, `NPHI`, `RT`, `DXC`, `MW_IN`).
/// A handful of channels carry fixed-stride sensor dropouts so missing
/// data paths get exercised; row 0 is always complete, which keeps every
/// channel usable at any table size.
///
/// Rejects `rows == 0` the same way table construction does.
pub fn synthetic_table(rows: usize, seed: u64) -> Result<LogTable, TableError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut depth = Vec::with_capacity(rows);
    let mut gr = Vec::with_capacity(rows);
    let mut rt = Vec::with_capacity(rows);
    let mut rhob = Vec::with_capacity(rows);
    let mut nphi = Vec::with_capacity(rows);
    let mut dxc = Vec::with_capacity(rows);
    let mut mw_in = Vec::with_capacity(rows);
    let mut ecd = Vec::with_capacity(rows);
    let mut ann = Vec::with_capacity(rows);
    let mut rop = Vec::with_capacity(rows);
    let mut wob = Vec::with_capacity(rows);
    let mut torque = Vec::with_capacity(rows);
    let mut gas = Vec::with_capacity(rows);
    let mut mse = Vec::with_capacity(rows);
    let mut stick_slip = Vec::with_capacity(rows);

    #[allow(clippy::cast_precision_loss)]
    for row in 0..rows {
        let md = START_DEPTH_FT + DEPTH_STEP_FT * row as f64;
        let progress = row as f64 / rows as f64;
        let zone = Zone::from_progress(progress);

        // Per-zone baselines; noise scales are per channel.
        let (gr_0, rt_0, rhob_0, nphi_0, dxc_0, mw_0) = match zone {
            Zone::Shale => (92.0, 5.0, 2.55, 0.32, 1.02, 9.0),
            Zone::Sand => (48.0, 30.0, 2.38, 0.21, 0.97, 9.0),
            Zone::Reservoir => (35.0, 180.0, 2.28, 0.15, 0.80, 10.5),
        };
        let (rop_0, wob_0, torque_0, gas_0, mse_0, ss_0) = match zone {
            Zone::Shale => (60.0, 20.0, 8.0, 30.0, 35_000.0, 0.12),
            Zone::Sand => (85.0, 18.0, 7.0, 120.0, 26_000.0, 0.06),
            Zone::Reservoir => (45.0, 25.0, 10.5, 420.0, 48_000.0, 0.38),
        };

        depth.push(md);
        gr.push(gr_0 + 2.5 * noise(&mut rng));
        rt.push((rt_0 * (1.0 + 0.08 * noise(&mut rng))).max(0.2));
        rhob.push(rhob_0 + 0.012 * noise(&mut rng));
        nphi.push((nphi_0 + 0.012 * noise(&mut rng)).max(0.0));
        dxc.push(dxc_0 + 0.02 * noise(&mut rng));
        mw_in.push(mw_0 + 0.02 * noise(&mut rng));
        let ecd_now = mw_0 + 0.35 + 0.05 * noise(&mut rng);
        ecd.push(ecd_now);
        ann.push(0.052 * ecd_now * md + 15.0 * noise(&mut rng));
        rop.push((rop_0 + 4.0 * noise(&mut rng)).max(1.0));
        wob.push((wob_0 + noise(&mut rng)).max(0.5));
        torque.push((torque_0 + 0.4 * noise(&mut rng)).max(0.5));
        gas.push((gas_0 + 12.0 * noise(&mut rng)).max(0.0));
        mse.push((mse_0 + 1_500.0 * noise(&mut rng)).max(0.0));
        stick_slip.push((ss_0 + 0.02 * noise(&mut rng)).max(0.0));
    }

    // Fixed-stride sensor dropouts. Strides are coprime so the gaps
    // scatter instead of lining up, and none touch row 0.
    knock_out(&mut gr, 17, 13);
    knock_out(&mut rt, 23, 7);
    knock_out(&mut rhob, 19, 11);
    knock_out(&mut dxc, 29, 17);
    knock_out(&mut ann, 37, 5);
    knock_out(&mut gas, 13, 9);
    knock_out(&mut mse, 31, 21);

    let mut columns = BTreeMap::new();
    columns.insert(channels::GAMMA_RAY.to_string(), gr);
    columns.insert(channels::RESISTIVITY.to_string(), rt);
    columns.insert(channels::BULK_DENSITY.to_string(), rhob);
    columns.insert(channels::NEUTRON_POROSITY.to_string(), nphi);
    columns.insert(channels::DRILLING_EXPONENT.to_string(), dxc);
    columns.insert(channels::MUD_WEIGHT_IN.to_string(), mw_in);
    columns.insert(channels::ECD.to_string(), ecd);
    columns.insert(channels::ANNULAR_PRESSURE.to_string(), ann);
    columns.insert(channels::ROP.to_string(), rop);
    columns.insert(channels::WOB.to_string(), wob);
    columns.insert(channels::TORQUE.to_string(), torque);
    columns.insert(channels::TOTAL_GAS.to_string(), gas);
    columns.insert(channels::MSE.to_string(), mse);
    columns.insert(channels::STICK_SLIP.to_string(), stick_slip);

    LogTable::from_columns(depth, columns)
}

/// Standard-normal draw. `StandardNormal` has no failure mode, unlike
/// parameterized `Normal::new`, so sampling stays total.
fn noise(rng: &mut StdRng) -> f64 {
    rng.sample(StandardNormal)
}

fn knock_out(values: &mut [f64], stride: usize, offset: usize) {
    for (row, value) in values.iter_mut().enumerate() {
        if row % stride == offset {
            *value = f64::NAN;
        }
    }
}

// ============================================================================
// Demo Model Bundle
// ============================================================================

/// Assemble the built-in demo bundle.
///
/// Each model is a small stump ensemble keyed on the zone signatures the
/// synthetic table emits, with feature lists matching the default
/// feature groups. The ensembles pass the same structural validation as
/// artifacts loaded from disk.
pub fn demo_bundle() -> Result<ModelBundle, ModelError> {
    let features = FeaturesConfig::default();

    // Porosity: low gamma and a depressed d-exponent read as porous rock.
    // Feature order: DEPTH, GR, RT, DXC, ROP, TORQUE, WOB, TOTAL_GAS.
    let porosity = GbtRegressor {
        feature_names: features.porosity.clone(),
        base_score: 0.08,
        learning_rate: 0.5,
        trees: vec![
            stump(1, 60.0, false, 0.14, -0.02),
            stump(2, 50.0, false, -0.01, 0.10),
            stump(3, 1.0, false, 0.06, -0.01),
            stump(1, 75.0, false, 0.04, -0.02),
        ],
    };

    // Fluid: one score chain per class; missing features route toward
    // the high branch, which lands unknown rows in Background.
    // Feature order: DEPTH, GR, DXC, ROP, MSE, TORQUE, WOB, STICK_SLIP.
    let background = vec![stump(1, 60.0, false, -1.2, 1.5), stump(2, 1.0, false, -0.8, 0.6)];
    let pay_zone = vec![stump(1, 60.0, false, 1.0, -0.9), stump(2, 0.90, false, -0.7, 0.6)];
    let reservoir = vec![stump(1, 41.0, false, 0.9, -0.8), stump(2, 0.90, false, 1.2, -1.0)];
    let fluid = GbtClassifier {
        feature_names: features.fluid.clone(),
        learning_rate: 1.0,
        base_scores: vec![0.4, 0.0, -0.4],
        class_trees: vec![background, pay_zone, reservoir],
    };
    let labels = LabelEncoder::from_labels(&[
        "Background".to_string(),
        "Pay Zone".to_string(),
        "Potential Reservoir".to_string(),
    ])?;

    // Pressure: mud weight carries most of the signal (it gets raised
    // over the reservoir), annular pressure and drilling response trim it.
    // Feature order: DEPTH, MW_IN, ECD, ANN_PRESSURE, ROP, WOB, TORQUE.
    let pressure = GbtRegressor {
        feature_names: features.pressure.clone(),
        base_score: 900.0,
        learning_rate: 1.0,
        trees: vec![
            stump(1, 9.7, true, -40.0, 1_900.0),
            stump(3, 1_050.0, true, -60.0, 180.0),
            stump(4, 70.0, true, 30.0, 330.0),
            stump(5, 22.0, true, 20.0, 90.0),
            stump(6, 9.0, true, 40.0, 120.0),
        ],
    };

    ModelBundle::from_parts(porosity, fluid, pressure, labels)
}

/// Depth-1 decision tree: root split plus two leaves.
fn stump(feature: i32, threshold: f64, default_left: bool, low: f64, high: f64) -> RegressionTree {
    RegressionTree {
        nodes: vec![
            TreeNode {
                feature,
                threshold,
                left: 1,
                right: 2,
                default_left,
                value: 0.0,
            },
            leaf(low),
            leaf(high),
        ],
    }
}

fn leaf(value: f64) -> TreeNode {
    TreeNode {
        feature: -1,
        threshold: 0.0,
        left: -1,
        right: -1,
        default_left: false,
        value,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FluidClass;

    fn same_series(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
    }

    #[test]
    fn test_synthetic_table_is_deterministic() {
        let first = synthetic_table(48, 9).unwrap();
        let second = synthetic_table(48, 9).unwrap();

        assert_eq!(first.depth(), second.depth());
        for name in first.channel_names() {
            let a = first.channel(name).unwrap();
            let b = second.channel(name).unwrap();
            assert!(same_series(a, b), "channel {name} differs between runs");
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let first = synthetic_table(48, 1).unwrap();
        let second = synthetic_table(48, 2).unwrap();
        let a = first.channel(channels::GAMMA_RAY).unwrap();
        let b = second.channel(channels::GAMMA_RAY).unwrap();
        assert!(!same_series(a, b));
    }

    #[test]
    fn test_all_model_features_usable() {
        let table = synthetic_table(40, 1).unwrap();
        let features = FeaturesConfig::default();
        for name in features
            .porosity
            .iter()
            .chain(&features.fluid)
            .chain(&features.pressure)
            .chain(&features.minimal)
        {
            assert!(table.is_usable(name), "channel {name} not usable");
        }
    }

    #[test]
    fn test_dropouts_present_but_bounded() {
        let table = synthetic_table(60, 3).unwrap();
        for name in [
            channels::GAMMA_RAY,
            channels::RESISTIVITY,
            channels::BULK_DENSITY,
            channels::DRILLING_EXPONENT,
        ] {
            let missing = table.missing_count(name).unwrap();
            assert!(missing > 0, "expected dropouts in {name}");
            assert!(missing < 10, "too many dropouts in {name}: {missing}");
        }
        // Mud weight is a setpoint, never dropped.
        assert_eq!(table.missing_count(channels::MUD_WEIGHT_IN), Some(0));
    }

    #[test]
    fn test_zero_rows_rejected() {
        assert!(synthetic_table(0, 1).is_err());
    }

    #[test]
    fn test_demo_bundle_passes_validation() {
        let bundle = demo_bundle().unwrap();
        assert_eq!(bundle.fluid.n_classes(), 3);
        assert_eq!(bundle.labels.len(), 3);
        assert_eq!(bundle.porosity.n_trees(), 4);
        assert_eq!(bundle.pressure.n_trees(), 5);
    }

    // Archetype feature rows in each model's trained feature order.
    fn shale_fluid_row() -> Vec<f64> {
        vec![2010.0, 92.0, 1.02, 60.0, 35_000.0, 8.0, 20.0, 0.12]
    }

    fn sand_fluid_row() -> Vec<f64> {
        vec![2050.0, 48.0, 0.97, 85.0, 26_000.0, 7.0, 18.0, 0.06]
    }

    fn reservoir_fluid_row() -> Vec<f64> {
        vec![2090.0, 35.0, 0.80, 45.0, 48_000.0, 10.5, 25.0, 0.38]
    }

    #[test]
    fn test_demo_classifier_separates_zones() {
        let bundle = demo_bundle().unwrap();

        let (shale, _) = bundle.fluid.predict_row(&shale_fluid_row());
        let (sand, _) = bundle.fluid.predict_row(&sand_fluid_row());
        let (reservoir, _) = bundle.fluid.predict_row(&reservoir_fluid_row());

        assert_eq!(bundle.labels.decode(shale), Some(FluidClass::Background));
        assert_eq!(bundle.labels.decode(sand), Some(FluidClass::PayZone));
        assert_eq!(
            bundle.labels.decode(reservoir),
            Some(FluidClass::PotentialReservoir)
        );
    }

    #[test]
    fn test_demo_porosity_contrast() {
        let bundle = demo_bundle().unwrap();
        // DEPTH, GR, RT, DXC, ROP, TORQUE, WOB, TOTAL_GAS
        let shale = bundle
            .porosity
            .predict_row(&[2010.0, 92.0, 5.0, 1.02, 60.0, 8.0, 20.0, 30.0]);
        let reservoir = bundle
            .porosity
            .predict_row(&[2090.0, 35.0, 180.0, 0.80, 45.0, 10.5, 25.0, 420.0]);

        assert!(shale < 0.10, "shale porosity too high: {shale}");
        assert!(reservoir > 0.20, "reservoir porosity too low: {reservoir}");
        assert!((0.0..=1.0).contains(&shale));
        assert!((0.0..=1.0).contains(&reservoir));
    }

    #[test]
    fn test_demo_pressure_tracks_overpressure() {
        let bundle = demo_bundle().unwrap();
        // DEPTH, MW_IN, ECD, ANN_PRESSURE, ROP, WOB, TORQUE
        let shale = bundle
            .pressure
            .predict_row(&[2010.0, 9.0, 9.35, 975.0, 60.0, 20.0, 8.0]);
        let reservoir = bundle
            .pressure
            .predict_row(&[2090.0, 10.5, 10.85, 1_140.0, 45.0, 25.0, 10.5]);

        assert!(reservoir > shale + 1_500.0);
        assert!(shale > 0.0);
    }
}
