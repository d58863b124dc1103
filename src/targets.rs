//! Deterministic target derivation from raw log channels.
//!
//! Before any model runs, the pipeline derives the three ground-truth
//! columns the models were trained against: density porosity, a
//! resistivity fluid classification, and a pore-pressure estimate. The
//! formulas are fixed petrophysical relationships, not learned — every
//! constant is configurable but defaults to textbook values.
//!
//! Derivation is idempotent: a target whose output column already exists
//! (for example in a labelled training export) is left untouched.

use tracing::{debug, info, warn};

use crate::config::{FluidConfig, PipelineConfig, PorosityConfig, PressureConfig};
use crate::types::channels;
use crate::types::{FluidClass, LogTable, TargetKind, TargetOutcome, TargetReport};

// ============================================================================
// Petrophysical Formulas
// ============================================================================

/// Density porosity from the bulk density log.
///
/// Formula: phi = (rho_matrix - rho_bulk) / (rho_matrix - rho_fluid)
///
/// Where:
/// - rho_matrix = grain density of the rock matrix (g/cm³)
/// - rho_bulk = measured bulk density, RHOB (g/cm³)
/// - rho_fluid = pore fluid density (g/cm³)
///
/// Returns the raw (unclamped) fraction; callers clamp to [0, 1].
/// A missing bulk density reading propagates as NaN.
pub fn wyllie_porosity(rho_bulk: f64, matrix_g_cc: f64, fluid_g_cc: f64) -> f64 {
    (matrix_g_cc - rho_bulk) / (matrix_g_cc - fluid_g_cc)
}

/// Hydrostatic pressure of the mud column at depth.
///
/// Formula: P = 0.052 × MW × TVD
///
/// Where:
/// - MW = mud weight (ppg)
/// - TVD = true vertical depth (ft)
/// - 0.052 = ppg·ft to psi conversion factor
pub fn hydrostatic_psi(mud_weight_ppg: f64, depth_ft: f64) -> f64 {
    0.052 * mud_weight_ppg * depth_ft
}

/// Overpressure anomaly from the corrected drilling exponent.
///
/// Formula: ΔP = (d_normal - DXC) × G
///
/// Where:
/// - d_normal = expected exponent on the normal compaction trend
/// - DXC = corrected drilling exponent at this depth
/// - G = pressure equivalent of one full exponent unit (psi)
///
/// An exponent below the normal trend indicates undercompaction and adds
/// pressure; above-trend drilling subtracts. A missing exponent reading
/// carries no anomaly evidence and contributes zero.
pub fn exponent_anomaly_psi(dxc: f64, normal_trend: f64, gradient_psi: f64) -> f64 {
    if dxc.is_nan() {
        return 0.0;
    }
    (normal_trend - dxc) * gradient_psi
}

/// Classify pore fluid from deep resistivity, high threshold first.
///
/// Hydrocarbons are resistive: RT at or above the reservoir threshold
/// reads as potential reservoir, at or above the pay-zone threshold as
/// pay, and anything lower as conductive background (brine or shale).
/// A missing reading cannot be classified.
pub fn classify_fluid(rt_ohm_m: f64, config: &FluidConfig) -> Option<FluidClass> {
    if rt_ohm_m.is_nan() {
        return None;
    }
    if rt_ohm_m >= config.reservoir_ohm_m {
        Some(FluidClass::PotentialReservoir)
    } else if rt_ohm_m >= config.pay_zone_ohm_m {
        Some(FluidClass::PayZone)
    } else {
        Some(FluidClass::Background)
    }
}

// ============================================================================
// Target Computer
// ============================================================================

/// Derives the three target columns on a log table.
#[derive(Debug, Clone)]
pub struct TargetComputer {
    porosity: PorosityConfig,
    fluid: FluidConfig,
    pressure: PressureConfig,
}

impl TargetComputer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            porosity: config.porosity.clone(),
            fluid: config.fluid.clone(),
            pressure: config.pressure.clone(),
        }
    }

    /// Derive all targets in fixed order: porosity, fluid class, pressure.
    ///
    /// Each target is skipped when its output column already exists, so
    /// re-running over an already-derived table is a no-op.
    pub fn compute_all(&self, table: &mut LogTable) -> TargetReport {
        let report = TargetReport {
            outcomes: vec![
                self.compute_porosity(table),
                self.compute_fluid(table),
                self.compute_pressure(table),
            ],
        };

        if report.all_skipped() {
            info!("all target columns already present, derivation skipped");
        }
        report
    }

    /// PHI_COMBINED: density porosity, clamped to the physical [0, 1] range.
    fn compute_porosity(&self, table: &mut LogTable) -> TargetOutcome {
        if table.has_column(channels::PHI_COMBINED) {
            return skipped(TargetKind::Porosity);
        }

        let n = table.row_count();
        let rho = table.channel(channels::BULK_DENSITY);
        let mut values = Vec::with_capacity(n);
        let mut computed = 0usize;
        let mut missing = 0usize;
        let mut clipped = 0usize;

        for row in 0..n {
            let rho_bulk = rho.map_or(f64::NAN, |c| c[row]);
            let raw = wyllie_porosity(
                rho_bulk,
                self.porosity.matrix_density_g_cc,
                self.porosity.fluid_density_g_cc,
            );
            if raw.is_nan() {
                missing += 1;
                values.push(f64::NAN);
            } else {
                computed += 1;
                if !(0.0..=1.0).contains(&raw) {
                    clipped += 1;
                }
                values.push(raw.clamp(0.0, 1.0));
            }
        }

        if clipped > 0 {
            debug!(
                rows = clipped,
                "porosity readings outside [0, 1] clamped to physical range"
            );
        }
        attach_channel(table, channels::PHI_COMBINED, values);

        info!(
            computed_rows = computed,
            missing_rows = missing,
            clipped_rows = clipped,
            "derived density porosity"
        );
        TargetOutcome {
            target: TargetKind::Porosity,
            column: channels::PHI_COMBINED.to_string(),
            skipped_existing: false,
            computed_rows: computed,
            missing_rows: missing,
            clipped_rows: clipped,
        }
    }

    /// FLUID_CLASS: resistivity cut-off classification.
    fn compute_fluid(&self, table: &mut LogTable) -> TargetOutcome {
        if table.has_column(channels::FLUID_CLASS) {
            return skipped(TargetKind::Fluid);
        }

        let n = table.row_count();
        let rt = table.channel(channels::RESISTIVITY);
        let mut labels = Vec::with_capacity(n);
        let mut computed = 0usize;
        let mut missing = 0usize;

        for row in 0..n {
            let reading = rt.map_or(f64::NAN, |c| c[row]);
            match classify_fluid(reading, &self.fluid) {
                Some(class) => {
                    computed += 1;
                    labels.push(Some(class));
                }
                None => {
                    missing += 1;
                    labels.push(None);
                }
            }
        }

        if let Err(err) = table.insert_class_column(channels::FLUID_CLASS, labels) {
            warn!(error = %err, column = channels::FLUID_CLASS, "failed to attach target column");
        }

        info!(
            computed_rows = computed,
            missing_rows = missing,
            "derived fluid classification"
        );
        TargetOutcome {
            target: TargetKind::Fluid,
            column: channels::FLUID_CLASS.to_string(),
            skipped_existing: false,
            computed_rows: computed,
            missing_rows: missing,
            clipped_rows: 0,
        }
    }

    /// PREDICTED_PORE_PRESSURE_PSI: hydrostatic base plus exponent anomaly.
    ///
    /// Never leaves a row missing — a missing mud weight falls back to
    /// fresh water and a missing exponent contributes zero anomaly. The
    /// result is floored at 0 psi.
    fn compute_pressure(&self, table: &mut LogTable) -> TargetOutcome {
        if table.has_column(channels::PORE_PRESSURE_PSI) {
            return skipped(TargetKind::PorePressure);
        }

        let n = table.row_count();
        let mw = table.channel(channels::MUD_WEIGHT_IN);
        let dxc = table.channel(channels::DRILLING_EXPONENT);
        let mut values = Vec::with_capacity(n);
        let mut clipped = 0usize;
        let mut mw_fallback_rows = 0usize;

        for (row, depth_ft) in table.depth().iter().copied().enumerate() {
            let mut mud_weight = mw.map_or(f64::NAN, |c| c[row]);
            if mud_weight.is_nan() {
                mud_weight = self.pressure.fallback_mud_weight_ppg;
                mw_fallback_rows += 1;
            }

            let hydro = hydrostatic_psi(mud_weight, depth_ft);
            let anomaly = exponent_anomaly_psi(
                dxc.map_or(f64::NAN, |c| c[row]),
                self.pressure.normal_trend_exponent,
                self.pressure.exponent_gradient_psi,
            );

            let total = hydro + anomaly;
            if total < 0.0 {
                clipped += 1;
                values.push(0.0);
            } else {
                values.push(total);
            }
        }

        if mw_fallback_rows > 0 {
            debug!(
                rows = mw_fallback_rows,
                fallback_ppg = self.pressure.fallback_mud_weight_ppg,
                "mud weight missing, assumed fresh water"
            );
        }
        attach_channel(table, channels::PORE_PRESSURE_PSI, values);

        info!(
            computed_rows = n,
            clipped_rows = clipped,
            "derived pore pressure estimate"
        );
        TargetOutcome {
            target: TargetKind::PorePressure,
            column: channels::PORE_PRESSURE_PSI.to_string(),
            skipped_existing: false,
            computed_rows: n,
            missing_rows: 0,
            clipped_rows: clipped,
        }
    }
}

fn skipped(target: TargetKind) -> TargetOutcome {
    debug!(target = %target, "output column already present, skipping derivation");
    TargetOutcome {
        column: target.output_column().to_string(),
        target,
        skipped_existing: true,
        computed_rows: 0,
        missing_rows: 0,
        clipped_rows: 0,
    }
}

/// Attach a derived column; the length always matches because values are
/// sized off the same table, so a failure here is logged, not propagated.
fn attach_channel(table: &mut LogTable, name: &str, values: Vec<f64>) {
    if let Err(err) = table.insert_channel(name, values) {
        warn!(error = %err, column = name, "failed to attach target column");
    }
}

// ============================================================================
// Tests
// ============================================================================
