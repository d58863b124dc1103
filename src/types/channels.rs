//! Canonical channel mnemonics for depth-indexed MWD/LWD telemetry
//!
//! Every table column the pipeline knows about is named here. Raw sensor
//! channels use short industry mnemonics; derived target columns and
//! prediction columns are built from these via the `*_column` helpers so
//! the naming scheme lives in exactly one place.

// ============================================================================
// Raw Sensor Channels
// ============================================================================

/// Measured depth (ft) - the table index, always present
pub const DEPTH: &str = "DEPTH";

/// Gamma ray, corrected (gAPI)
pub const GAMMA_RAY: &str = "GR";

/// Deep resistivity (ohm·m)
pub const RESISTIVITY: &str = "RT";

/// Bulk density (g/cm³)
pub const BULK_DENSITY: &str = "RHOB";

/// Neutron porosity (v/v)
pub const NEUTRON_POROSITY: &str = "NPHI";

/// Corrected drilling exponent (unitless, typically 0.8 - 2.5)
pub const DRILLING_EXPONENT: &str = "DXC";

/// Rate of penetration (ft/hr)
pub const ROP: &str = "ROP";

/// Weight on bit (klbs)
pub const WOB: &str = "WOB";

/// Surface torque average (kft·lbs)
pub const TORQUE: &str = "TORQUE";

/// Total gas from chromatograph (units)
pub const TOTAL_GAS: &str = "TOTAL_GAS";

/// Mud weight in (ppg)
pub const MUD_WEIGHT_IN: &str = "MW_IN";

/// Equivalent circulating density at bit (ppg)
pub const ECD: &str = "ECD";

/// Annular pressure (psi)
pub const ANNULAR_PRESSURE: &str = "ANN_PRESSURE";

/// Mechanical specific energy (psi)
pub const MSE: &str = "MSE";

/// Stick-slip RPM average (RPM)
pub const STICK_SLIP: &str = "STICK_SLIP";

// ============================================================================
// Derived Target Columns
// ============================================================================

/// Wyllie density porosity (v/v, clipped to [0, 1])
pub const PHI_COMBINED: &str = "PHI_COMBINED";

/// Rule-based fluid classification (categorical, three labels)
pub const FLUID_CLASS: &str = "FLUID_CLASS";

/// Rehm & McClendon pore pressure (psi)
pub const PORE_PRESSURE_PSI: &str = "PREDICTED_PORE_PRESSURE_PSI";

// ============================================================================
// Prediction Column Naming
// ============================================================================

/// Model prediction column for a target (`{TARGET}_PRED`)
pub fn pred_column(target: &str) -> String {
    format!("{target}_PRED")
}

/// Confidence column for a target (`{TARGET}_CONF`, values in [0, 1])
pub fn conf_column(target: &str) -> String {
    format!("{target}_CONF")
}

/// Lower interval bound column for a target (`{TARGET}_CONF_LOW`)
pub fn conf_low_column(target: &str) -> String {
    format!("{target}_CONF_LOW")
}

/// Upper interval bound column for a target (`{TARGET}_CONF_HIGH`)
pub fn conf_high_column(target: &str) -> String {
    format!("{target}_CONF_HIGH")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_column_naming() {
        assert_eq!(pred_column(PHI_COMBINED), "PHI_COMBINED_PRED");
        assert_eq!(conf_column(PHI_COMBINED), "PHI_COMBINED_CONF");
        assert_eq!(conf_low_column(PORE_PRESSURE_PSI), "PREDICTED_PORE_PRESSURE_PSI_CONF_LOW");
        assert_eq!(conf_high_column(PORE_PRESSURE_PSI), "PREDICTED_PORE_PRESSURE_PSI_CONF_HIGH");
    }
}
