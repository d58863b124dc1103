//! Fluid classification domain: the fixed three-label outcome space

use serde::{Deserialize, Serialize};

/// Resistivity-based fluid classification of a depth interval
///
/// The domain is closed: every classified row carries exactly one of these
/// three labels, ordered here from most to least prospective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FluidClass {
    /// High resistivity - likely hydrocarbon-bearing interval
    #[serde(rename = "Potential Reservoir")]
    PotentialReservoir,
    /// Elevated resistivity - candidate pay interval
    #[serde(rename = "Pay Zone")]
    PayZone,
    /// Baseline resistivity - water-bearing or shale background
    #[serde(rename = "Background")]
    Background,
}

impl FluidClass {
    /// All labels in classification priority order (high resistivity first)
    pub const ALL: [FluidClass; 3] = [
        FluidClass::PotentialReservoir,
        FluidClass::PayZone,
        FluidClass::Background,
    ];

    /// Canonical display label (matches the serialized form)
    pub fn as_str(&self) -> &'static str {
        match self {
            FluidClass::PotentialReservoir => "Potential Reservoir",
            FluidClass::PayZone => "Pay Zone",
            FluidClass::Background => "Background",
        }
    }

    /// Short code for logging
    pub fn short_code(&self) -> &'static str {
        match self {
            FluidClass::PotentialReservoir => "RES",
            FluidClass::PayZone => "PAY",
            FluidClass::Background => "BG",
        }
    }

    /// Parse a label as written in CSV files or encoder artifacts.
    ///
    /// Accepts the canonical display form plus tolerant variants
    /// (case-insensitive, underscores for spaces).
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace('_', " ");
        match normalized.as_str() {
            "potential reservoir" | "reservoir" => Some(FluidClass::PotentialReservoir),
            "pay zone" | "pay" => Some(FluidClass::PayZone),
            "background" => Some(FluidClass::Background),
            _ => None,
        }
    }
}

impl std::fmt::Display for FluidClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for class in FluidClass::ALL {
            assert_eq!(FluidClass::from_label(class.as_str()), Some(class));
        }
    }

    #[test]
    fn test_from_label_tolerant_forms() {
        assert_eq!(
            FluidClass::from_label("potential_reservoir"),
            Some(FluidClass::PotentialReservoir)
        );
        assert_eq!(FluidClass::from_label("  PAY ZONE "), Some(FluidClass::PayZone));
        assert_eq!(FluidClass::from_label("background"), Some(FluidClass::Background));
        assert_eq!(FluidClass::from_label("gas cap"), None);
        assert_eq!(FluidClass::from_label(""), None);
    }

    #[test]
    fn test_serde_uses_display_labels() {
        let json = serde_json::to_string(&FluidClass::PotentialReservoir).unwrap();
        assert_eq!(json, "\"Potential Reservoir\"");
        let back: FluidClass = serde_json::from_str("\"Pay Zone\"").unwrap();
        assert_eq!(back, FluidClass::PayZone);
    }
}
