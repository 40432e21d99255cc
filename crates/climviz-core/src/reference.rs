//! Reference temperature sounding for overlay plots.
//!
//! The sounding is computed once per process on first use and shared
//! read-only afterwards.

use crate::diagnostics::zstar;
use serde::Serialize;
use std::sync::LazyLock;

/// Standard reanalysis pressure levels (hPa), surface first.
pub const REFERENCE_LEVELS: [f64; 17] = [
    1000.0, 925.0, 850.0, 700.0, 600.0, 500.0, 400.0, 300.0, 250.0, 200.0, 150.0, 100.0, 70.0,
    50.0, 30.0, 20.0, 10.0,
];

// Layers of the standard atmosphere: base pressure (hPa), base temperature (K)
// and lapse rate (K/m, positive for cooling with height).
const STANDARD_LAYERS: [(f64, f64, f64); 3] = [
    (1013.25, 288.15, 0.0065),
    (226.321, 216.65, 0.0),
    (54.7489, 216.65, -0.001),
];
const STANDARD_GAS_CONSTANT: f64 = 287.053;
const STANDARD_GRAVITY: f64 = 9.80665;

/// Temperature profile of a reference atmosphere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSounding {
    pub name: &'static str,
    /// Pressure (hPa), surface first
    pub levels: Vec<f64>,
    /// Temperature (K)
    pub temperatures: Vec<f64>,
}

impl ReferenceSounding {
    /// Log-pressure height of each level.
    pub fn zstar(&self) -> Vec<f64> {
        self.levels.iter().map(|p| zstar(*p)).collect()
    }
}

/// Temperature of the standard atmosphere at `pressure` (hPa).
///
/// Valid from the surface to the stratopause (about 1 hPa).
pub fn standard_atmosphere_temperature(pressure: f64) -> f64 {
    // Uppermost layer whose base pressure is at least `pressure`
    let (base_pressure, base_temperature, lapse) = STANDARD_LAYERS
        .iter()
        .rev()
        .copied()
        .find(|(base, _, _)| pressure <= *base * (1.0 + 1e-9))
        .unwrap_or(STANDARD_LAYERS[0]);
    if lapse == 0.0 {
        return base_temperature;
    }
    base_temperature
        * (pressure / base_pressure).powf(STANDARD_GAS_CONSTANT * lapse / STANDARD_GRAVITY)
}

static REFERENCE_SOUNDING: LazyLock<ReferenceSounding> = LazyLock::new(|| ReferenceSounding {
    name: "Standard atmosphere",
    levels: REFERENCE_LEVELS.to_vec(),
    temperatures: REFERENCE_LEVELS
        .iter()
        .map(|p| standard_atmosphere_temperature(*p))
        .collect(),
});

/// The process-wide reference sounding.
pub fn reference_sounding() -> &'static ReferenceSounding {
    &REFERENCE_SOUNDING
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_atmosphere_layers() {
        assert_relative_eq!(standard_atmosphere_temperature(1013.25), 288.15);
        assert_relative_eq!(standard_atmosphere_temperature(226.321), 216.65, epsilon = 1e-3);
        assert_relative_eq!(standard_atmosphere_temperature(100.0), 216.65);
        // About 31 km
        let upper = standard_atmosphere_temperature(10.0);
        assert!(upper > 225.0 && upper < 230.0, "{}", upper);
    }

    #[test]
    fn test_sounding_is_shared() {
        let first = reference_sounding();
        let second = reference_sounding();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.levels.len(), first.temperatures.len());
        assert_eq!(first.zstar()[0], 0.0);
    }

    #[test]
    fn test_troposphere_cools_with_height() {
        let sounding = reference_sounding();
        let tropopause = sounding.levels.iter().position(|p| *p == 200.0).unwrap();
        assert!(sounding.temperatures[..=tropopause]
            .windows(2)
            .all(|w| w[1] <= w[0]));
    }
}
