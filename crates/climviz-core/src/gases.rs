//! Gas concentrations handed to the radiative model.
//!
//! [`GasConcentrationVector`] is an immutable value: every modification returns
//! a fresh copy, so a shared template (e.g. [`GasConcentrationVector::zeros`])
//! can never be altered in place by one caller and leak into another.

use crate::errors::{ClimvizError, ClimvizResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Conversion factor between parts-per-million and volume mixing ratio.
pub const PPM: f64 = 1.0e6;

/// Absorbing species understood by the radiative model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GasSpecies {
    CO2,
    CH4,
    N2O,
    O2,
    CFC11,
    CFC12,
    CFC22,
    #[serde(rename = "CCL4")]
    CCl4,
    O3,
}

impl GasSpecies {
    /// All species, in storage order.
    pub const ALL: [GasSpecies; 9] = [
        GasSpecies::CO2,
        GasSpecies::CH4,
        GasSpecies::N2O,
        GasSpecies::O2,
        GasSpecies::CFC11,
        GasSpecies::CFC12,
        GasSpecies::CFC22,
        GasSpecies::CCl4,
        GasSpecies::O3,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            GasSpecies::CO2 => "CO2",
            GasSpecies::CH4 => "CH4",
            GasSpecies::N2O => "N2O",
            GasSpecies::O2 => "O2",
            GasSpecies::CFC11 => "CFC11",
            GasSpecies::CFC12 => "CFC12",
            GasSpecies::CFC22 => "CFC22",
            GasSpecies::CCl4 => "CCL4",
            GasSpecies::O3 => "O3",
        }
    }
}

impl fmt::Display for GasSpecies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GasSpecies {
    type Err = ClimvizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GasSpecies::ALL
            .into_iter()
            .find(|species| species.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClimvizError::Configuration(format!("Unknown gas species '{}'", s)))
    }
}

/// Volume mixing ratios (dimensionless) for every [`GasSpecies`].
///
/// All values are finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "std::collections::BTreeMap<GasSpecies, f64>")]
#[serde(into = "std::collections::BTreeMap<GasSpecies, f64>")]
pub struct GasConcentrationVector {
    vmr: [f64; 9],
}

impl GasConcentrationVector {
    /// Template with every species absent.
    pub const fn zeros() -> Self {
        Self { vmr: [0.0; 9] }
    }

    /// Volume mixing ratio of `species`.
    pub fn get(&self, species: GasSpecies) -> f64 {
        self.vmr[species.index()]
    }

    /// Concentration of `species` in parts-per-million.
    pub fn get_ppm(&self, species: GasSpecies) -> f64 {
        self.get(species) * PPM
    }

    /// Copy of this vector with `species` set to the volume mixing ratio `vmr`.
    pub fn with(&self, species: GasSpecies, vmr: f64) -> ClimvizResult<Self> {
        if !vmr.is_finite() || vmr < 0.0 {
            return Err(ClimvizError::Configuration(format!(
                "Volume mixing ratio of {} must be finite and non-negative, got {}",
                species, vmr
            )));
        }
        let mut vmr_values = self.vmr;
        vmr_values[species.index()] = vmr;
        Ok(Self { vmr: vmr_values })
    }

    /// Copy of this vector with `species` set from a concentration in ppm.
    pub fn with_ppm(&self, species: GasSpecies, ppm: f64) -> ClimvizResult<Self> {
        self.with(species, ppm / PPM)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GasSpecies, f64)> + '_ {
        GasSpecies::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

impl Default for GasConcentrationVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl TryFrom<std::collections::BTreeMap<GasSpecies, f64>> for GasConcentrationVector {
    type Error = ClimvizError;

    fn try_from(map: std::collections::BTreeMap<GasSpecies, f64>) -> Result<Self, Self::Error> {
        map.into_iter()
            .try_fold(Self::zeros(), |acc, (species, vmr)| acc.with(species, vmr))
    }
}

impl From<GasConcentrationVector> for std::collections::BTreeMap<GasSpecies, f64> {
    fn from(value: GasConcentrationVector) -> Self {
        value.iter().collect()
    }
}

impl fmt::Display for GasConcentrationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<String> = self
            .iter()
            .filter(|(_, vmr)| *vmr > 0.0)
            .map(|(species, vmr)| format!("{}={:.3} ppm", species, vmr * PPM))
            .collect();
        if present.is_empty() {
            f.write_str("no absorbers")
        } else {
            f.write_str(&present.join(", "))
        }
    }
}
