//! User-adjustable model parameters.
//!
//! Each [`ParameterId`] carries an explicit [`ParameterDefinition`] describing
//! its display label, unit, allowed range and whether the displayed value is a
//! concentration in ppm that has to be converted to a volume mixing ratio
//! before it reaches the radiative model.
//!
//! A [`ParameterSet`] has the persisted `rrtm_options` shape: a mapping from
//! parameter id to `{value, min, max}`.

use crate::errors::{ClimvizError, ClimvizResult};
use crate::gases::{GasConcentrationVector, GasSpecies, PPM};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterId {
    Co2Concentration,
    Ch4Concentration,
    RelHumidity,
    SurfaceTemperature,
}

/// Static metadata describing one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDefinition {
    pub id: ParameterId,
    pub label: &'static str,
    pub unit: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Displayed in ppm, handed to the model as a volume mixing ratio.
    pub requires_ppm_conversion: bool,
    /// Gas whose concentration this parameter controls.
    pub gas: Option<GasSpecies>,
}

const DEFINITIONS: [ParameterDefinition; 4] = [
    ParameterDefinition {
        id: ParameterId::Co2Concentration,
        label: "CO2 Concentration (ppm)",
        unit: "ppm",
        default: 400.0,
        min: 0.0,
        max: 10000.0,
        step: 1.0,
        requires_ppm_conversion: true,
        gas: Some(GasSpecies::CO2),
    },
    ParameterDefinition {
        id: ParameterId::Ch4Concentration,
        label: "CH4 Concentration (ppm)",
        unit: "ppm",
        default: 0.0,
        min: 0.0,
        max: 10000.0,
        step: 1.0,
        requires_ppm_conversion: true,
        gas: Some(GasSpecies::CH4),
    },
    ParameterDefinition {
        id: ParameterId::RelHumidity,
        label: "Relative Humidity (-)",
        unit: "1",
        default: 0.8,
        min: 0.0,
        max: 1.0,
        step: 0.01,
        requires_ppm_conversion: false,
        gas: None,
    },
    ParameterDefinition {
        id: ParameterId::SurfaceTemperature,
        label: "Surface Temperature (K)",
        unit: "K",
        default: 275.0,
        min: 250.0,
        max: 290.0,
        step: 1.0,
        requires_ppm_conversion: false,
        gas: None,
    },
];

impl ParameterId {
    pub const ALL: [ParameterId; 4] = [
        ParameterId::Co2Concentration,
        ParameterId::Ch4Concentration,
        ParameterId::RelHumidity,
        ParameterId::SurfaceTemperature,
    ];

    pub fn definition(self) -> &'static ParameterDefinition {
        &DEFINITIONS[self as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            ParameterId::Co2Concentration => "co2_concentration",
            ParameterId::Ch4Concentration => "ch4_concentration",
            ParameterId::RelHumidity => "rel_humidity",
            ParameterId::SurfaceTemperature => "surface_temperature",
        }
    }

    pub fn label(self) -> &'static str {
        self.definition().label
    }

    /// Convert a displayed value to the value the model consumes.
    pub fn to_model_value(self, value: f64) -> f64 {
        if self.definition().requires_ppm_conversion {
            value / PPM
        } else {
            value
        }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterId {
    type Err = ClimvizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().replace('-', "_").to_ascii_lowercase();
        ParameterId::ALL
            .into_iter()
            .find(|id| id.name() == normalised)
            .ok_or_else(|| ClimvizError::Configuration(format!("Unknown parameter '{}'", s)))
    }
}

/// Current value of a parameter together with its allowed range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl ParameterValue {
    fn validate(&self, id: ParameterId) -> ClimvizResult<()> {
        if !self.value.is_finite() || self.value < self.min || self.value > self.max {
            return Err(ClimvizError::Configuration(format!(
                "{} = {} is outside [{}, {}]",
                id, self.value, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Inputs handed to the column model after unit conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInputs {
    /// Surface temperature (K)
    pub surface_temperature: f64,
    /// Relative humidity (-)
    pub relative_humidity: f64,
    /// Volume mixing ratios
    pub gases: GasConcentrationVector,
}

impl fmt::Display for ModelInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ts={:.2} K, RH={:.3}, {}",
            self.surface_temperature, self.relative_humidity, self.gases
        )
    }
}

/// Values of every [`ParameterId`], in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IndexMap<ParameterId, ParameterValue>")]
#[serde(into = "IndexMap<ParameterId, ParameterValue>")]
pub struct ParameterSet {
    values: IndexMap<ParameterId, ParameterValue>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        let values = ParameterId::ALL
            .into_iter()
            .map(|id| {
                let def = id.definition();
                (
                    id,
                    ParameterValue {
                        value: def.default,
                        min: def.min,
                        max: def.max,
                    },
                )
            })
            .collect();
        Self { values }
    }
}

impl ParameterSet {
    pub fn get(&self, id: ParameterId) -> f64 {
        self.values[&id].value
    }

    pub fn entry(&self, id: ParameterId) -> &ParameterValue {
        &self.values[&id]
    }

    /// Copy of this set with `id` set to `value` (display units).
    ///
    /// The value must lie within the parameter's allowed range.
    pub fn with_value(&self, id: ParameterId, value: f64) -> ClimvizResult<Self> {
        let mut values = self.values.clone();
        let entry = ParameterValue {
            value,
            ..values[&id]
        };
        entry.validate(id)?;
        values.insert(id, entry);
        Ok(Self { values })
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, &ParameterValue)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }

    /// Resolve the displayed values into model inputs.
    ///
    /// Concentrations are converted from ppm exactly once and written onto a
    /// copy of `template`; other gases keep the template's values.
    pub fn resolve(&self, template: &GasConcentrationVector) -> ClimvizResult<ModelInputs> {
        let mut gases = *template;
        for (id, entry) in self.iter() {
            if let Some(species) = id.definition().gas {
                gases = gases.with(species, id.to_model_value(entry.value))?;
            }
        }
        Ok(ModelInputs {
            surface_temperature: self.get(ParameterId::SurfaceTemperature),
            relative_humidity: self.get(ParameterId::RelHumidity),
            gases,
        })
    }
}

impl TryFrom<IndexMap<ParameterId, ParameterValue>> for ParameterSet {
    type Error = ClimvizError;

    fn try_from(mut stored: IndexMap<ParameterId, ParameterValue>) -> Result<Self, Self::Error> {
        let mut set = ParameterSet::default();
        for id in ParameterId::ALL {
            if let Some(entry) = stored.shift_remove(&id) {
                entry.validate(id)?;
                set.values.insert(id, entry);
            }
        }
        Ok(set)
    }
}

impl From<ParameterSet> for IndexMap<ParameterId, ParameterValue> {
    fn from(value: ParameterSet) -> Self {
        value.values
    }
}
