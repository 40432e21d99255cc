//! Grey radiative-equilibrium column.
//!
//! A time-stepping companion to the radiative-convective column: `n` equal
//! pressure layers over a shallow water surface, each layer a grey absorber in
//! the longwave with absorptivity
//!
//! $$ \epsilon = \frac{2}{1 + 2 g / (\kappa \Delta p)} $$
//!
//! and transparent in the shortwave. Temperatures are stepped forward with
//! explicit daily steps until the column stops changing, which recovers the
//! classic layer-model radiative equilibrium.

use crate::column::{AtmosphericColumn, LevelAxis};
use crate::constants::{CP, CW, DAYS_PER_YEAR, G, HPA_TO_PA, INSOLATION, RHO_WATER, SECONDS_PER_DAY};
use crate::errors::{ClimvizError, ClimvizResult};
use crate::radiation::two_stream::{longwave, shortwave};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters of the [`GreyRadiationModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreyRadiationParameters {
    /// Number of atmospheric layers.
    /// Default: 1
    pub num_layers: usize,
    /// Longwave mass absorption coefficient (m^2/kg).
    /// Default: 1.229e-4
    pub absorption_coefficient: f64,
    /// Surface shortwave albedo (-).
    /// Default: 0.299
    pub albedo: f64,
    /// Insolation at the top of the atmosphere (W/m^2).
    /// Default: 341.3
    pub insolation: f64,
    /// Depth of the water surface layer (m).
    /// Default: 1
    pub water_depth: f64,
    /// Initial temperature of every layer and the surface (K).
    /// Default: 288
    pub initial_temperature: f64,
    /// Length of a time step (days).
    /// Default: 1
    pub timestep_days: f64,
}

impl Default for GreyRadiationParameters {
    fn default() -> Self {
        Self {
            num_layers: 1,
            absorption_coefficient: 1.229e-4,
            albedo: 0.299,
            insolation: INSOLATION,
            water_depth: 1.0,
            initial_temperature: 288.0,
            timestep_days: 1.0,
        }
    }
}

impl GreyRadiationParameters {
    pub fn validate(&self) -> ClimvizResult<()> {
        let positive = [
            ("absorption_coefficient", self.absorption_coefficient),
            ("insolation", self.insolation),
            ("water_depth", self.water_depth),
            ("initial_temperature", self.initial_temperature),
            ("timestep_days", self.timestep_days),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ClimvizError::Configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.albedo) {
            return Err(ClimvizError::Configuration(format!(
                "albedo must be within [0, 1], got {}",
                self.albedo
            )));
        }
        if self.num_layers == 0 {
            return Err(ClimvizError::Configuration(
                "num_layers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Converged state of a [`GreyRadiationModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreySounding {
    pub column: AtmosphericColumn,
    pub olr: f64,
    pub asr: f64,
    /// Number of model years integrated before convergence
    pub years: usize,
}

#[derive(Debug, Clone)]
pub struct GreyRadiationModel {
    parameters: GreyRadiationParameters,
    levels: LevelAxis,
    absorptivity: Vec<f64>,
    heat_capacity: Vec<f64>,
    surface_heat_capacity: f64,
    temperatures: Vec<f64>,
    surface_temperature: f64,
}

impl GreyRadiationModel {
    pub fn from_parameters(parameters: GreyRadiationParameters) -> ClimvizResult<Self> {
        parameters.validate()?;
        let levels = LevelAxis::standard(parameters.num_layers)?;
        let (absorptivity, heat_capacity) = (0..levels.len())
            .map(|k| {
                let mass = levels.thickness(k) * HPA_TO_PA / G;
                (
                    2.0 / (1.0 + 2.0 / (parameters.absorption_coefficient * mass)),
                    CP * mass,
                )
            })
            .unzip();
        let n = levels.len();
        Ok(Self {
            surface_heat_capacity: RHO_WATER * CW * parameters.water_depth,
            temperatures: vec![parameters.initial_temperature; n],
            surface_temperature: parameters.initial_temperature,
            absorptivity,
            heat_capacity,
            levels,
            parameters,
        })
    }

    pub fn parameters(&self) -> &GreyRadiationParameters {
        &self.parameters
    }

    /// Longwave absorptivity of each layer, surface first.
    pub fn absorptivity(&self) -> &[f64] {
        &self.absorptivity
    }

    pub fn surface_temperature(&self) -> f64 {
        self.surface_temperature
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Heating of the surface and of each layer (W/m^2), plus OLR and ASR.
    fn energy_budget(&self) -> (f64, Vec<f64>, f64, f64) {
        let n = self.levels.len();
        let lw = longwave(
            self.surface_temperature,
            &self.temperatures,
            &self.absorptivity,
        );
        let sw = shortwave(self.parameters.insolation, self.parameters.albedo, &vec![1.0; n]);

        let surface = (sw.down[0] - sw.up[0]) + (lw.down[0] - lw.up[0]);
        let layers = (0..n)
            .map(|k| {
                (lw.up[k] - lw.up[k + 1])
                    + (lw.down[k + 1] - lw.down[k])
                    + (sw.down[k + 1] - sw.down[k])
                    + (sw.up[k] - sw.up[k + 1])
            })
            .collect();
        (surface, layers, lw.up[n], sw.down[n] - sw.up[n])
    }

    /// Advance the model by one time step.
    pub fn step(&mut self) {
        let dt = self.parameters.timestep_days * SECONDS_PER_DAY;
        let (surface, layers, _, _) = self.energy_budget();
        self.surface_temperature += dt * surface / self.surface_heat_capacity;
        for ((temperature, heating), capacity) in self
            .temperatures
            .iter_mut()
            .zip(layers)
            .zip(&self.heat_capacity)
        {
            *temperature += dt * heating / capacity;
        }
    }

    fn steps_per_year(&self) -> usize {
        ((DAYS_PER_YEAR as f64 / self.parameters.timestep_days).round() as usize).max(1)
    }

    /// Integrate one year at a time until no temperature changes by more than
    /// `tolerance` (K) over a year.
    pub fn integrate_converge(
        &mut self,
        tolerance: f64,
        max_years: usize,
    ) -> ClimvizResult<GreySounding> {
        let steps = self.steps_per_year();
        for year in 1..=max_years {
            let surface_before = self.surface_temperature;
            let before = self.temperatures.clone();
            for _ in 0..steps {
                self.step();
            }
            let change = before
                .iter()
                .zip(&self.temperatures)
                .map(|(a, b)| (a - b).abs())
                .fold((surface_before - self.surface_temperature).abs(), f64::max);
            debug!(year, change, "Integrated grey column");
            if !change.is_finite() {
                return Err(ClimvizError::Configuration(format!(
                    "grey column diverged after {} years",
                    year
                )));
            }
            if change < tolerance {
                let sounding = self.sounding(year)?;
                info!(
                    years = year,
                    surface_temperature = self.surface_temperature,
                    olr = sounding.olr,
                    "Grey column converged"
                );
                return Ok(sounding);
            }
        }
        Err(ClimvizError::NotConverged { years: max_years })
    }

    fn sounding(&self, years: usize) -> ClimvizResult<GreySounding> {
        let (_, _, olr, asr) = self.energy_budget();
        Ok(GreySounding {
            column: AtmosphericColumn::new(
                self.levels.clone(),
                self.temperatures.clone(),
                self.surface_temperature,
            )?,
            olr,
            asr,
            years,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SIGMA;
    use approx::assert_relative_eq;

    fn converge(num_layers: usize) -> GreySounding {
        let mut model = GreyRadiationModel::from_parameters(GreyRadiationParameters {
            num_layers,
            ..GreyRadiationParameters::default()
        })
        .unwrap();
        model.integrate_converge(1e-4, 100).unwrap()
    }

    #[test]
    fn test_single_layer_matches_layer_model() {
        let sounding = converge(1);
        let asr = 341.3 * (1.0 - 0.299);
        let emission_temperature = (asr / SIGMA).powf(0.25);
        let eps: f64 = 2.0 / (1.0 + 2.0 * 9.8 / (1.229e-4 * 1e5));

        let surface = emission_temperature * (2.0 / (2.0 - eps)).powf(0.25);
        let layer = emission_temperature * (1.0 / (2.0 - eps)).powf(0.25);

        assert_relative_eq!(sounding.column.surface_temperature(), surface, epsilon = 0.01);
        assert_relative_eq!(sounding.column.temperatures()[0], layer, epsilon = 0.01);
        assert_relative_eq!(sounding.olr, asr, epsilon = 1e-3);
        assert_relative_eq!(sounding.asr, asr, epsilon = 1e-9);
    }

    #[test]
    fn test_more_layers_cool_with_height() {
        let sounding = converge(5);
        assert_eq!(sounding.column.num_levels(), 5);
        assert!(sounding
            .column
            .temperatures()
            .windows(2)
            .all(|w| w[1] < w[0]));
        assert!(sounding.years < 100);
    }

    #[test]
    fn test_not_converged() {
        let mut model = GreyRadiationModel::from_parameters(GreyRadiationParameters {
            initial_temperature: 200.0,
            ..GreyRadiationParameters::default()
        })
        .unwrap();
        let err = model.integrate_converge(1e-4, 1).unwrap_err();
        assert!(matches!(err, ClimvizError::NotConverged { years: 1 }));
    }

    #[test]
    fn test_absorptivity_decreases_with_layer_count() {
        let one = GreyRadiationModel::from_parameters(GreyRadiationParameters::default()).unwrap();
        let ten = GreyRadiationModel::from_parameters(GreyRadiationParameters {
            num_layers: 10,
            ..GreyRadiationParameters::default()
        })
        .unwrap();
        assert_relative_eq!(one.absorptivity()[0], 0.7707745, epsilon = 1e-6);
        assert!(ten.absorptivity().iter().all(|e| *e < one.absorptivity()[0]));
    }

    #[test]
    fn test_invalid_parameters() {
        for parameters in [
            GreyRadiationParameters {
                num_layers: 0,
                ..GreyRadiationParameters::default()
            },
            GreyRadiationParameters {
                albedo: 1.5,
                ..GreyRadiationParameters::default()
            },
            GreyRadiationParameters {
                water_depth: 0.0,
                ..GreyRadiationParameters::default()
            },
        ] {
            assert!(GreyRadiationModel::from_parameters(parameters).is_err());
        }
    }
}
