//! Run configuration.
//!
//! All options have defaults and can be overridden from a TOML file:
//!
//! ```toml
//! solver_timeout_secs = 30.0
//!
//! [column]
//! num_levels = 60
//!
//! [sweep]
//! stratosphere_temperature = 190.0
//! parallel = false
//! ```

use crate::errors::{ClimvizError, ClimvizResult};
use crate::radiation::GreyGasOptics;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Options for building idealised columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOptions {
    /// Number of pressure levels.
    /// Default: 100
    pub num_levels: usize,
    /// Temperature of the isothermal stratosphere (K).
    /// Default: 195
    pub stratosphere_temperature: f64,
    /// Floor on specific humidity (kg/kg).
    /// Default: 5e-6
    pub min_specific_humidity: f64,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            num_levels: 100,
            stratosphere_temperature: 195.0,
            min_specific_humidity: 5e-6,
        }
    }
}

impl ColumnOptions {
    pub fn validate(&self) -> ClimvizResult<()> {
        if self.num_levels == 0 {
            return Err(ClimvizError::Configuration(
                "column.num_levels must be positive".to_string(),
            ));
        }
        if !(self.stratosphere_temperature.is_finite() && self.stratosphere_temperature > 0.0) {
            return Err(ClimvizError::Configuration(format!(
                "column.stratosphere_temperature must be a positive temperature, got {}",
                self.stratosphere_temperature
            )));
        }
        if !(self.min_specific_humidity.is_finite() && self.min_specific_humidity >= 0.0) {
            return Err(ClimvizError::Configuration(format!(
                "column.min_specific_humidity must be non-negative, got {}",
                self.min_specific_humidity
            )));
        }
        Ok(())
    }
}

/// Options for the equilibrium surface temperature search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquilibriumOptions {
    /// Surface temperatures bounding the search (K).
    /// Default: [250, 300]
    pub bracket: [f64; 2],
    /// Used to narrow the bracket when it lies strictly inside it (K).
    /// Default: 275
    pub initial_guess: f64,
    /// Absolute tolerance on the surface temperature (K).
    /// Default: 1e-6
    pub xtol: f64,
    /// Default: 100
    pub max_iterations: usize,
}

impl Default for EquilibriumOptions {
    fn default() -> Self {
        Self {
            bracket: [250.0, 300.0],
            initial_guess: 275.0,
            xtol: 1e-6,
            max_iterations: 100,
        }
    }
}

impl EquilibriumOptions {
    pub fn validate(&self) -> ClimvizResult<()> {
        let [low, high] = self.bracket;
        if !(low.is_finite() && high.is_finite() && low > 0.0 && low < high) {
            return Err(ClimvizError::Configuration(format!(
                "equilibrium.bracket must be an increasing pair of positive temperatures, got [{}, {}]",
                low, high
            )));
        }
        if !self.initial_guess.is_finite() {
            return Err(ClimvizError::Configuration(format!(
                "equilibrium.initial_guess must be finite, got {}",
                self.initial_guess
            )));
        }
        if !(self.xtol.is_finite() && self.xtol > 0.0) {
            return Err(ClimvizError::Configuration(format!(
                "equilibrium.xtol must be positive, got {}",
                self.xtol
            )));
        }
        if self.max_iterations == 0 {
            return Err(ClimvizError::Configuration(
                "equilibrium.max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for sensitivity sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    /// Stratospheric temperature used for the fluxes at each grid point (K).
    ///
    /// Sweeps use a fixed value that is independent of
    /// `column.stratosphere_temperature`, which still applies to the
    /// equilibrium search at each point.
    /// Default: 190
    pub stratosphere_temperature: f64,
    /// Evaluate grid points on the rayon thread pool.
    /// Default: true
    pub parallel: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            stratosphere_temperature: 190.0,
            parallel: true,
        }
    }
}

impl SweepOptions {
    pub fn validate(&self) -> ClimvizResult<()> {
        if !(self.stratosphere_temperature.is_finite() && self.stratosphere_temperature > 0.0) {
            return Err(ClimvizError::Configuration(format!(
                "sweep.stratosphere_temperature must be a positive temperature, got {}",
                self.stratosphere_temperature
            )));
        }
        Ok(())
    }

    /// Column options for the flux evaluation of a grid point.
    pub fn flux_column(&self, column: &ColumnOptions) -> ColumnOptions {
        ColumnOptions {
            stratosphere_temperature: self.stratosphere_temperature,
            ..column.clone()
        }
    }
}

/// Complete configuration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimvizConfig {
    pub column: ColumnOptions,
    pub equilibrium: EquilibriumOptions,
    pub sweep: SweepOptions,
    /// Optical properties of the grey-gas radiative model
    pub grey: GreyGasOptics,
    /// Upper bound on a single radiative model call (s). Unbounded if absent.
    pub solver_timeout_secs: Option<f64>,
}

impl ClimvizConfig {
    pub fn from_toml_str(content: &str) -> ClimvizResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ClimvizResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> ClimvizResult<()> {
        self.column.validate()?;
        self.equilibrium.validate()?;
        self.sweep.validate()?;
        self.solver_timeout()?;
        Ok(())
    }

    /// Bound on a single radiative model call, if any.
    ///
    /// Fails for values that are not positive or do not fit a [`Duration`].
    pub fn solver_timeout(&self) -> ClimvizResult<Option<Duration>> {
        let Some(secs) = self.solver_timeout_secs else {
            return Ok(None);
        };
        if !(secs.is_finite() && secs > 0.0) {
            return Err(ClimvizError::Configuration(format!(
                "solver_timeout_secs must be positive, got {}",
                secs
            )));
        }
        Duration::try_from_secs_f64(secs).map(Some).map_err(|e| {
            ClimvizError::Configuration(format!(
                "solver_timeout_secs = {} is not a valid duration: {}",
                secs, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ClimvizConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClimvizConfig::default());
        assert_eq!(config.column.num_levels, 100);
        assert_eq!(config.sweep.stratosphere_temperature, 190.0);
        assert_eq!(config.column.stratosphere_temperature, 195.0);
        assert!(config.solver_timeout().unwrap().is_none());
    }

    #[test]
    fn test_partial_override() {
        let config = ClimvizConfig::from_toml_str(
            r#"
solver_timeout_secs = 2.5

[column]
num_levels = 40

[equilibrium]
bracket = [240.0, 320.0]

[grey]
surface_albedo = 0.25
"#,
        )
        .unwrap();
        assert_eq!(config.column.num_levels, 40);
        assert_eq!(config.column.stratosphere_temperature, 195.0);
        assert_eq!(config.equilibrium.bracket, [240.0, 320.0]);
        assert_eq!(config.equilibrium.initial_guess, 275.0);
        assert_eq!(config.grey.surface_albedo, 0.25);
        assert_eq!(config.grey.diffusivity, 1.66);
        assert_eq!(
            config.solver_timeout().unwrap(),
            Some(Duration::from_millis(2500))
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        for content in [
            "[column]\nnum_levels = 0",
            "[equilibrium]\nbracket = [300.0, 250.0]",
            "[equilibrium]\nxtol = 0.0",
            "[sweep]\nstratosphere_temperature = -1.0",
            "solver_timeout_secs = 0.0",
            "solver_timeout_secs = 1e30",
        ] {
            let err = ClimvizConfig::from_toml_str(content).unwrap_err();
            assert!(
                matches!(err, ClimvizError::Configuration(_)),
                "{}: {:?}",
                content,
                err
            );
        }
    }

    #[test]
    fn test_oversized_timeout_is_configuration_error() {
        let config = ClimvizConfig {
            solver_timeout_secs: Some(1e30),
            ..ClimvizConfig::default()
        };
        assert!(matches!(
            config.solver_timeout(),
            Err(ClimvizError::Configuration(_))
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = ClimvizConfig::from_toml_str("[column\nnum_levels = 3").unwrap_err();
        assert!(matches!(err, ClimvizError::Toml(_)));
    }

    #[test]
    fn test_sweep_flux_column_keeps_resolution() {
        let column = ColumnOptions {
            num_levels: 30,
            ..ColumnOptions::default()
        };
        let flux = SweepOptions::default().flux_column(&column);
        assert_eq!(flux.num_levels, 30);
        assert_eq!(flux.stratosphere_temperature, 190.0);
    }
}
