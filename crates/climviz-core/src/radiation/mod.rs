//! Radiative Solver Adapter
//!
//! The radiative transfer calculation itself sits behind the [`RadiativeModel`]
//! trait and is treated as a black box. [`RadiativeSolver`] is the adapter
//! around it:
//!
//! 1. Builds a fixed relative humidity [`HumidityProfile`] for the column
//! 2. Hands column, humidity and gas concentrations to the model (clear sky only)
//! 3. Checks the returned flux profiles and wraps any model failure in a
//!    [`ClimvizError::SolverFailure`] that carries the offending inputs
//!
//! Flux profiles are reported on layer interfaces, surface first, so each
//! profile has one more entry than the column has levels.

mod grey_gas;
pub mod two_stream;

pub use grey_gas::{GasOptics, GreyGasModel, GreyGasOptics};

use crate::column::{build_idealized_column, AtmosphericColumn};
use crate::config::ColumnOptions;
use crate::errors::{ClimvizError, ClimvizResult, Computation};
use crate::gases::GasConcentrationVector;
use crate::humidity::HumidityProfile;
use crate::parameters::ModelInputs;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Failure reported by a radiative model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("input rejected: {0}")]
    Rejected(String),
    #[error("did not converge: {0}")]
    NotConverged(String),
}

/// Everything a radiative model is given for one calculation.
#[derive(Debug, Clone)]
pub struct RadiationRequest {
    pub column: AtmosphericColumn,
    pub humidity: HumidityProfile,
    pub gases: GasConcentrationVector,
    /// Clouds are not modelled; the adapter always asks for clear-sky fluxes.
    pub clear_sky: bool,
}

/// A radiative transfer model.
///
/// Implementations compute their diagnostics for the requested column and
/// return a fresh result. They must be safe to call from several threads at
/// once since sensitivity sweeps evaluate grid points in parallel.
pub trait RadiativeModel: Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn compute_diagnostics(
        &self,
        request: &RadiationRequest,
    ) -> Result<RadiativeFluxResult, ModelError>;
}

/// Radiative fluxes of one column (W/m^2).
///
/// Profiles are on layer interfaces, surface first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiativeFluxResult {
    lw_flux_up: Vec<f64>,
    lw_flux_down: Vec<f64>,
    sw_flux_up: Vec<f64>,
    sw_flux_down: Vec<f64>,
    olr: f64,
    asr: f64,
}

impl RadiativeFluxResult {
    pub fn new(
        lw_flux_up: Vec<f64>,
        lw_flux_down: Vec<f64>,
        sw_flux_up: Vec<f64>,
        sw_flux_down: Vec<f64>,
        olr: f64,
        asr: f64,
    ) -> Self {
        Self {
            lw_flux_up,
            lw_flux_down,
            sw_flux_up,
            sw_flux_down,
            olr,
            asr,
        }
    }

    pub fn lw_flux_up(&self) -> &[f64] {
        &self.lw_flux_up
    }

    pub fn lw_flux_down(&self) -> &[f64] {
        &self.lw_flux_down
    }

    pub fn sw_flux_up(&self) -> &[f64] {
        &self.sw_flux_up
    }

    pub fn sw_flux_down(&self) -> &[f64] {
        &self.sw_flux_down
    }

    /// Outgoing longwave radiation at the top of the atmosphere.
    pub fn olr(&self) -> f64 {
        self.olr
    }

    /// Absorbed shortwave radiation at the top of the atmosphere.
    pub fn asr(&self) -> f64 {
        self.asr
    }

    /// Net top-of-atmosphere flux, $OLR - ASR$.
    ///
    /// Positive values mean the column is losing energy to space.
    pub fn net_flux(&self) -> f64 {
        crate::diagnostics::net_flux(self.olr, self.asr)
    }

    fn check_shape(&self, num_levels: usize) -> Result<(), String> {
        let expected = num_levels + 1;
        let profiles = [
            ("LW up", &self.lw_flux_up),
            ("LW down", &self.lw_flux_down),
            ("SW up", &self.sw_flux_up),
            ("SW down", &self.sw_flux_down),
        ];
        for (name, profile) in profiles {
            if profile.len() != expected {
                return Err(format!(
                    "{} profile has {} values, expected {}",
                    name,
                    profile.len(),
                    expected
                ));
            }
            if profile.iter().any(|v| !v.is_finite()) {
                return Err(format!("{} profile contains non-finite values", name));
            }
        }
        if !self.olr.is_finite() || !self.asr.is_finite() {
            return Err(format!("non-finite OLR ({}) or ASR ({})", self.olr, self.asr));
        }
        Ok(())
    }
}

/// An idealised column together with its fluxes.
#[derive(Debug, Clone)]
pub struct ColumnRun {
    pub column: AtmosphericColumn,
    pub fluxes: RadiativeFluxResult,
}

/// Adapter around a [`RadiativeModel`].
#[derive(Debug, Clone)]
pub struct RadiativeSolver {
    model: Arc<dyn RadiativeModel>,
    timeout: Option<Duration>,
}

impl RadiativeSolver {
    pub fn new(model: Arc<dyn RadiativeModel>) -> Self {
        Self {
            model,
            timeout: None,
        }
    }

    /// Bound every model call by `timeout`.
    ///
    /// The call runs on a helper thread; if it has not returned in time the
    /// adapter reports a [`ClimvizError::SolverFailure`] and abandons the thread.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &dyn RadiativeModel {
        self.model.as_ref()
    }

    /// Clear-sky fluxes of `column` under a fixed relative humidity.
    pub fn compute_fluxes(
        &self,
        column: &AtmosphericColumn,
        gases: &GasConcentrationVector,
        relative_humidity: f64,
        stratosphere_min_humidity: f64,
    ) -> ClimvizResult<RadiativeFluxResult> {
        let humidity = HumidityProfile::fixed_relative_humidity(
            column,
            relative_humidity,
            stratosphere_min_humidity,
        )?;
        let failure = |reason: String| {
            warn!(
                model = self.model.name(),
                surface_temperature = column.surface_temperature(),
                relative_humidity,
                reason = %reason,
                "Radiative model failed"
            );
            ClimvizError::SolverFailure {
                computation: Computation::Fluxes,
                inputs: Box::new(ModelInputs {
                    surface_temperature: column.surface_temperature(),
                    relative_humidity,
                    gases: *gases,
                }),
                reason,
            }
        };

        let request = RadiationRequest {
            column: column.clone(),
            humidity,
            gases: *gases,
            clear_sky: true,
        };
        let result = self.call_model(request).map_err(&failure)?;
        result
            .check_shape(column.num_levels())
            .map_err(|reason| failure(format!("malformed result: {}", reason)))?;
        Ok(result)
    }

    /// Build the idealised column for `inputs` and compute its fluxes.
    pub fn run_column(
        &self,
        inputs: &ModelInputs,
        options: &ColumnOptions,
    ) -> ClimvizResult<ColumnRun> {
        let column = build_idealized_column(
            inputs.surface_temperature,
            options.num_levels,
            options.stratosphere_temperature,
        )?;
        let fluxes = self.compute_fluxes(
            &column,
            &inputs.gases,
            inputs.relative_humidity,
            options.min_specific_humidity,
        )?;
        Ok(ColumnRun { column, fluxes })
    }

    fn call_model(&self, request: RadiationRequest) -> Result<RadiativeFluxResult, String> {
        let Some(timeout) = self.timeout else {
            return self
                .model
                .compute_diagnostics(&request)
                .map_err(|e| e.to_string());
        };

        let model = Arc::clone(&self.model);
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            // The receiver is gone if the caller already timed out
            let _ = sender.send(model.compute_diagnostics(&request));
        });
        match receiver.recv_timeout(timeout) {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(RecvTimeoutError::Timeout) => {
                Err(format!("no result within {:.3} s", timeout.as_secs_f64()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err("solver thread terminated without a result".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gases::GasSpecies;

    #[derive(Debug)]
    struct ShortProfiles;

    impl RadiativeModel for ShortProfiles {
        fn name(&self) -> &str {
            "short"
        }

        fn compute_diagnostics(
            &self,
            _request: &RadiationRequest,
        ) -> Result<RadiativeFluxResult, ModelError> {
            Ok(RadiativeFluxResult::new(
                vec![1.0],
                vec![1.0],
                vec![1.0],
                vec![1.0],
                240.0,
                240.0,
            ))
        }
    }

    #[derive(Debug)]
    struct Sleeper(Duration);

    impl RadiativeModel for Sleeper {
        fn name(&self) -> &str {
            "sleeper"
        }

        fn compute_diagnostics(
            &self,
            request: &RadiationRequest,
        ) -> Result<RadiativeFluxResult, ModelError> {
            thread::sleep(self.0);
            GreyGasModel::default().compute_diagnostics(request)
        }
    }

    fn column() -> AtmosphericColumn {
        build_idealized_column(280.0, 20, 195.0).unwrap()
    }

    #[test]
    fn test_grey_model_through_adapter() {
        let solver = RadiativeSolver::new(Arc::new(GreyGasModel::default()));
        let gases = GasConcentrationVector::zeros()
            .with_ppm(GasSpecies::CO2, 400.0)
            .unwrap();
        let result = solver.compute_fluxes(&column(), &gases, 0.8, 5e-6).unwrap();

        assert_eq!(result.lw_flux_up().len(), 21);
        assert_eq!(result.olr(), *result.lw_flux_up().last().unwrap());
        assert_eq!(result.net_flux(), result.olr() - result.asr());
    }

    #[test]
    fn test_malformed_result_is_solver_failure() {
        let solver = RadiativeSolver::new(Arc::new(ShortProfiles));
        let err = solver
            .compute_fluxes(&column(), &GasConcentrationVector::zeros(), 0.8, 5e-6)
            .unwrap_err();
        match err {
            ClimvizError::SolverFailure {
                computation,
                inputs,
                reason,
            } => {
                assert_eq!(computation, Computation::Fluxes);
                assert_eq!(inputs.surface_temperature, 280.0);
                assert!(reason.contains("malformed"), "{}", reason);
            }
            other => panic!("Unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_timeout_reports_solver_failure() {
        let solver = RadiativeSolver::new(Arc::new(Sleeper(Duration::from_millis(500))))
            .with_timeout(Duration::from_millis(10));
        let err = solver
            .compute_fluxes(&column(), &GasConcentrationVector::zeros(), 0.8, 5e-6)
            .unwrap_err();
        assert!(matches!(err, ClimvizError::SolverFailure { .. }));
        assert!(err.to_string().contains("no result within"));
    }

    #[test]
    fn test_timeout_allows_fast_calls() {
        let solver = RadiativeSolver::new(Arc::new(GreyGasModel::default()))
            .with_timeout(Duration::from_secs(30));
        assert!(solver
            .compute_fluxes(&column(), &GasConcentrationVector::zeros(), 0.8, 5e-6)
            .is_ok());
    }

    #[test]
    fn test_invalid_humidity_is_configuration_error() {
        let solver = RadiativeSolver::new(Arc::new(GreyGasModel::default()));
        let err = solver
            .compute_fluxes(&column(), &GasConcentrationVector::zeros(), 2.0, 5e-6)
            .unwrap_err();
        assert!(matches!(err, ClimvizError::Configuration(_)));
    }
}
