//! Point exploration.
//!
//! Evaluates one set of displayed parameter values and gathers everything
//! the exploration view shows for it.

use crate::column::AtmosphericColumn;
use crate::config::{ColumnOptions, EquilibriumOptions};
use crate::diagnostics::{flux_profiles, temperature_profile, toa_indicators, Indicator, ProfileSeries};
use crate::equilibrium::{find_equilibrium_temperature, Equilibrium};
use crate::errors::ClimvizResult;
use crate::gases::GasConcentrationVector;
use crate::parameters::{ModelInputs, ParameterSet};
use crate::radiation::{RadiativeFluxResult, RadiativeSolver};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Result of exploring one point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSummary {
    pub inputs: ModelInputs,
    pub column: AtmosphericColumn,
    pub fluxes: RadiativeFluxResult,
    pub indicators: [Indicator; 3],
    pub temperature: ProfileSeries,
    pub flux_profiles: Vec<ProfileSeries>,
}

impl PointSummary {
    pub fn net_flux(&self) -> f64 {
        self.fluxes.net_flux()
    }
}

/// Build the column for `parameters` and compute its fluxes and plots.
pub fn explore_point(
    solver: &RadiativeSolver,
    parameters: &ParameterSet,
    template: &GasConcentrationVector,
    column_options: &ColumnOptions,
) -> ClimvizResult<PointSummary> {
    let inputs = parameters.resolve(template)?;
    let run = solver.run_column(&inputs, column_options)?;
    info!(
        surface_temperature = inputs.surface_temperature,
        olr = run.fluxes.olr(),
        asr = run.fluxes.asr(),
        "Explored point"
    );
    Ok(PointSummary {
        indicators: toa_indicators(&run.fluxes),
        temperature: temperature_profile(&run.column),
        flux_profiles: flux_profiles(&run.column, &run.fluxes),
        inputs,
        column: run.column,
        fluxes: run.fluxes,
    })
}

/// Equilibrium surface temperature for the composition and humidity of
/// `parameters`. The displayed surface temperature is ignored.
pub fn point_equilibrium(
    solver: &RadiativeSolver,
    parameters: &ParameterSet,
    template: &GasConcentrationVector,
    column_options: &ColumnOptions,
    equilibrium_options: &EquilibriumOptions,
) -> ClimvizResult<Equilibrium> {
    let inputs = parameters.resolve(template)?;
    find_equilibrium_temperature(
        solver,
        &inputs.gases,
        inputs.relative_humidity,
        column_options,
        equilibrium_options,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Arrow, Tone};
    use crate::gases::GasSpecies;
    use crate::parameters::ParameterId;
    use crate::radiation::GreyGasModel;
    use std::sync::Arc;

    fn solver() -> RadiativeSolver {
        RadiativeSolver::new(Arc::new(GreyGasModel::default()))
    }

    fn column_options() -> ColumnOptions {
        ColumnOptions {
            num_levels: 30,
            ..ColumnOptions::default()
        }
    }

    #[test]
    fn test_explore_default_point() {
        let summary = explore_point(
            &solver(),
            &ParameterSet::default(),
            &GasConcentrationVector::zeros(),
            &column_options(),
        )
        .unwrap();

        assert_eq!(summary.inputs.gases.get(GasSpecies::CO2), 400e-6);
        assert_eq!(summary.column.num_levels(), 30);
        assert_eq!(summary.temperature.values.len(), 30);
        assert_eq!(summary.flux_profiles.len(), 4);
        assert_eq!(summary.indicators[1].value, summary.fluxes.olr());
        assert_eq!(summary.indicators[0].style.arrow, Arrow::Down);
    }

    #[test]
    fn test_warm_point_loses_energy() {
        let parameters = ParameterSet::default()
            .with_value(ParameterId::SurfaceTemperature, 290.0)
            .unwrap();
        let summary = explore_point(
            &solver(),
            &parameters,
            &GasConcentrationVector::zeros(),
            &column_options(),
        )
        .unwrap();
        assert!(summary.net_flux() > 0.0);
        assert_eq!(summary.indicators[2].style.tone, Tone::Loss);
    }

    #[test]
    fn test_point_equilibrium_ignores_surface_temperature() {
        let template = GasConcentrationVector::zeros();
        let cold = ParameterSet::default()
            .with_value(ParameterId::SurfaceTemperature, 250.0)
            .unwrap();
        let warm = ParameterSet::default()
            .with_value(ParameterId::SurfaceTemperature, 290.0)
            .unwrap();
        let options = EquilibriumOptions::default();

        let a = point_equilibrium(&solver(), &cold, &template, &column_options(), &options).unwrap();
        let b = point_equilibrium(&solver(), &warm, &template, &column_options(), &options).unwrap();
        assert!((a.surface_temperature - b.surface_temperature).abs() < 1e-4);
    }

    #[test]
    fn test_losing_point_equilibrates_colder() {
        let template = GasConcentrationVector::zeros();
        let parameters = ParameterSet::default()
            .with_value(ParameterId::SurfaceTemperature, 290.0)
            .unwrap();
        let column = column_options();

        let summary = explore_point(&solver(), &parameters, &template, &column).unwrap();
        let equilibrium = point_equilibrium(
            &solver(),
            &parameters,
            &template,
            &column,
            &EquilibriumOptions::default(),
        )
        .unwrap();
        assert!(summary.net_flux() > 0.0);
        assert!(equilibrium.surface_temperature < summary.inputs.surface_temperature);
    }
}
