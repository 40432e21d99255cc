//! Equilibrium Solver
//!
//! Finds the surface temperature at which the idealised column is in
//! radiative balance at the top of the atmosphere:
//!
//! $$ f(T_s) = OLR(T_s) - ASR(T_s) = 0 $$
//!
//! Each evaluation of $f$ builds a fresh column at the trial surface
//! temperature and runs the radiative model on it. The root is located with
//! Brent's method inside the configured bracket; the initial guess, when it
//! lies inside the bracket, is used to narrow the bracket before iterating.
//! Residuals already computed at the bracket ends are reused by the root
//! finder.

use crate::config::{ColumnOptions, EquilibriumOptions};
use crate::errors::{ClimvizError, ClimvizResult, Computation};
use crate::gases::GasConcentrationVector;
use crate::parameters::ModelInputs;
use crate::radiation::RadiativeSolver;
use crate::utils::root_finding::{brent_bracketed, RootError, RootOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A located radiative equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    /// Surface temperature (K)
    pub surface_temperature: f64,
    /// Remaining $OLR - ASR$ at that temperature (W/m^2)
    pub net_flux: f64,
    /// Number of column evaluations used
    pub evaluations: usize,
}

/// Search for the equilibrium surface temperature.
///
/// The stratospheric temperature, number of levels and stratospheric
/// humidity floor of every trial column come from `column`.
///
/// Returns [`ClimvizError::NoEquilibriumFound`] if the net flux has the same
/// sign at both ends of the bracket.
pub fn find_equilibrium_temperature(
    solver: &RadiativeSolver,
    gases: &GasConcentrationVector,
    relative_humidity: f64,
    column: &ColumnOptions,
    options: &EquilibriumOptions,
) -> ClimvizResult<Equilibrium> {
    options.validate()?;
    column.validate()?;

    let inputs_at = |surface_temperature: f64| ModelInputs {
        surface_temperature,
        relative_humidity,
        gases: *gases,
    };
    let net_flux_at = |surface_temperature: f64| -> ClimvizResult<f64> {
        let run = solver
            .run_column(&inputs_at(surface_temperature), column)
            .map_err(|e| e.during(Computation::PointEquilibrium))?;
        Ok(run.fluxes.net_flux())
    };

    let [low, high] = options.bracket;
    let residual_low = net_flux_at(low)?;
    let residual_high = net_flux_at(high)?;
    let mut evaluations = 2;

    for (surface_temperature, residual) in [(low, residual_low), (high, residual_high)] {
        if residual == 0.0 {
            return Ok(Equilibrium {
                surface_temperature,
                net_flux: 0.0,
                evaluations,
            });
        }
    }
    if residual_low.signum() == residual_high.signum() {
        return Err(ClimvizError::NoEquilibriumFound {
            computation: Computation::PointEquilibrium,
            inputs: Box::new(inputs_at(options.initial_guess)),
            low,
            high,
            residual_low,
            residual_high,
        });
    }

    let (mut lower, mut upper) = ((low, residual_low), (high, residual_high));
    let guess = options.initial_guess;
    if guess > low && guess < high {
        let residual_guess = net_flux_at(guess)?;
        evaluations += 1;
        if residual_guess == 0.0 {
            return Ok(Equilibrium {
                surface_temperature: guess,
                net_flux: 0.0,
                evaluations,
            });
        }
        if residual_guess.signum() == residual_low.signum() {
            lower = (guess, residual_guess);
        } else {
            upper = (guess, residual_guess);
        }
    }

    let root_options = RootOptions {
        xtol: options.xtol,
        max_iterations: options.max_iterations,
        ..RootOptions::default()
    };
    let root = brent_bracketed(net_flux_at, lower, upper, &root_options).map_err(|e| match e {
        RootError::Objective(err) => err,
        RootError::NoSignChange { a, b, fa, fb } => ClimvizError::NoEquilibriumFound {
            computation: Computation::PointEquilibrium,
            inputs: Box::new(inputs_at(guess)),
            low: a,
            high: b,
            residual_low: fa,
            residual_high: fb,
        },
        RootError::MaxIterations(n) => ClimvizError::SolverFailure {
            computation: Computation::PointEquilibrium,
            inputs: Box::new(inputs_at(guess)),
            reason: format!("equilibrium search did not converge in {} iterations", n),
        },
    })?;

    let equilibrium = Equilibrium {
        surface_temperature: root.x,
        net_flux: root.residual,
        evaluations: evaluations + root.evaluations,
    };
    debug!(
        surface_temperature = equilibrium.surface_temperature,
        net_flux = equilibrium.net_flux,
        evaluations = equilibrium.evaluations,
        "Found equilibrium surface temperature"
    );
    Ok(equilibrium)
}
