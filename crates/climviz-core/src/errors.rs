use crate::parameters::ModelInputs;
use std::fmt;
use thiserror::Error;

/// The computation during which a failure happened.
///
/// Attached to solver and equilibrium failures so that a caller can report
/// exactly what was being computed and retry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computation {
    /// A single flux evaluation of one column.
    Fluxes,
    /// Equilibrium search for an interactively explored point.
    PointEquilibrium,
    /// One cell of a sensitivity sweep (`row` indexes parameter 2, `column` parameter 1).
    SweepPoint { row: usize, column: usize },
}

impl fmt::Display for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Computation::Fluxes => write!(f, "flux calculation"),
            Computation::PointEquilibrium => write!(f, "point equilibrium search"),
            Computation::SweepPoint { row, column } => {
                write!(f, "sweep point (row {}, column {})", row, column)
            }
        }
    }
}

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum ClimvizError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Radiative solver failed during {computation} with inputs [{inputs}]: {reason}")]
    SolverFailure {
        computation: Computation,
        inputs: Box<ModelInputs>,
        reason: String,
    },
    #[error("No equilibrium surface temperature in [{low}, {high}] K during {computation} with inputs [{inputs}]: net flux is {residual_low:.3} W/m^2 at {low} K and {residual_high:.3} W/m^2 at {high} K")]
    NoEquilibriumFound {
        computation: Computation,
        inputs: Box<ModelInputs>,
        low: f64,
        high: f64,
        residual_low: f64,
        residual_high: f64,
    },
    #[error("Model did not reach equilibrium within {years} years")]
    NotConverged { years: usize },
    #[error("Cancelled after {completed} of {total} grid points")]
    Cancelled { completed: usize, total: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Could not parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ClimvizError {
    /// Re-tag a solver or equilibrium failure with the computation it belongs to.
    ///
    /// Other variants are returned unchanged.
    pub fn during(self, computation: Computation) -> Self {
        match self {
            ClimvizError::SolverFailure { inputs, reason, .. } => ClimvizError::SolverFailure {
                computation,
                inputs,
                reason,
            },
            ClimvizError::NoEquilibriumFound {
                inputs,
                low,
                high,
                residual_low,
                residual_high,
                ..
            } => ClimvizError::NoEquilibriumFound {
                computation,
                inputs,
                low,
                high,
                residual_low,
                residual_high,
            },
            other => other,
        }
    }

    /// The computation a failure is tagged with, if any.
    pub fn computation(&self) -> Option<Computation> {
        match self {
            ClimvizError::SolverFailure { computation, .. }
            | ClimvizError::NoEquilibriumFound { computation, .. } => Some(*computation),
            _ => None,
        }
    }
}

/// Convenience type for `Result<T, ClimvizError>`.
pub type ClimvizResult<T> = Result<T, ClimvizError>;
