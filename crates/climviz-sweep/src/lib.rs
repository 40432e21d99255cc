//! Two-parameter sensitivity sweeps over the climviz column model.
//!
//! A sweep varies two parameters over independent linear grids, evaluates
//! the top-of-atmosphere fluxes and the equilibrium surface temperature at
//! every grid point and collects the results into a [`SensitivityDataset`].
//! Datasets and saved parameter sets live in a [`SessionStore`].

pub mod dataset;
pub mod engine;
pub mod grid;
pub mod store;

pub use dataset::{FailureStage, PointFailure, SensitivityDataset, SensitivityPoint, SweepOutput};
pub use engine::{CancellationToken, SweepEngine, SweepRequest};
pub use grid::{linspace, SweepAxis};
pub use store::SessionStore;

use climviz_core::errors::ClimvizError;
use thiserror::Error;

/// Error type for sweep operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ClimvizError),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
