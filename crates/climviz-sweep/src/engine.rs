//! Sensitivity Sweep Engine
//!
//! Evaluates every cell of a two-parameter grid:
//!
//! 1. Overlay the two grid values on a copy of the base parameters
//! 2. Resolve them into model inputs (ppm concentrations become mixing ratios)
//! 3. Compute the fluxes at the point's surface temperature, using the fixed
//!    sweep stratospheric temperature
//! 4. Search for the equilibrium surface temperature of the point's
//!    composition and humidity, using the column's stratospheric temperature
//!
//! Grid points are independent and can be evaluated on the rayon thread pool.
//! A failing point does not abort the sweep: its outputs are NaN and the
//! failure is recorded on the point.

use crate::dataset::{FailureStage, PointFailure, SensitivityDataset, SensitivityPoint};
use crate::grid::SweepAxis;
use crate::Result;
use climviz_core::config::{ClimvizConfig, ColumnOptions, EquilibriumOptions, SweepOptions};
use climviz_core::equilibrium::find_equilibrium_temperature;
use climviz_core::errors::{ClimvizError, Computation};
use climviz_core::gases::GasConcentrationVector;
use climviz_core::parameters::{ParameterId, ParameterSet};
use climviz_core::radiation::RadiativeSolver;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative cancellation of a running sweep.
///
/// Checked before each grid point is evaluated; points already running are
/// finished.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What to sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRequest {
    /// Name the dataset is stored under
    pub name: String,
    pub axis1: SweepAxis,
    pub axis2: SweepAxis,
    /// Values of the parameters that are not swept
    pub base: ParameterSet,
}

impl SweepRequest {
    pub fn new(
        name: impl Into<String>,
        axis1: SweepAxis,
        axis2: SweepAxis,
        base: ParameterSet,
    ) -> Result<Self> {
        let request = Self {
            name: name.into(),
            axis1,
            axis2,
            base,
        };
        request.validate()?;
        Ok(request)
    }

    /// Reject requests that cannot be evaluated before any solver call.
    pub fn validate(&self) -> Result<()> {
        if self.axis1.parameter == self.axis2.parameter {
            return Err(ClimvizError::Configuration(format!(
                "Cannot sweep {} against itself",
                self.axis1.parameter
            ))
            .into());
        }
        for axis in [&self.axis1, &self.axis2] {
            // Also re-checks an axis that was deserialised rather than built
            SweepAxis::new(axis.parameter, axis.min, axis.max, axis.n)?;
            let allowed = self.base.entry(axis.parameter);
            for value in [axis.min, axis.max] {
                if value < allowed.min || value > allowed.max {
                    return Err(ClimvizError::Configuration(format!(
                        "{} = {} is outside [{}, {}]",
                        axis.parameter, value, allowed.min, allowed.max
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.axis1.n * self.axis2.n
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct GridCell {
    i: usize,
    j: usize,
    v1: f64,
    v2: f64,
    parameters: ParameterSet,
}

/// Runs sweeps against one radiative solver.
#[derive(Debug, Clone)]
pub struct SweepEngine {
    solver: RadiativeSolver,
    template: GasConcentrationVector,
    column: ColumnOptions,
    equilibrium: EquilibriumOptions,
    options: SweepOptions,
}

impl SweepEngine {
    pub fn new(solver: RadiativeSolver, config: &ClimvizConfig) -> Self {
        Self {
            solver,
            template: GasConcentrationVector::zeros(),
            column: config.column.clone(),
            equilibrium: config.equilibrium.clone(),
            options: config.sweep.clone(),
        }
    }

    /// Concentrations of the gases that are not parameters.
    pub fn with_template(mut self, template: GasConcentrationVector) -> Self {
        self.template = template;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    /// Evaluate every grid point of `request`.
    ///
    /// Returns [`ClimvizError::Cancelled`] if `cancel` fires before the last
    /// point has started.
    pub fn run_sweep(
        &self,
        request: &SweepRequest,
        cancel: &CancellationToken,
    ) -> Result<SensitivityDataset> {
        request.validate()?;
        self.column.validate()?;
        self.options.validate()?;

        let cells = self.grid(request)?;
        let total = cells.len();
        info!(
            name = %request.name,
            param1 = %request.axis1.parameter,
            param2 = %request.axis2.parameter,
            points = total,
            parallel = self.options.parallel,
            "Starting sensitivity sweep"
        );

        let evaluate = |cell: &GridCell| {
            if cancel.is_cancelled() {
                None
            } else {
                Some(self.evaluate(request, cell))
            }
        };
        let results: Vec<Option<SensitivityPoint>> = if self.options.parallel {
            cells.par_iter().map(evaluate).collect()
        } else {
            let mut results = Vec::with_capacity(total);
            for cell in &cells {
                let result = evaluate(cell);
                let stop = result.is_none();
                results.push(result);
                if stop {
                    break;
                }
            }
            results
        };

        let completed = results.iter().filter(|r| r.is_some()).count();
        if completed < total {
            warn!(name = %request.name, completed, total, "Sensitivity sweep cancelled");
            return Err(ClimvizError::Cancelled { completed, total }.into());
        }
        let points: Vec<SensitivityPoint> = results.into_iter().flatten().collect();

        let dataset =
            SensitivityDataset::new(request.axis1.clone(), request.axis2.clone(), points)?;
        info!(
            name = %request.name,
            points = total,
            failures = dataset.failures().count(),
            "Finished sensitivity sweep"
        );
        Ok(dataset)
    }

    /// Overlay every grid point on the base parameters, in row-major order.
    fn grid(&self, request: &SweepRequest) -> Result<Vec<GridCell>> {
        let values2 = request.axis2.values();
        let mut cells = Vec::with_capacity(request.len());
        for (i, v1) in request.axis1.values().into_iter().enumerate() {
            let row = request.base.with_value(request.axis1.parameter, v1)?;
            for (j, &v2) in values2.iter().enumerate() {
                cells.push(GridCell {
                    i,
                    j,
                    v1,
                    v2,
                    parameters: row.with_value(request.axis2.parameter, v2)?,
                });
            }
        }
        Ok(cells)
    }

    fn evaluate(&self, request: &SweepRequest, cell: &GridCell) -> SensitivityPoint {
        let computation = Computation::SweepPoint {
            row: cell.j,
            column: cell.i,
        };
        let label = |id: ParameterId| id.label().to_string();
        let mut point = SensitivityPoint {
            param1_index: cell.i,
            param2_index: cell.j,
            param1: request.axis1.parameter,
            param2: request.axis2.parameter,
            param1_label: label(request.axis1.parameter),
            param2_label: label(request.axis2.parameter),
            param1_value: cell.v1,
            param2_value: cell.v2,
            options: cell.parameters.clone(),
            olr: f64::NAN,
            asr: f64::NAN,
            net_flux: f64::NAN,
            equilibrium_surface_temperature: f64::NAN,
            failure: None,
        };
        let fail = |stage: FailureStage, error: ClimvizError| {
            let error = error.during(computation);
            warn!(
                name = %request.name,
                row = cell.j,
                column = cell.i,
                stage = ?stage,
                error = %error,
                "Sweep point failed"
            );
            PointFailure {
                stage,
                message: error.to_string(),
            }
        };

        let inputs = match cell.parameters.resolve(&self.template) {
            Ok(inputs) => inputs,
            Err(e) => {
                point.failure = Some(fail(FailureStage::Fluxes, e));
                return point;
            }
        };

        match self
            .solver
            .run_column(&inputs, &self.options.flux_column(&self.column))
        {
            Ok(run) => {
                point.olr = run.fluxes.olr();
                point.asr = run.fluxes.asr();
                point.net_flux = run.fluxes.net_flux();
            }
            Err(e) => {
                point.failure = Some(fail(FailureStage::Fluxes, e));
                return point;
            }
        }

        match find_equilibrium_temperature(
            &self.solver,
            &inputs.gases,
            inputs.relative_humidity,
            &self.column,
            &self.equilibrium,
        ) {
            Ok(equilibrium) => {
                point.equilibrium_surface_temperature = equilibrium.surface_temperature;
            }
            Err(e) => point.failure = Some(fail(FailureStage::Equilibrium, e)),
        }
        point
    }
}
