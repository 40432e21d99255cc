//! Linear parameter grids.

use crate::Result;
use climviz_core::errors::ClimvizError;
use climviz_core::parameters::ParameterId;
use serde::{Deserialize, Serialize};

/// `n` evenly spaced values from `min` to `max`, both endpoints included.
///
/// `n == 1` gives `[min]` and `n == 0` an empty vector. The last value is
/// exactly `max`.
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
            values[n - 1] = max;
            values
        }
    }
}

/// One swept parameter: which parameter and over which grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub parameter: ParameterId,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl SweepAxis {
    /// Validated axis over `[min, max]` in the parameter's display units.
    pub fn new(parameter: ParameterId, min: f64, max: f64, n: usize) -> Result<Self> {
        let invalid = |reason: String| {
            ClimvizError::Configuration(format!("Invalid grid for {}: {}", parameter, reason))
        };
        if n == 0 {
            return Err(invalid("number of points must be positive".to_string()).into());
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(invalid(format!("range [{}, {}] is not finite", min, max)).into());
        }
        if min == max && n > 1 {
            return Err(invalid(format!(
                "range [{}, {}] is degenerate for {} points",
                min, max, n
            ))
            .into());
        }
        let definition = parameter.definition();
        for value in [min, max] {
            if value < definition.min || value > definition.max {
                return Err(invalid(format!(
                    "{} is outside the allowed range [{}, {}] {}",
                    value, definition.min, definition.max, definition.unit
                ))
                .into());
            }
        }
        Ok(Self {
            parameter,
            min,
            max,
            n,
        })
    }

    pub fn values(&self) -> Vec<f64> {
        linspace(self.min, self.max, self.n)
    }
}
