//! Column Builder
//!
//! Builds an idealised vertical temperature profile for a single atmospheric
//! column:
//!
//! 1. The pressure axis comes from [`LevelAxis::standard`]: equal-pressure layers
//!    between the surface and the top of the atmosphere.
//! 2. Temperature follows the pseudoadiabat upwards from the surface
//!    temperature, integrated with a fixed-step RK4 scheme in log-pressure.
//! 3. Every level colder than the stratospheric temperature is clamped to it
//!    (isothermal stratosphere).
//!
//! All per-level arrays are stored surface first, i.e. with pressure strictly
//! decreasing along the index.

use crate::constants::PS;
use crate::errors::{ClimvizError, ClimvizResult};
use crate::thermo::pseudoadiabat_lapse;
use nalgebra::Vector1;
use ode_solvers::{Rk4, System};
use serde::{Deserialize, Serialize};
use tracing::debug;

type ProfileState = Vector1<f64>;

/// RK4 sub-steps taken between two adjacent levels.
const SUBSTEPS_PER_LAYER: usize = 8;

/// Vertical discretisation of the column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelAxis {
    /// Layer mid-point pressures (hPa), surface first.
    points: Vec<f64>,
    /// Layer interface pressures (hPa), surface first; one longer than `points`.
    bounds: Vec<f64>,
}

impl LevelAxis {
    /// `num_levels` layers of equal pressure thickness between [`PS`] and 0 hPa.
    pub fn standard(num_levels: usize) -> ClimvizResult<Self> {
        if num_levels == 0 {
            return Err(ClimvizError::Configuration(
                "Number of levels must be positive".to_string(),
            ));
        }
        let dp = PS / num_levels as f64;
        let bounds = (0..=num_levels).map(|i| PS - dp * i as f64).collect();
        let points = (0..num_levels).map(|i| PS - dp * (i as f64 + 0.5)).collect();
        Ok(Self { points, bounds })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Pressure thickness of layer `index` (hPa).
    pub fn thickness(&self, index: usize) -> f64 {
        self.bounds[index] - self.bounds[index + 1]
    }
}

/// Temperature profile of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericColumn {
    levels: LevelAxis,
    /// Air temperature at each level (K), aligned with `levels.points()`.
    temperatures: Vec<f64>,
    surface_temperature: f64,
}

impl AtmosphericColumn {
    /// Assemble a column from an explicit profile.
    ///
    /// The profile must have one temperature per level.
    pub fn new(
        levels: LevelAxis,
        temperatures: Vec<f64>,
        surface_temperature: f64,
    ) -> ClimvizResult<Self> {
        if temperatures.len() != levels.len() {
            return Err(ClimvizError::Configuration(format!(
                "Expected {} temperatures, got {}",
                levels.len(),
                temperatures.len()
            )));
        }
        Ok(Self {
            levels,
            temperatures,
            surface_temperature,
        })
    }

    pub fn levels(&self) -> &LevelAxis {
        &self.levels
    }

    pub fn pressures(&self) -> &[f64] {
        self.levels.points()
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn surface_temperature(&self) -> f64 {
        self.surface_temperature
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// `(pressure, temperature)` pairs, surface first.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.levels
            .points()
            .iter()
            .copied()
            .zip(self.temperatures.iter().copied())
    }
}

/// Pseudoadiabat expressed in the log-pressure coordinate $x = \ln(p_0 / p)$.
///
/// With $dp/dx = -p$ the integration variable increases upwards, which keeps
/// the RK4 step positive.
struct PseudoadiabatSystem {
    p0: f64,
}

impl System<f64, ProfileState> for PseudoadiabatSystem {
    fn system(&self, x: f64, y: &ProfileState, dy: &mut ProfileState) {
        let pressure = self.p0 * (-x).exp();
        dy[0] = -pressure * pseudoadiabat_lapse(y[0], pressure);
    }
}

/// Integrate the pseudoadiabat through `pressures` (hPa, strictly decreasing),
/// starting from `surface_temperature` at the first level.
///
/// Levels colder than `stratosphere_temperature` are clamped to it.
pub fn idealized_temperature_profile(
    surface_temperature: f64,
    pressures: &[f64],
    stratosphere_temperature: f64,
) -> ClimvizResult<Vec<f64>> {
    let Some(&p0) = pressures.first() else {
        return Ok(vec![]);
    };
    if pressures.windows(2).any(|w| w[1] >= w[0]) {
        return Err(ClimvizError::Configuration(
            "Pressure levels must be strictly decreasing".to_string(),
        ));
    }

    let mut temperatures = Vec::with_capacity(pressures.len());
    let mut current = surface_temperature;
    temperatures.push(current);

    for window in pressures.windows(2) {
        let x_start = (p0 / window[0]).ln();
        let x_end = (p0 / window[1]).ln();
        let step = (x_end - x_start) / SUBSTEPS_PER_LAYER as f64;

        let mut solver = Rk4::new(
            PseudoadiabatSystem { p0 },
            x_start,
            ProfileState::new(current),
            x_end,
            step,
        );
        solver.integrate().map_err(|e| {
            ClimvizError::Configuration(format!(
                "Pseudoadiabat integration failed between {} and {} hPa: {:?}",
                window[0], window[1], e
            ))
        })?;
        current = value_at(solver.results().get(), x_end);
        temperatures.push(current);
    }

    // The clamp is applied after integrating so that the moist adiabat itself
    // is continuous through the tropopause.
    for temperature in temperatures.iter_mut() {
        if *temperature < stratosphere_temperature {
            *temperature = stratosphere_temperature;
        }
    }
    Ok(temperatures)
}

/// Select the integrated state nearest to `x_target`.
///
/// RK4 rounds the number of steps up, so the last output may sit one step past
/// the requested end point.
fn value_at((xs, ys): (&Vec<f64>, &Vec<ProfileState>), x_target: f64) -> f64 {
    xs.iter()
        .zip(ys.iter())
        .min_by(|(a, _), (b, _)| {
            (*a - x_target)
                .abs()
                .total_cmp(&(*b - x_target).abs())
        })
        .map(|(_, y)| y[0])
        .unwrap_or(f64::NAN)
}

/// Build an idealised column with `num_levels` standard levels.
///
/// Fails with a configuration error if `num_levels` is zero, any temperature
/// is not finite or the surface is colder than the stratosphere.
pub fn build_idealized_column(
    surface_temperature: f64,
    num_levels: usize,
    stratosphere_temperature: f64,
) -> ClimvizResult<AtmosphericColumn> {
    if !surface_temperature.is_finite() || !stratosphere_temperature.is_finite() {
        return Err(ClimvizError::Configuration(format!(
            "Temperatures must be finite (surface {}, stratosphere {})",
            surface_temperature, stratosphere_temperature
        )));
    }
    if surface_temperature < stratosphere_temperature {
        return Err(ClimvizError::Configuration(format!(
            "Surface temperature {} K is below the stratosphere temperature {} K",
            surface_temperature, stratosphere_temperature
        )));
    }
    let levels = LevelAxis::standard(num_levels)?;
    let temperatures = idealized_temperature_profile(
        surface_temperature,
        levels.points(),
        stratosphere_temperature,
    )?;
    debug!(
        surface_temperature,
        stratosphere_temperature, num_levels, "Built idealised column"
    );
    AtmosphericColumn::new(levels, temperatures, surface_temperature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_level_axis_is_surface_first() {
        let axis = LevelAxis::standard(4).unwrap();
        assert_eq!(axis.points(), &[875.0, 625.0, 375.0, 125.0]);
        assert_eq!(axis.bounds(), &[1000.0, 750.0, 500.0, 250.0, 0.0]);
        assert_relative_eq!(axis.thickness(2), 250.0);
    }

    #[test]
    fn test_column_shape_and_floor() {
        for num_levels in [1, 2, 30, 100] {
            let column = build_idealized_column(300.0, num_levels, 195.0).unwrap();
            assert_eq!(column.pressures().len(), num_levels);
            assert_eq!(column.temperatures().len(), num_levels);
            assert!(column.pressures().windows(2).all(|w| w[1] < w[0]));
            assert!(column.temperatures().iter().all(|t| *t >= 195.0));
        }
    }

    #[test]
    fn test_surface_temperature_sits_at_highest_pressure() {
        let column = build_idealized_column(290.0, 50, 195.0).unwrap();
        let (p_lowest, t_lowest) = column.iter().next().unwrap();
        let (p_top, t_top) = column.iter().last().unwrap();

        // No inversion of the level axis: the surface value is at the bottom
        assert_eq!(p_lowest, 990.0);
        assert_eq!(t_lowest, 290.0);
        assert_eq!(p_top, 10.0);
        assert_eq!(t_top, 195.0);
    }

    #[test]
    fn test_profile_cools_with_height_until_clamped() {
        let column = build_idealized_column(300.0, 100, 195.0).unwrap();
        let temps = column.temperatures();
        assert!(temps.windows(2).all(|w| w[1] <= w[0]));

        let first_clamped = temps.iter().position(|t| *t == 195.0).unwrap();
        assert!(temps[first_clamped..].iter().all(|t| *t == 195.0));
        assert!(temps[..first_clamped].iter().all(|t| *t > 195.0));
    }

    #[test]
    fn test_moist_lapse_rate_near_surface() {
        // Between 995 and 895 hPa a warm moist parcel cools by only a few K
        let column = build_idealized_column(300.0, 100, 195.0).unwrap();
        let t_895 = column
            .iter()
            .find(|(p, _)| (*p - 895.0).abs() < 1e-9)
            .map(|(_, t)| t)
            .unwrap();
        let cooling = 300.0 - t_895;
        assert!(cooling > 2.0 && cooling < 8.0, "cooling = {}", cooling);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            build_idealized_column(280.0, 0, 195.0),
            Err(ClimvizError::Configuration(_))
        ));
        assert!(matches!(
            build_idealized_column(180.0, 30, 195.0),
            Err(ClimvizError::Configuration(_))
        ));
        assert!(matches!(
            build_idealized_column(f64::NAN, 30, 195.0),
            Err(ClimvizError::Configuration(_))
        ));
    }
}
