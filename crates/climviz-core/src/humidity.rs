//! Water vapour profile under fixed relative humidity.

use crate::column::AtmosphericColumn;
use crate::errors::{ClimvizError, ClimvizResult};
use crate::thermo::saturation_specific_humidity;
use serde::{Deserialize, Serialize};

/// Specific humidity (kg/kg) at each level of a column, surface first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityProfile {
    specific_humidity: Vec<f64>,
}

impl HumidityProfile {
    /// Humidity at a fixed `relative_humidity` with a lower floor of
    /// `min_specific_humidity`.
    ///
    /// $$ q = \max(RH \cdot q_s(T, p),\ q_{strat}) $$
    ///
    /// The floor only becomes active in the cold upper levels, where it stands
    /// in for the (nearly constant) stratospheric water vapour.
    pub fn fixed_relative_humidity(
        column: &AtmosphericColumn,
        relative_humidity: f64,
        min_specific_humidity: f64,
    ) -> ClimvizResult<Self> {
        if !(0.0..=1.0).contains(&relative_humidity) {
            return Err(ClimvizError::Configuration(format!(
                "Relative humidity must be within [0, 1], got {}",
                relative_humidity
            )));
        }
        if min_specific_humidity.is_nan() || min_specific_humidity < 0.0 {
            return Err(ClimvizError::Configuration(format!(
                "Minimum specific humidity must be non-negative, got {}",
                min_specific_humidity
            )));
        }

        let specific_humidity = column
            .iter()
            .map(|(p, t)| {
                (relative_humidity * saturation_specific_humidity(t, p)).max(min_specific_humidity)
            })
            .collect();
        Ok(Self { specific_humidity })
    }

    pub fn values(&self) -> &[f64] {
        &self.specific_humidity
    }

    pub fn len(&self) -> usize {
        self.specific_humidity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specific_humidity.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::build_idealized_column;

    #[test]
    fn test_floor_applies_aloft() {
        let column = build_idealized_column(290.0, 30, 195.0).unwrap();
        let humidity = HumidityProfile::fixed_relative_humidity(&column, 0.8, 5e-6).unwrap();

        assert_eq!(humidity.len(), 30);
        assert!(humidity.values().iter().all(|q| *q >= 5e-6));
        assert!(humidity.values()[0] > 1e-3);

        let nearly_dry = HumidityProfile::fixed_relative_humidity(&column, 1e-4, 5e-6).unwrap();
        assert!(nearly_dry.values().iter().all(|q| *q == 5e-6));
    }

    #[test]
    fn test_dry_column() {
        let column = build_idealized_column(290.0, 30, 195.0).unwrap();
        let humidity = HumidityProfile::fixed_relative_humidity(&column, 0.0, 0.0).unwrap();
        assert!(humidity.values().iter().all(|q| *q == 0.0));
    }

    #[test]
    fn test_rejects_out_of_range_humidity() {
        let column = build_idealized_column(290.0, 10, 195.0).unwrap();
        assert!(HumidityProfile::fixed_relative_humidity(&column, 1.5, 5e-6).is_err());
        assert!(HumidityProfile::fixed_relative_humidity(&column, 0.5, -1.0).is_err());
    }
}
