//! Moist thermodynamics used to build idealised soundings.

use crate::constants::{CPV, EPS, KAPPA, RV, T_ZERO_CELSIUS};

/// Saturation vapour pressure over liquid water (hPa).
///
/// Bolton's form of the Clausius-Clapeyron relation:
/// $$ e_s = 6.112 \exp\left(\frac{17.67\, T_c}{T_c + 243.5}\right) $$
/// with $T_c$ the temperature in Celsius.
pub fn saturation_vapor_pressure(temperature: f64) -> f64 {
    let tcel = temperature - T_ZERO_CELSIUS;
    6.112 * (17.67 * tcel / (tcel + 243.5)).exp()
}

/// Saturation specific humidity (kg/kg) at `temperature` (K) and `pressure` (hPa).
///
/// $$ q_s = \frac{\epsilon e_s}{p - (1 - \epsilon) e_s} $$
pub fn saturation_specific_humidity(temperature: f64, pressure: f64) -> f64 {
    let es = saturation_vapor_pressure(temperature);
    EPS * es / (pressure - (1.0 - EPS) * es)
}

/// Latent heat of vaporisation (J/kg), linear in temperature.
pub fn latent_heat(temperature: f64) -> f64 {
    let tcel = temperature - T_ZERO_CELSIUS;
    (2.501 - 0.00237 * tcel) * 1.0e6
}

/// Temperature derivative along the pseudoadiabat, $dT/dp$ in K/hPa.
///
/// Positive everywhere: temperature falls as pressure decreases.
pub fn pseudoadiabat_lapse(temperature: f64, pressure: f64) -> f64 {
    let es_over_p = saturation_vapor_pressure(temperature) / pressure;
    let ratio = latent_heat(temperature) / temperature / RV;
    temperature / pressure * KAPPA * (1.0 + es_over_p * ratio)
        / (1.0 + KAPPA * (CPV / RV + (ratio - 1.0) * ratio) * es_over_p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_saturation_vapor_pressure_at_freezing() {
        assert_relative_eq!(saturation_vapor_pressure(273.15), 6.112, epsilon = 1e-12);
    }

    #[test]
    fn test_saturation_specific_humidity_increases_with_temperature() {
        let cold = saturation_specific_humidity(260.0, 900.0);
        let warm = saturation_specific_humidity(300.0, 900.0);
        assert!(warm > cold * 10.0);
        // Roughly 22 g/kg near the surface at 300 K
        assert_relative_eq!(
            saturation_specific_humidity(300.0, 1000.0),
            0.022,
            epsilon = 2e-3
        );
    }

    #[test]
    fn test_pseudoadiabat_is_shallower_than_dry_adiabat() {
        let t = 295.0;
        let p = 950.0;
        let dry = t / p * KAPPA;
        let moist = pseudoadiabat_lapse(t, p);
        assert!(moist > 0.0);
        assert!(moist < dry);
    }

    #[test]
    fn test_pseudoadiabat_approaches_dry_adiabat_when_cold() {
        let t = 200.0;
        let p = 200.0;
        let dry = t / p * KAPPA;
        assert_relative_eq!(pseudoadiabat_lapse(t, p), dry, max_relative = 0.01);
    }
}
