//! Grey two-stream flux kernels.
//!
//! Layers are indexed surface first. Profiles are returned on the `n + 1`
//! interfaces: index 0 is the surface, index `n` the top of the atmosphere.

use crate::constants::SIGMA;

/// Upward and downward flux on layer interfaces (W/m^2).
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceFluxes {
    pub up: Vec<f64>,
    pub down: Vec<f64>,
}

/// Longwave fluxes for a black surface below grey layers.
///
/// Each layer emits $\epsilon_k \sigma T_k^4$ in both directions and
/// transmits a fraction $1 - \epsilon_k$ of the radiation crossing it.
pub fn longwave(
    surface_temperature: f64,
    temperatures: &[f64],
    absorptivity: &[f64],
) -> InterfaceFluxes {
    let n = temperatures.len();
    debug_assert_eq!(absorptivity.len(), n);

    let mut up = vec![0.0; n + 1];
    let mut down = vec![0.0; n + 1];

    up[0] = SIGMA * surface_temperature.powi(4);
    for k in 0..n {
        let emission = absorptivity[k] * SIGMA * temperatures[k].powi(4);
        up[k + 1] = up[k] * (1.0 - absorptivity[k]) + emission;
    }
    for k in (0..n).rev() {
        let emission = absorptivity[k] * SIGMA * temperatures[k].powi(4);
        down[k] = down[k + 1] * (1.0 - absorptivity[k]) + emission;
    }

    InterfaceFluxes { up, down }
}

/// Shortwave fluxes for a single reflection at the surface.
///
/// The beam is attenuated by each layer's `transmissivity` on the way down,
/// a fraction `albedo` is reflected by the surface and attenuated again on
/// the way up. Multiple scattering between layers is ignored.
pub fn shortwave(insolation: f64, albedo: f64, transmissivity: &[f64]) -> InterfaceFluxes {
    let n = transmissivity.len();
    let mut up = vec![0.0; n + 1];
    let mut down = vec![0.0; n + 1];

    down[n] = insolation;
    for k in (0..n).rev() {
        down[k] = down[k + 1] * transmissivity[k];
    }
    up[0] = albedo * down[0];
    for k in 0..n {
        up[k + 1] = up[k] * transmissivity[k];
    }

    InterfaceFluxes { up, down }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transparent_atmosphere() {
        let lw = longwave(288.0, &[250.0, 220.0], &[0.0, 0.0]);
        let surface = SIGMA * 288.0_f64.powi(4);
        assert_relative_eq!(lw.up[2], surface);
        assert!(lw.down.iter().all(|f| *f == 0.0));

        let sw = shortwave(341.3, 0.3, &[1.0, 1.0]);
        assert_relative_eq!(sw.down[0], 341.3);
        assert_relative_eq!(sw.up[2], 0.3 * 341.3);
    }

    #[test]
    fn test_opaque_layer_emits_at_own_temperature() {
        let lw = longwave(300.0, &[250.0], &[1.0]);
        let layer = SIGMA * 250.0_f64.powi(4);
        assert_relative_eq!(lw.up[1], layer);
        assert_relative_eq!(lw.down[0], layer);
    }

    #[test]
    fn test_energy_budget_of_single_layer() {
        let eps = 0.6;
        let lw = longwave(290.0, &[240.0], &[eps]);
        let absorbed = lw.up[0] - lw.up[1] + lw.down[1] - lw.down[0];
        let expected =
            eps * SIGMA * 290.0_f64.powi(4) - 2.0 * eps * SIGMA * 240.0_f64.powi(4);
        assert_relative_eq!(absorbed, expected, epsilon = 1e-9);
    }
}
