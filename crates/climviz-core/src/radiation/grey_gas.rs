//! Grey-gas radiative model.
//!
//! A simple stand-in for a band model such as RRTMG. Longwave
//! optical depth of each layer combines
//!
//! - water vapour, proportional to the layer's vapour mass path:
//!   $\Delta\tau = k_{H_2O}\, q\, \Delta p / g$
//! - well-mixed gases, each with a saturating column optical depth
//!   $\tau_{gas} = \tau_{2\times} \log_2(1 + x / x_{ref})$
//!   distributed over the layers in proportion to their mass
//!
//! and enters the two-stream kernels as an absorptivity
//! $\epsilon = 1 - e^{-D \Delta\tau}$ with diffusivity factor $D$.
//! Shortwave radiation is weakly absorbed by water vapour and reflected once by
//! the surface.

use super::two_stream::{longwave, shortwave};
use super::{ModelError, RadiationRequest, RadiativeFluxResult, RadiativeModel};
use crate::constants::{G, HPA_TO_PA, INSOLATION};
use crate::gases::GasSpecies;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longwave absorption of a well-mixed gas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasOptics {
    /// Column optical depth added by each doubling of $1 + x / x_{ref}$.
    pub optical_depth_per_doubling: f64,
    /// Volume mixing ratio at which absorption starts to saturate.
    pub reference_vmr: f64,
}

impl GasOptics {
    pub fn column_optical_depth(&self, vmr: f64) -> f64 {
        if self.reference_vmr <= 0.0 {
            return 0.0;
        }
        self.optical_depth_per_doubling * (1.0 + vmr / self.reference_vmr).log2()
    }
}

/// Optical properties of the [`GreyGasModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreyGasOptics {
    /// Top-of-atmosphere insolation (W/m^2).
    /// Default: 341.3
    pub insolation: f64,
    /// Surface shortwave albedo (-).
    /// Default: 0.3
    pub surface_albedo: f64,
    /// Diffusivity factor for the longwave two-stream approximation.
    /// Default: 1.66
    pub diffusivity: f64,
    /// Longwave mass absorption coefficient of water vapour (m^2/kg).
    /// Default: 0.02
    pub water_vapor_longwave: f64,
    /// Shortwave mass absorption coefficient of water vapour (m^2/kg).
    /// Default: 0.002
    pub water_vapor_shortwave: f64,
    /// Well-mixed absorbers. Species without an entry are transparent.
    pub gases: BTreeMap<GasSpecies, GasOptics>,
}

impl Default for GreyGasOptics {
    fn default() -> Self {
        let gas = |optical_depth_per_doubling, reference_vmr| GasOptics {
            optical_depth_per_doubling,
            reference_vmr,
        };
        Self {
            insolation: INSOLATION,
            surface_albedo: 0.3,
            diffusivity: 1.66,
            water_vapor_longwave: 0.02,
            water_vapor_shortwave: 0.002,
            gases: BTreeMap::from([
                (GasSpecies::CO2, gas(0.35, 280e-6)),
                (GasSpecies::CH4, gas(0.05, 0.7e-6)),
                (GasSpecies::N2O, gas(0.04, 0.27e-6)),
                (GasSpecies::CFC11, gas(0.02, 1e-10)),
                (GasSpecies::CFC12, gas(0.02, 1e-10)),
                (GasSpecies::CFC22, gas(0.01, 1e-10)),
                (GasSpecies::CCl4, gas(0.01, 1e-10)),
                (GasSpecies::O3, gas(0.05, 3e-7)),
            ]),
        }
    }
}

/// Grey-gas implementation of [`RadiativeModel`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GreyGasModel {
    optics: GreyGasOptics,
}

impl GreyGasModel {
    pub fn from_optics(optics: GreyGasOptics) -> Self {
        Self { optics }
    }

    pub fn optics(&self) -> &GreyGasOptics {
        &self.optics
    }

    fn validate(&self, request: &RadiationRequest) -> Result<(), ModelError> {
        if !request.clear_sky {
            return Err(ModelError::Rejected(
                "cloudy-sky radiation is not modelled".to_string(),
            ));
        }
        let column = &request.column;
        if request.humidity.len() != column.num_levels() {
            return Err(ModelError::Rejected(format!(
                "humidity has {} levels, column has {}",
                request.humidity.len(),
                column.num_levels()
            )));
        }
        let temperatures_ok = column
            .temperatures()
            .iter()
            .chain(std::iter::once(&column.surface_temperature()))
            .all(|t| t.is_finite() && *t > 0.0);
        if !temperatures_ok {
            return Err(ModelError::Rejected(
                "temperatures must be finite and positive".to_string(),
            ));
        }
        if request
            .humidity
            .values()
            .iter()
            .any(|q| !q.is_finite() || *q < 0.0)
        {
            return Err(ModelError::Rejected(
                "specific humidity must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl RadiativeModel for GreyGasModel {
    fn name(&self) -> &str {
        "grey-gas"
    }

    fn compute_diagnostics(
        &self,
        request: &RadiationRequest,
    ) -> Result<RadiativeFluxResult, ModelError> {
        self.validate(request)?;

        let column = &request.column;
        let levels = column.levels();
        let total_pressure = levels.bounds()[0] - levels.bounds()[levels.len()];

        let well_mixed_depth: f64 = request
            .gases
            .iter()
            .filter_map(|(species, vmr)| {
                self.optics
                    .gases
                    .get(&species)
                    .map(|optics| optics.column_optical_depth(vmr))
            })
            .sum();

        let (absorptivity, transmissivity): (Vec<f64>, Vec<f64>) = (0..levels.len())
            .map(|k| {
                let dp = levels.thickness(k);
                let vapour_path = request.humidity.values()[k] * dp * HPA_TO_PA / G;
                let tau_lw = self.optics.water_vapor_longwave * vapour_path
                    + well_mixed_depth * dp / total_pressure;
                let tau_sw = self.optics.water_vapor_shortwave * vapour_path;
                (
                    1.0 - (-self.optics.diffusivity * tau_lw).exp(),
                    (-tau_sw).exp(),
                )
            })
            .unzip();

        let lw = longwave(
            column.surface_temperature(),
            column.temperatures(),
            &absorptivity,
        );
        let sw = shortwave(
            self.optics.insolation,
            self.optics.surface_albedo,
            &transmissivity,
        );

        let top = levels.len();
        let olr = lw.up[top];
        let asr = sw.down[top] - sw.up[top];
        Ok(RadiativeFluxResult::new(
            lw.up, lw.down, sw.up, sw.down, olr, asr,
        ))
    }
}
