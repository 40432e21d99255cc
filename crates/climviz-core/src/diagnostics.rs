//! Derived-field post-processing.
//!
//! Pure functions turning raw column output into quantities for display:
//! altitude from pressure, net top-of-atmosphere balance and the sign styling
//! of indicator values.
//!
//! # Sign convention
//!
//! Net flux is always $OLR - ASR$. A positive net flux means the column loses
//! energy to space.

use crate::column::AtmosphericColumn;
use crate::constants::{G, PS, P_REFERENCE, RD};
use crate::radiation::RadiativeFluxResult;
use serde::{Deserialize, Serialize};

/// Stratospheric temperature assumed by [`pressure_to_altitude`] callers that
/// do not provide their own (K).
pub const DEFAULT_ALTITUDE_TEMPERATURE: f64 = 200.0;

/// Altitude (m) of `pressure` (hPa) from the hypsometric equation of an
/// isothermal atmosphere at `stratosphere_temperature`.
///
/// $$ Z = -\frac{R T}{g} \ln\left(\frac{p}{p_0}\right) $$
///
/// with $p_0 = 1013$ hPa.
pub fn pressure_to_altitude(pressure: f64, stratosphere_temperature: f64) -> f64 {
    -stratosphere_temperature * RD / G * (pressure / P_REFERENCE).ln()
}

/// Log-pressure height $z^* = -\ln(p / p_s)$ (dimensionless).
pub fn zstar(pressure: f64) -> f64 {
    -(pressure / PS).ln()
}

/// Net top-of-atmosphere flux, $OLR - ASR$ (W/m^2).
pub fn net_flux(olr: f64, asr: f64) -> f64 {
    olr - asr
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrow {
    Up,
    Flat,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Gain,
    Neutral,
    Loss,
}

/// Arrow and colour of an indicator card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorStyle {
    pub arrow: Arrow,
    pub tone: Tone,
}

impl IndicatorStyle {
    const GAIN: Self = Self {
        arrow: Arrow::Up,
        tone: Tone::Gain,
    };
    const NEUTRAL: Self = Self {
        arrow: Arrow::Flat,
        tone: Tone::Neutral,
    };
    const LOSS: Self = Self {
        arrow: Arrow::Down,
        tone: Tone::Loss,
    };

    /// Styling by sign: positive is a gain, negative a loss.
    pub fn for_value(value: f64) -> Self {
        if value > 0.0 {
            Self::GAIN
        } else if value < 0.0 {
            Self::LOSS
        } else {
            Self::NEUTRAL
        }
    }

    /// Styling of the net balance $OLR - ASR$.
    ///
    /// A positive net flux is energy leaving the column, so it is shown as a
    /// loss.
    pub fn for_net_flux(net_flux: f64) -> Self {
        Self::for_value(-net_flux)
    }
}

/// A scalar shown on an indicator card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub title: String,
    pub value: f64,
    pub unit: String,
    pub style: IndicatorStyle,
}

/// The three top-of-atmosphere indicators of an explored point.
///
/// Incoming shortwave is shown as $-ASR$ (energy entering the column points
/// down), outgoing longwave as $OLR$, the balance as $OLR - ASR$ rounded to
/// two decimals.
pub fn toa_indicators(fluxes: &RadiativeFluxResult) -> [Indicator; 3] {
    let incoming = -fluxes.asr();
    let net = (fluxes.net_flux() * 100.0).round() / 100.0;
    [
        Indicator {
            title: "Incoming shortwave Radiation".to_string(),
            value: incoming,
            unit: "W/m²".to_string(),
            style: IndicatorStyle::for_value(incoming),
        },
        Indicator {
            title: "Outgoing Longwave Radiation".to_string(),
            value: fluxes.olr(),
            unit: "W/m²".to_string(),
            style: IndicatorStyle::for_value(fluxes.olr()),
        },
        Indicator {
            title: "Radiation Balance".to_string(),
            value: net,
            unit: "W/m²".to_string(),
            style: IndicatorStyle::for_net_flux(net),
        },
    ]
}

/// A named `(x, altitude)` line for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSeries {
    pub name: String,
    pub values: Vec<f64>,
    /// Altitude (km)
    pub altitude: Vec<f64>,
}

/// Temperature against altitude (km) for each level.
pub fn temperature_profile(column: &AtmosphericColumn) -> ProfileSeries {
    ProfileSeries {
        name: "Temperature".to_string(),
        values: column.temperatures().to_vec(),
        altitude: column
            .pressures()
            .iter()
            .map(|p| pressure_to_altitude(*p, DEFAULT_ALTITUDE_TEMPERATURE) / 1000.0)
            .collect(),
    }
}

/// Flux profiles against altitude (km) of the layer interfaces.
///
/// Downward fluxes are negated so that they plot to the left of zero.
/// The top interface sits at zero pressure and is omitted because its
/// altitude is unbounded.
pub fn flux_profiles(column: &AtmosphericColumn, fluxes: &RadiativeFluxResult) -> Vec<ProfileSeries> {
    let bounds = column.levels().bounds();
    let finite = bounds.iter().take_while(|p| **p > 0.0).count();
    let altitude: Vec<f64> = bounds[..finite]
        .iter()
        .map(|p| pressure_to_altitude(*p, DEFAULT_ALTITUDE_TEMPERATURE) / 1000.0)
        .collect();

    let series = |name: &str, values: &[f64], sign: f64| ProfileSeries {
        name: name.to_string(),
        values: values[..finite].iter().map(|v| sign * v).collect(),
        altitude: altitude.clone(),
    };
    vec![
        series("LW Flux Up", fluxes.lw_flux_up(), 1.0),
        series("SW Flux Up", fluxes.sw_flux_up(), 1.0),
        series("LW Flux Down", fluxes.lw_flux_down(), -1.0),
        series("SW Flux Down", fluxes.sw_flux_down(), -1.0),
    ]
}
