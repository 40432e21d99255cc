//! Physical constants shared by the column model.
//!
//! Values follow the conventions of idealised single-column models rather than
//! the most precise published figures (e.g. $g = 9.8$).

/// Gas constant for dry air (J / kg / K).
pub const RD: f64 = 287.0;
/// Specific heat of dry air at constant pressure (J / kg / K).
pub const CP: f64 = 1004.0;
/// $R_d / c_p$
pub const KAPPA: f64 = RD / CP;
/// Gas constant for water vapour (J / kg / K).
pub const RV: f64 = 461.5;
/// Specific heat of water vapour at constant pressure (J / kg / K).
pub const CPV: f64 = 1875.0;
/// Ratio of molecular weights, $R_d / R_v$.
pub const EPS: f64 = RD / RV;
/// Gravitational acceleration (m / s^2).
pub const G: f64 = 9.8;
/// Stefan-Boltzmann constant (W / m^2 / K^4).
pub const SIGMA: f64 = 5.67e-8;
/// Offset between Celsius and Kelvin.
pub const T_ZERO_CELSIUS: f64 = 273.15;
/// Surface pressure of the model column (hPa).
pub const PS: f64 = 1000.0;
/// Reference pressure of the hypsometric altitude conversion (hPa).
pub const P_REFERENCE: f64 = 1013.0;
/// hPa to Pa.
pub const HPA_TO_PA: f64 = 100.0;
/// Global mean insolation (W / m^2).
pub const INSOLATION: f64 = 341.3;
/// Density of liquid water (kg / m^3).
pub const RHO_WATER: f64 = 1000.0;
/// Specific heat of liquid water (J / kg / K).
pub const CW: f64 = 4181.3;
/// Seconds in a (model) day.
pub const SECONDS_PER_DAY: f64 = 86400.0;
/// Days in a (model) year.
pub const DAYS_PER_YEAR: usize = 365;
