//! Idealised single-column radiative transfer.
//!
//! Builds moist-adiabatic columns, evaluates their radiative fluxes through a
//! pluggable [`radiation::RadiativeModel`] and searches for the surface
//! temperature at which the column is in top-of-atmosphere balance.

pub mod column;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod equilibrium;
pub mod exploration;
pub mod gases;
pub mod grey_column;
pub mod humidity;
pub mod parameters;
pub mod radiation;
pub mod reference;
pub mod thermo;
pub mod utils;

pub mod errors;
