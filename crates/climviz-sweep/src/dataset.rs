//! Sweep results.
//!
//! A [`SensitivityDataset`] holds one [`SensitivityPoint`] per grid cell in
//! row-major order over `(v1, v2)`: the first parameter is the outer loop, so
//! the point for `values1[i]` and `values2[j]` is at index `i * n2 + j`.
//!
//! Matrix views follow the plotting convention: the first parameter runs
//! along the x-axis (columns) and the second along the y-axis (rows), giving
//! fields of shape `(n2, n1)` with `Z[[j, i]]`.
//!
//! A dataset serialises as the plain ordered list of its points; the grid is
//! recovered from the points when it is read back.

use crate::grid::SweepAxis;
use crate::{Error, Result};
use climviz_core::parameters::{ParameterId, ParameterSet};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

/// Stage of a grid point evaluation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fluxes,
    Equilibrium,
}

/// Why a grid point has missing outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFailure {
    pub stage: FailureStage,
    pub message: String,
}

/// The scalar outputs recorded at each grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepOutput {
    Olr,
    Asr,
    NetFlux,
    EquilibriumSurfaceTemperature,
}

impl SweepOutput {
    pub const ALL: [SweepOutput; 4] = [
        SweepOutput::Olr,
        SweepOutput::Asr,
        SweepOutput::NetFlux,
        SweepOutput::EquilibriumSurfaceTemperature,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SweepOutput::Olr => "OLR",
            SweepOutput::Asr => "ASR",
            SweepOutput::NetFlux => "Net Flux",
            SweepOutput::EquilibriumSurfaceTemperature => "Equilibrium Surface Temperature",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SweepOutput::EquilibriumSurfaceTemperature => "K",
            _ => "W/m^2",
        }
    }
}

impl fmt::Display for SweepOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of one grid cell.
///
/// Outputs that could not be computed are NaN, with the reason in `failure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityPoint {
    /// Index into the first parameter's grid
    pub param1_index: usize,
    /// Index into the second parameter's grid
    pub param2_index: usize,
    pub param1: ParameterId,
    pub param2: ParameterId,
    pub param1_label: String,
    pub param2_label: String,
    /// Display units
    pub param1_value: f64,
    /// Display units
    pub param2_value: f64,
    /// Every parameter as used at this point, display units
    pub options: ParameterSet,
    #[serde(rename = "OLR", with = "nan_as_null")]
    pub olr: f64,
    #[serde(rename = "ASR", with = "nan_as_null")]
    pub asr: f64,
    #[serde(rename = "Net Flux", with = "nan_as_null")]
    pub net_flux: f64,
    #[serde(rename = "Equilibrium Surface Temperature", with = "nan_as_null")]
    pub equilibrium_surface_temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<PointFailure>,
}

impl SensitivityPoint {
    pub fn output(&self, output: SweepOutput) -> f64 {
        match output {
            SweepOutput::Olr => self.olr,
            SweepOutput::Asr => self.asr,
            SweepOutput::NetFlux => self.net_flux,
            SweepOutput::EquilibriumSurfaceTemperature => self.equilibrium_surface_temperature,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// One row of the tabular view and CSV export, in display column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityRecord {
    pub param1_label: String,
    pub param1_value: f64,
    pub param2_label: String,
    pub param2_value: f64,
    #[serde(rename = "OLR")]
    pub olr: f64,
    #[serde(rename = "ASR")]
    pub asr: f64,
    #[serde(rename = "Net Flux")]
    pub net_flux: f64,
    #[serde(rename = "Equilibrium Surface Temperature")]
    pub equilibrium_surface_temperature: f64,
}

impl From<&SensitivityPoint> for SensitivityRecord {
    fn from(point: &SensitivityPoint) -> Self {
        Self {
            param1_label: point.param1_label.clone(),
            param1_value: point.param1_value,
            param2_label: point.param2_label.clone(),
            param2_value: point.param2_value,
            olr: point.olr,
            asr: point.asr,
            net_flux: point.net_flux,
            equilibrium_surface_temperature: point.equilibrium_surface_temperature,
        }
    }
}

/// All points of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<SensitivityPoint>", into = "Vec<SensitivityPoint>")]
pub struct SensitivityDataset {
    axis1: SweepAxis,
    axis2: SweepAxis,
    points: Vec<SensitivityPoint>,
}

impl SensitivityDataset {
    /// Assemble a dataset, checking that `points` cover the grid in
    /// row-major `(v1, v2)` order.
    pub fn new(axis1: SweepAxis, axis2: SweepAxis, points: Vec<SensitivityPoint>) -> Result<Self> {
        let (n1, n2) = (axis1.n, axis2.n);
        if points.len() != n1 * n2 {
            return Err(Error::InvalidDataset(format!(
                "expected {} x {} = {} points, got {}",
                n1,
                n2,
                n1 * n2,
                points.len()
            )));
        }
        for (k, point) in points.iter().enumerate() {
            if point.param1_index != k / n2 || point.param2_index != k % n2 {
                return Err(Error::InvalidDataset(format!(
                    "point {} has grid index ({}, {}), expected ({}, {})",
                    k,
                    point.param1_index,
                    point.param2_index,
                    k / n2,
                    k % n2
                )));
            }
            if point.param1 != axis1.parameter || point.param2 != axis2.parameter {
                return Err(Error::InvalidDataset(format!(
                    "point {} sweeps {} and {}, dataset sweeps {} and {}",
                    k, point.param1, point.param2, axis1.parameter, axis2.parameter
                )));
            }
        }
        Ok(Self {
            axis1,
            axis2,
            points,
        })
    }

    pub fn axis1(&self) -> &SweepAxis {
        &self.axis1
    }

    pub fn axis2(&self) -> &SweepAxis {
        &self.axis2
    }

    /// Grid shape `(n1, n2)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.axis1.n, self.axis2.n)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SensitivityPoint] {
        &self.points
    }

    /// The point at `values1[i]`, `values2[j]`.
    pub fn point(&self, i: usize, j: usize) -> Option<&SensitivityPoint> {
        if i >= self.axis1.n || j >= self.axis2.n {
            return None;
        }
        self.points.get(i * self.axis2.n + j)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SensitivityPoint> {
        self.points.iter().filter(|p| !p.is_complete())
    }

    /// `output` as a matrix of shape `(n2, n1)`: rows follow the second
    /// parameter, columns the first.
    pub fn field(&self, output: SweepOutput) -> Array2<f64> {
        let (n1, n2) = self.shape();
        Array2::from_shape_fn((n2, n1), |(j, i)| self.points[i * n2 + j].output(output))
    }

    pub fn records(&self) -> Vec<SensitivityRecord> {
        self.points.iter().map(SensitivityRecord::from).collect()
    }

    /// Write the records as CSV, header first.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in self.records() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(io::BufWriter::new(file))
    }
}

impl TryFrom<Vec<SensitivityPoint>> for SensitivityDataset {
    type Error = Error;

    fn try_from(points: Vec<SensitivityPoint>) -> Result<Self> {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Err(Error::InvalidDataset("dataset has no points".to_string()));
        };
        let n1 = last.param1_index + 1;
        let n2 = last.param2_index + 1;
        // Grid values at the axis ends
        let end1 = points
            .get((n1 - 1) * n2)
            .map_or(first.param1_value, |p| p.param1_value);
        let axis1 = SweepAxis::new(first.param1, first.param1_value, end1, n1)?;
        let axis2 = SweepAxis::new(first.param2, first.param2_value, last.param2_value, n2)?;
        Self::new(axis1, axis2, points)
    }
}

impl From<SensitivityDataset> for Vec<SensitivityPoint> {
    fn from(dataset: SensitivityDataset) -> Self {
        dataset.points
    }
}

/// Serialise NaN as `null` and read `null` back as NaN.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
