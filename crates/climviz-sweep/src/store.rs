//! Session state: current parameters, sweep datasets and saved points.
//!
//! The store is persisted as one JSON document with the keys
//! `rrtm_options`, `sensitivity_points` and `saved_points`. Saving replaces
//! the whole document, so two processes sharing a file see last-writer-wins
//! semantics.

use crate::dataset::SensitivityDataset;
use crate::engine::{CancellationToken, SweepEngine, SweepRequest};
use crate::{Error, Result};
use climviz_core::parameters::ParameterSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStore {
    /// Parameter values currently shown
    pub rrtm_options: ParameterSet,
    /// Datasets by name, oldest first
    sensitivity_points: IndexMap<String, SensitivityDataset>,
    /// Parameter snapshots by name, in the order they were saved
    saved_points: IndexMap<String, ParameterSet>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `dataset` under `name`, replacing any dataset of that name.
    ///
    /// The stored dataset becomes the latest one even when it replaces an
    /// older entry.
    pub fn insert_dataset(
        &mut self,
        name: impl Into<String>,
        dataset: SensitivityDataset,
    ) -> Option<SensitivityDataset> {
        let name = name.into();
        let previous = self.sensitivity_points.shift_remove(&name);
        debug!(name = %name, replaced = previous.is_some(), "Storing dataset");
        self.sensitivity_points.insert(name, dataset);
        previous
    }

    /// Run `request` on `engine` and store the result under the request's
    /// name. Nothing is stored if the sweep is cancelled.
    pub fn run_sweep(
        &mut self,
        engine: &SweepEngine,
        request: &SweepRequest,
        cancel: &CancellationToken,
    ) -> Result<&SensitivityDataset> {
        let dataset = engine.run_sweep(request, cancel)?;
        self.insert_dataset(request.name.clone(), dataset);
        self.dataset(&request.name)
            .ok_or_else(|| Error::Store(format!("Dataset '{}' was not stored", request.name)))
    }

    pub fn dataset(&self, name: &str) -> Option<&SensitivityDataset> {
        self.sensitivity_points.get(name)
    }

    /// The most recently stored dataset.
    pub fn latest_dataset(&self) -> Option<(&str, &SensitivityDataset)> {
        self.sensitivity_points
            .last()
            .map(|(name, dataset)| (name.as_str(), dataset))
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.sensitivity_points.keys().map(String::as_str)
    }

    pub fn delete_dataset(&mut self, name: &str) -> Option<SensitivityDataset> {
        self.sensitivity_points.shift_remove(name)
    }

    /// Delete the `index`-th dataset in display order.
    pub fn delete_dataset_at(&mut self, index: usize) -> Option<(String, SensitivityDataset)> {
        self.sensitivity_points.shift_remove_index(index)
    }

    /// Save a snapshot of `parameters` under `name`, replacing any point of
    /// that name.
    pub fn save_point(
        &mut self,
        name: impl Into<String>,
        parameters: ParameterSet,
    ) -> Option<ParameterSet> {
        self.saved_points.insert(name.into(), parameters)
    }

    pub fn saved_point(&self, name: &str) -> Option<&ParameterSet> {
        self.saved_points.get(name)
    }

    pub fn saved_points(&self) -> impl Iterator<Item = (&str, &ParameterSet)> {
        self.saved_points.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn delete_point(&mut self, name: &str) -> Option<ParameterSet> {
        self.saved_points.shift_remove(name)
    }

    /// Write the store as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(|e| {
            Error::Store(format!(
                "Failed to create {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::Store(format!("Failed to open {}: {}", path.as_ref().display(), e))
        })?;
        let store = serde_json::from_reader(BufReader::new(file))?;
        Ok(store)
    }

    /// Load the store at `path`, or start an empty one if it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climviz_core::parameters::ParameterId;

    #[test]
    fn test_saved_points_overwrite_by_name() {
        let mut store = SessionStore::new();
        let warm = ParameterSet::default()
            .with_value(ParameterId::SurfaceTemperature, 288.0)
            .unwrap();
        assert!(store.save_point("a", ParameterSet::default()).is_none());
        store.save_point("b", ParameterSet::default());
        let previous = store.save_point("a", warm.clone()).unwrap();

        assert_eq!(previous, ParameterSet::default());
        assert_eq!(store.saved_point("a"), Some(&warm));
        let names: Vec<&str> = store.saved_points().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(store.delete_point("a").is_some());
        assert!(store.saved_point("a").is_none());
    }
}
