//! Sweep behaviour against scripted radiative models.
//!
//! - Grid values and row-major point order
//! - Concentrations reach the model as mixing ratios
//! - A failing grid point leaves the rest of the sweep intact
//! - Matrix fields keep the first parameter on the columns
//! - Datasets survive a trip through the session store
//! - Sweeps run through the store are stored under the request name

use approx::assert_relative_eq;
use climviz_core::config::{ClimvizConfig, ColumnOptions};
use climviz_core::gases::{GasConcentrationVector, GasSpecies};
use climviz_core::parameters::{ParameterId, ParameterSet};
use climviz_core::radiation::{
    GreyGasModel, ModelError, RadiationRequest, RadiativeFluxResult, RadiativeModel,
    RadiativeSolver,
};
use climviz_sweep::{
    CancellationToken, FailureStage, SessionStore, SweepAxis, SweepEngine, SweepOutput,
    SweepRequest,
};
use std::sync::{Arc, Mutex};

/// OLR rises 2 W/m^2 per kelvin through 240 W/m^2 at 270 K; ASR is 240 W/m^2.
#[derive(Debug, Default)]
struct LinearModel {
    /// Rejects any request with exactly these CO2 and CH4 mixing ratios
    reject: Option<(f64, f64)>,
    /// Gas vectors of every request
    seen: Mutex<Vec<GasConcentrationVector>>,
}

impl RadiativeModel for LinearModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn compute_diagnostics(
        &self,
        request: &RadiationRequest,
    ) -> Result<RadiativeFluxResult, ModelError> {
        self.seen.lock().unwrap().push(request.gases);
        let co2 = request.gases.get(GasSpecies::CO2);
        let ch4 = request.gases.get(GasSpecies::CH4);
        if self.reject == Some((co2, ch4)) {
            return Err(ModelError::Rejected("scripted failure".to_string()));
        }
        let n = request.column.num_levels() + 1;
        let olr = 240.0 + 2.0 * (request.column.surface_temperature() - 270.0);
        Ok(RadiativeFluxResult::new(
            vec![olr; n],
            vec![0.0; n],
            vec![0.0; n],
            vec![240.0; n],
            olr,
            240.0,
        ))
    }
}

fn config() -> ClimvizConfig {
    ClimvizConfig {
        column: ColumnOptions {
            num_levels: 20,
            ..ColumnOptions::default()
        },
        ..ClimvizConfig::default()
    }
}

fn concentration_request(n1: usize, n2: usize) -> SweepRequest {
    SweepRequest::new(
        "concentrations",
        SweepAxis::new(ParameterId::Co2Concentration, 0.0, 1000.0, n1).unwrap(),
        SweepAxis::new(ParameterId::Ch4Concentration, 0.0, 1000.0, n2).unwrap(),
        ParameterSet::default(),
    )
    .unwrap()
}

#[test]
fn test_grid_values_and_order() {
    let engine = SweepEngine::new(
        RadiativeSolver::new(Arc::new(GreyGasModel::default())),
        &config(),
    );
    let dataset = engine
        .run_sweep(&concentration_request(3, 3), &CancellationToken::new())
        .unwrap();

    assert_eq!(dataset.len(), 9);
    let grid = [0.0, 500.0, 1000.0];
    for (k, point) in dataset.points().iter().enumerate() {
        assert_eq!(point.param1_value, grid[k / 3]);
        assert_eq!(point.param2_value, grid[k % 3]);
        assert_eq!(point.param1_label, "CO2 Concentration (ppm)");
        assert_eq!(point.param2_label, "CH4 Concentration (ppm)");
        assert_eq!(point.options.get(ParameterId::Co2Concentration), grid[k / 3]);
        assert!(point.olr.is_finite());
        assert_eq!(point.net_flux, point.olr - point.asr);
    }
}

#[test]
fn test_concentration_reaches_model_as_mixing_ratio() {
    let model = Arc::new(LinearModel::default());
    let engine = SweepEngine::new(RadiativeSolver::new(model.clone()), &config());
    let request = SweepRequest::new(
        "co2",
        SweepAxis::new(ParameterId::Co2Concentration, 400.0, 400.0, 1).unwrap(),
        SweepAxis::new(ParameterId::RelHumidity, 0.8, 0.8, 1).unwrap(),
        ParameterSet::default()
            .with_value(ParameterId::Ch4Concentration, 2.0)
            .unwrap(),
    )
    .unwrap();
    let dataset = engine.run_sweep(&request, &CancellationToken::new()).unwrap();

    assert_eq!(dataset.points()[0].param1_value, 400.0);
    let seen = model.seen.lock().unwrap();
    assert!(!seen.is_empty());
    for gases in seen.iter() {
        assert_eq!(gases.get(GasSpecies::CO2), 400e-6);
        assert_eq!(gases.get(GasSpecies::CH4), 2e-6);
    }
}

#[test]
fn test_failure_at_interior_point_is_recorded() {
    let model = Arc::new(LinearModel {
        reject: Some((500e-6, 500e-6)),
        ..LinearModel::default()
    });
    let engine = SweepEngine::new(RadiativeSolver::new(model), &config());
    let dataset = engine
        .run_sweep(&concentration_request(3, 3), &CancellationToken::new())
        .unwrap();

    assert_eq!(dataset.len(), 9);
    let failed: Vec<_> = dataset.failures().collect();
    assert_eq!(failed.len(), 1);

    let bad = dataset.point(1, 1).unwrap();
    let failure = bad.failure.as_ref().unwrap();
    assert_eq!(failure.stage, FailureStage::Fluxes);
    assert!(failure.message.contains("sweep point (row 1, column 1)"), "{}", failure.message);
    assert!(failure.message.contains("scripted failure"), "{}", failure.message);
    for output in SweepOutput::ALL {
        assert!(bad.output(output).is_nan());
    }

    for point in dataset.points().iter().filter(|p| p.is_complete()) {
        assert!(point.olr.is_finite());
        assert_relative_eq!(point.equilibrium_surface_temperature, 270.0, epsilon = 1e-6);
    }
}

#[test]
fn test_asymmetric_grid_field_orientation() {
    let engine = SweepEngine::new(
        RadiativeSolver::new(Arc::new(GreyGasModel::default())),
        &config(),
    );
    let request = SweepRequest::new(
        "asymmetric",
        SweepAxis::new(ParameterId::Co2Concentration, 100.0, 900.0, 3).unwrap(),
        SweepAxis::new(ParameterId::RelHumidity, 0.4, 0.9, 2).unwrap(),
        ParameterSet::default(),
    )
    .unwrap();
    let dataset = engine.run_sweep(&request, &CancellationToken::new()).unwrap();
    let olr = dataset.field(SweepOutput::Olr);

    assert_eq!(olr.dim(), (2, 3));
    for i in 0..3 {
        for j in 0..2 {
            let point = dataset.point(i, j).unwrap();
            assert_eq!(olr[[j, i]], point.olr);
            assert_eq!(point.param1_value, [100.0, 500.0, 900.0][i]);
            assert_eq!(point.param2_value, [0.4, 0.9][j]);
        }
    }
    // More CO2 along each row, more humidity down each column
    for j in 0..2 {
        assert!(olr[[j, 0]] > olr[[j, 1]] && olr[[j, 1]] > olr[[j, 2]]);
    }
    for i in 0..3 {
        assert!(olr[[0, i]] > olr[[1, i]]);
    }
}

#[test]
fn test_store_round_trip() {
    let model = Arc::new(LinearModel {
        reject: Some((500e-6, 500e-6)),
        ..LinearModel::default()
    });
    let engine = SweepEngine::new(RadiativeSolver::new(model), &config()).with_parallel(false);
    let first = engine
        .run_sweep(&concentration_request(3, 3), &CancellationToken::new())
        .unwrap();
    let second = engine
        .run_sweep(&concentration_request(2, 1), &CancellationToken::new())
        .unwrap();

    let mut store = SessionStore::new();
    store.insert_dataset("Dataset 1", first);
    store.insert_dataset("Dataset 2", second);
    store.save_point("baseline", ParameterSet::default());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    store.save(&path).unwrap();
    let mut restored = SessionStore::load(&path).unwrap();

    let names: Vec<&str> = restored.dataset_names().collect();
    assert_eq!(names, vec!["Dataset 1", "Dataset 2"]);
    let dataset = restored.dataset("Dataset 1").unwrap();
    assert_eq!(dataset.shape(), (3, 3));
    assert!(dataset.point(1, 1).unwrap().olr.is_nan());
    assert_eq!(dataset.failures().count(), 1);
    assert_eq!(restored.saved_point("baseline"), Some(&ParameterSet::default()));

    // Overwriting moves the dataset to the end
    let replacement = restored.delete_dataset("Dataset 1").unwrap();
    restored.insert_dataset("Dataset 1", replacement);
    assert_eq!(restored.latest_dataset().unwrap().0, "Dataset 1");

    let (removed, _) = restored.delete_dataset_at(0).unwrap();
    assert_eq!(removed, "Dataset 2");
    assert!(SessionStore::load_or_default(dir.path().join("missing.json"))
        .unwrap()
        .latest_dataset()
        .is_none());
}

#[test]
fn test_store_keeps_completed_sweep() {
    let engine =
        SweepEngine::new(RadiativeSolver::new(Arc::new(LinearModel::default())), &config());
    let request = concentration_request(2, 2);
    let mut store = SessionStore::new();

    let dataset = store
        .run_sweep(&engine, &request, &CancellationToken::new())
        .unwrap();
    assert_eq!(dataset.shape(), (2, 2));
    let (name, latest) = store.latest_dataset().unwrap();
    assert_eq!(name, "concentrations");
    assert_eq!(latest.len(), 4);

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let other = SweepRequest {
        name: "cancelled".to_string(),
        ..concentration_request(2, 2)
    };
    assert!(store.run_sweep(&engine, &other, &cancelled).is_err());
    let names: Vec<&str> = store.dataset_names().collect();
    assert_eq!(names, vec!["concentrations"]);
}
