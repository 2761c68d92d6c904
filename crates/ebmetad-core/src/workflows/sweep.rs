use crate::core::force_table::ForceTable;
use crate::core::pairs::PairRegistry;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Key of one `(w, sigma)` combination, e.g. `w10.0_s0.2`.
pub fn sweep_key(w: f64, sigma: f64) -> String {
    format!("w{w:?}_s{sigma:?}")
}

/// Force tables of every pair for each `(w, sigma)` combination, keyed
/// `sweep_key -> pair -> table`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweepResult(BTreeMap<String, BTreeMap<String, ForceTable>>);

impl SweepResult {
    pub fn get(&self, w: f64, sigma: f64) -> Option<&BTreeMap<String, ForceTable>> {
        self.0.get(&sweep_key(w, sigma))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn write_json(&self, path: &Path) -> Result<(), EngineError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| EngineError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

type ComboResult = Result<(String, BTreeMap<String, ForceTable>), EngineError>;

/// Builds the force table of every pair for each combination of `weights` and `sigmas`.
///
/// Used to judge how sensitive the bias is to the metadynamics parameters
/// before committing to a run.
#[instrument(skip_all, name = "sweep_workflow", fields(num_w = weights.len(), num_sigma = sigmas.len()))]
pub fn run(
    registry: &PairRegistry,
    weights: &[f64],
    sigmas: &[f64],
    reporter: &ProgressReporter,
) -> Result<SweepResult, EngineError> {
    let names = registry.get_names()?;
    let combos: Vec<(f64, f64)> = weights
        .iter()
        .flat_map(|&w| sigmas.iter().map(move |&s| (w, s)))
        .collect();

    reporter.report(Progress::PhaseStart {
        name: "Force-Table Sweep",
    });
    reporter.report(Progress::TaskStart {
        total_pairs: (combos.len() * names.len()) as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = combos.iter();

    #[cfg(feature = "parallel")]
    let iterator = combos.par_iter();

    let results: Vec<ComboResult> = iterator
        .map(|&(w, sigma)| build_combo(registry, w, sigma, reporter))
        .collect();

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let mut sweep = SweepResult::default();
    for result in results {
        let (key, tables) = result?;
        sweep.0.insert(key, tables);
    }

    info!(
        combinations = sweep.len(),
        "Force-table sweep complete for {} pair(s).",
        names.len()
    );
    Ok(sweep)
}

fn build_combo(
    registry: &PairRegistry,
    w: f64,
    sigma: f64,
    reporter: &ProgressReporter,
) -> ComboResult {
    let mut tables = BTreeMap::new();
    for pair in registry {
        let table = pair
            .build_force_table(w, sigma)
            .map_err(EngineError::numerics(&pair.name))?;
        tables.insert(pair.name.clone(), table);
        reporter.report(Progress::PairComplete {
            name: pair.name.clone(),
        });
    }
    Ok((sweep_key(w, sigma), tables))
}
