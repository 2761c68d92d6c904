use crate::core::pairs::{PairRecord, PairRegistry};
use crate::engine::analysis::{AnalysisRecord, AnalysisReport};
use crate::engine::config::AnalysisConfig;
use crate::engine::counts::SimulationCounts;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Builds an [`AnalysisRecord`] for every registered pair that has replica data.
///
/// Pairs are analysed independently. Registered pairs without usable count
/// data, and count data for unregistered pairs, are skipped with a warning.
#[instrument(skip_all, name = "analysis_workflow")]
pub fn run(
    registry: &PairRegistry,
    counts: &SimulationCounts,
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<AnalysisReport, EngineError> {
    info!("Starting convergence analysis.");
    reporter.report(Progress::PhaseStart {
        name: "Convergence Analysis",
    });

    for name in counts.pair_names() {
        if registry.name_to_id(name).is_err() {
            warn!("Count data for unregistered pair '{}' is ignored.", name);
        }
    }

    let work_list: Vec<&PairRecord> = registry
        .iter()
        .filter(|pair| {
            let present = counts.pair(&pair.name).is_some_and(|r| !r.is_empty());
            if !present {
                warn!("No replica data for pair '{}'; it will be skipped.", pair.name);
            }
            present
        })
        .collect();

    if work_list.is_empty() {
        warn!("No pair has replica data. Returning an empty analysis.");
        reporter.report(Progress::PhaseFinish);
        return Ok(AnalysisReport::new());
    }

    reporter.report(Progress::TaskStart {
        total_pairs: work_list.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = work_list.iter();

    #[cfg(feature = "parallel")]
    let iterator = work_list.par_iter();

    let results: Vec<Result<AnalysisRecord, EngineError>> = iterator
        .map(|pair| {
            let replicas = counts
                .pair(&pair.name)
                .ok_or_else(|| EngineError::NoReplicaData(pair.name.clone()))?;
            let record = AnalysisRecord::build(pair, replicas, config.smoothing_sigma)?;
            reporter.report(Progress::PairComplete {
                name: pair.name.clone(),
            });
            Ok(record)
        })
        .collect();

    reporter.report(Progress::TaskFinish);

    let mut report = AnalysisReport::new();
    for result in results {
        match result {
            Ok(record) => report.insert(record),
            Err(EngineError::NoReplicaData(name)) => {
                warn!("No replica of pair '{}' has counts; it will be skipped.", name);
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(mean) = report.mean_ensemble_divergence() {
        info!(
            analysed_pairs = report.len(),
            mean_ensemble_divergence = mean,
            "Convergence analysis finished."
        );
    }
    reporter.report(Progress::PhaseFinish);
    Ok(report)
}
