use crate::core::metadata::Dictionary;
use crate::core::pairs::PairRegistry;
use crate::core::statistics::NumericsError;
use crate::engine::config::RunConfigBuilder;
use crate::engine::counts::read_historical_counts;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::run_data::{GeneralParams, RunData};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Name of the persisted run configuration inside a member's working directory.
pub const RUN_CONFIG_FILENAME: &str = "run_config.json";

#[derive(Debug, Clone)]
pub struct RunSetup {
    pub run_data: RunData,
    /// Merged parameter set of each restraint, in pair-data order.
    pub restraints: Vec<(String, Dictionary)>,
    pub config_path: PathBuf,
}

/// Prepares one ensemble member: derives run parameters for every pair,
/// restores sampling histograms found in `working_dir`, and persists the
/// run configuration there.
#[instrument(skip_all, name = "setup_workflow", fields(ensemble_num = general.ensemble_num))]
pub fn run(
    registry: &PairRegistry,
    general: GeneralParams,
    working_dir: &Path,
    reporter: &ProgressReporter,
) -> Result<RunSetup, EngineError> {
    let names = registry.get_names()?;
    info!("Names of restraints: {:?}", names);

    let mut run_data = reporter.phase("Deriving Restraint Parameters", || {
        RunData::from_registry(registry, general)
    })?;

    reporter.phase("Restoring Sampling History", || {
        restore_distance_counts(&mut run_data, working_dir, reporter)
    })?;

    let config_path = working_dir.join(RUN_CONFIG_FILENAME);
    run_data.save_config(&config_path)?;

    let restraints = collect_restraints(&run_data)?;
    info!(
        num_restraints = restraints.len(),
        "Run configuration written to {}",
        config_path.display()
    );

    Ok(RunSetup {
        run_data,
        restraints,
        config_path,
    })
}

/// Re-biases a prepared member: loads its run configuration, applies new
/// `w`/`sigma`, recomputes every force table and writes the configuration back.
#[instrument(skip_all, name = "rebias_workflow")]
pub fn rebias(
    registry: &PairRegistry,
    working_dir: &Path,
    w: Option<f64>,
    sigma: Option<f64>,
) -> Result<RunData, EngineError> {
    let w = w.map(|w| RunConfigBuilder::positive("w", w)).transpose()?;
    let sigma = sigma
        .map(|sigma| RunConfigBuilder::positive("sigma", sigma))
        .transpose()?;

    let config_path = working_dir.join(RUN_CONFIG_FILENAME);
    let mut run_data = RunData::load_config(&config_path)?;

    if let Some(w) = w {
        run_data.general_mut().w = w;
    }
    if let Some(sigma) = sigma {
        run_data.general_mut().sigma = sigma;
    }
    run_data.refresh_force_tables(registry)?;
    run_data.save_config(&config_path)?;
    Ok(run_data)
}

fn restore_distance_counts(
    run_data: &mut RunData,
    working_dir: &Path,
    reporter: &ProgressReporter,
) -> Result<(), EngineError> {
    let names: Vec<String> = run_data.pair_names().map(String::from).collect();
    reporter.report(Progress::TaskStart {
        total_pairs: names.len() as u64,
    });

    for name in names {
        let params = run_data.pair_mut(&name)?;
        let path = working_dir.join(&params.historical_data_filename);
        if let Some(counts) = read_historical_counts(&path)? {
            if counts.len() != params.force_table.side() {
                return Err(EngineError::Numerics {
                    pair: name,
                    source: NumericsError::DimensionMismatch {
                        left_name: "force_table",
                        left: params.force_table.side(),
                        right_name: "historical counts",
                        right: counts.len(),
                    },
                });
            }
            info!("Restored sampling history for '{}' from {}", name, path.display());
            params.distance_counts = counts;
            reporter.report(Progress::Message(format!(
                "Restored sampling history for '{name}'"
            )));
        }
        reporter.report(Progress::PairComplete { name });
    }

    reporter.report(Progress::TaskFinish);
    Ok(())
}

fn collect_restraints(run_data: &RunData) -> Result<Vec<(String, Dictionary)>, EngineError> {
    run_data
        .pair_names()
        .map(|name| Ok((name.to_string(), run_data.restraint_parameters(name)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pairs::RegistryError;
    use crate::core::pairs::tests::sample_registry;
    use crate::engine::config::ConfigError;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[test]
    fn setup_writes_config_and_uniform_prior() {
        let dir = tempdir().unwrap();
        let registry = sample_registry();
        let setup = run(
            &registry,
            GeneralParams::default(),
            dir.path(),
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(setup.config_path.exists());
        assert_eq!(RunData::load_config(&setup.config_path).unwrap(), setup.run_data);
        assert_eq!(
            setup.run_data.pair("105_216").unwrap().distance_counts,
            vec![1; 5]
        );
        assert_eq!(setup.restraints.len(), 2);
        assert_eq!(setup.restraints[0].0, "052_210");
    }

    #[test]
    fn setup_restores_historical_counts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("counts_105_216.log"), "4\n1\n9\n2\n1\n").unwrap();

        let setup = run(
            &sample_registry(),
            GeneralParams::default(),
            dir.path(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(
            setup.run_data.pair("105_216").unwrap().distance_counts,
            vec![4, 1, 9, 2, 1]
        );
        assert_eq!(
            setup.run_data.pair("052_210").unwrap().distance_counts,
            vec![1; 7]
        );
    }

    #[test]
    fn restored_history_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("counts_105_216.log"), "4 1 9 2 1").unwrap();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if let Progress::Message(msg) = event {
                sink.lock().unwrap().push(msg);
            }
        }));

        run(&sample_registry(), GeneralParams::default(), dir.path(), &reporter).unwrap();
        assert_eq!(
            *messages.lock().unwrap(),
            vec!["Restored sampling history for '105_216'".to_string()]
        );
    }

    #[test]
    fn setup_rejects_history_of_wrong_length() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("counts_105_216.log"), "4 1").unwrap();

        let err = run(
            &sample_registry(),
            GeneralParams::default(),
            dir.path(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Numerics {
                source: NumericsError::DimensionMismatch { left: 5, right: 2, .. },
                ..
            }
        ));
    }

    #[test]
    fn empty_history_keeps_uniform_prior() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("counts_105_216.log"), "").unwrap();

        let setup = run(
            &sample_registry(),
            GeneralParams::default(),
            dir.path(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(
            setup.run_data.pair("105_216").unwrap().distance_counts,
            vec![1; 5]
        );
    }

    #[test]
    fn setup_on_empty_registry_fails() {
        let dir = tempdir().unwrap();
        let result = run(
            &PairRegistry::new(),
            GeneralParams::default(),
            dir.path(),
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::Registry(RegistryError::EmptyRegistry))
        ));
        assert!(!dir.path().join(RUN_CONFIG_FILENAME).exists());
    }

    #[test]
    fn rebias_recomputes_tables_and_keeps_counts() {
        let dir = tempdir().unwrap();
        let registry = sample_registry();
        fs::write(dir.path().join("counts_105_216.log"), "4 1 9 2 1").unwrap();
        run(
            &registry,
            GeneralParams::default(),
            dir.path(),
            &ProgressReporter::new(),
        )
        .unwrap();

        let rebiased = rebias(&registry, dir.path(), Some(2.0), None).unwrap();
        let params = rebiased.pair("105_216").unwrap();
        assert_eq!(rebiased.general().w, 2.0);
        assert_eq!(rebiased.general().sigma, 0.2);
        assert_eq!(params.distance_counts, vec![4, 1, 9, 2, 1]);
        assert_eq!(
            params.force_table,
            registry
                .by_name("105_216")
                .unwrap()
                .build_force_table(2.0, 0.2)
                .unwrap()
        );
        assert_eq!(
            RunData::load_config(&dir.path().join(RUN_CONFIG_FILENAME)).unwrap(),
            rebiased
        );
    }

    #[test]
    fn rebias_rejects_non_positive_bias_and_leaves_config_untouched() {
        let dir = tempdir().unwrap();
        let registry = sample_registry();
        let setup = run(
            &registry,
            GeneralParams::default(),
            dir.path(),
            &ProgressReporter::new(),
        )
        .unwrap();

        let err = rebias(&registry, dir.path(), Some(-5.0), None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::InvalidValue { param: "w", .. })
        ));
        assert!(matches!(
            rebias(&registry, dir.path(), None, Some(0.0)),
            Err(EngineError::Config(ConfigError::InvalidValue { param: "sigma", .. }))
        ));
        assert_eq!(
            RunData::load_config(&setup.config_path).unwrap(),
            setup.run_data
        );
    }
}
