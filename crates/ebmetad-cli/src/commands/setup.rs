use crate::cli::SetupArgs;
use crate::config::{CliOverrides, PartialRunConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ebmetad::{
    core::{metadata::Dictionary, pairs::PairRegistry},
    engine::progress::ProgressReporter,
    workflows,
};
use serde_json::Value;
use std::path::Path;
use tracing::info;

pub fn run(args: SetupArgs) -> Result<()> {
    let partial_config = PartialRunConfig::from_optional_file(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(CliOverrides {
        bias: args.bias,
        sample_period: args.sample_period,
        k: args.k,
        ensemble_num: args.ensemble_num,
        ..CliOverrides::default()
    })?;

    info!("Loading pair data from {:?}", &args.pairs);
    let registry = PairRegistry::load(&args.pairs)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Preparing ensemble member {} in {}...",
        config.general.ensemble_num,
        args.working_dir.display()
    );
    let setup = workflows::setup::run(&registry, config.general, &args.working_dir, &reporter)?;

    println!(
        "✓ Run configuration for {} restraint(s) written to: {}",
        setup.run_data.num_pairs(),
        setup.config_path.display()
    );

    if let Some(path) = &args.restraints {
        write_restraints(path, setup.restraints)?;
        println!("  Restraint parameter sets written to: {}", path.display());
    }

    Ok(())
}

fn write_restraints(path: &Path, restraints: Vec<(String, Dictionary)>) -> Result<()> {
    let sets: Dictionary = restraints
        .into_iter()
        .map(|(name, params)| (name, Value::Object(params)))
        .collect();
    let content = serde_json::to_string_pretty(&sets).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    std::fs::write(path, content)?;
    Ok(())
}
