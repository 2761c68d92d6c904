use crate::cli::AnalyzeArgs;
use crate::config::{CliOverrides, PartialRunConfig};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ebmetad::{
    core::pairs::PairRegistry,
    engine::{counts::SimulationCounts, progress::ProgressReporter},
    workflows,
};
use tracing::{info, warn};

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = PartialRunConfig::from_optional_file(args.config.as_deref())?.merge_with_cli(
        CliOverrides {
            smoothing_sigma: args.smoothing_sigma,
            ..CliOverrides::default()
        },
    )?;

    info!("Loading pair data from {:?}", &args.pairs);
    let registry = PairRegistry::load(&args.pairs)?;
    info!("Loading simulation data from {:?}", &args.sim_data);
    let counts = SimulationCounts::load(&args.sim_data)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Analysing convergence of {} pair(s)...", registry.len());
    let report = workflows::analyze::run(&registry, &counts, &config.analysis, &reporter)?;

    if report.is_empty() {
        warn!("No pair had replica data; the analysis is empty.");
        println!("Warning: no pair had replica data to analyse.");
    }

    report.write_json(&args.output)?;
    if let Some(path) = &args.csv {
        report.write_csv(path)?;
        println!("  Distribution table written to: {}", path.display());
    }

    for record in report.records() {
        println!(
            "  {:<16} JS(ensemble) = {:.4} over {} replica(s)",
            record.name,
            record.ensemble_divergence,
            record.divergences.len()
        );
    }
    if let Some(mean) = report.mean_ensemble_divergence() {
        println!("✓ Mean ensemble divergence: {:.4}", mean);
    }
    println!("✓ Analysis written to: {}", args.output.display());
    Ok(())
}
