use crate::cli::SweepArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ebmetad::{core::pairs::PairRegistry, engine::progress::ProgressReporter, workflows};
use tracing::info;

pub fn run(args: SweepArgs) -> Result<()> {
    if args.weights.is_empty() || args.sigmas.is_empty() {
        return Err(CliError::Argument(
            "at least one value is required for both --weights and --sigmas".to_string(),
        ));
    }

    info!("Loading pair data from {:?}", &args.pairs);
    let registry = PairRegistry::load(&args.pairs)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Sweeping {} w value(s) x {} sigma value(s) over {} pair(s)...",
        args.weights.len(),
        args.sigmas.len(),
        registry.len()
    );
    let sweep = workflows::sweep::run(&registry, &args.weights, &args.sigmas, &reporter)?;
    sweep.write_json(&args.output)?;

    println!(
        "✓ {} force-table set(s) written to: {}",
        sweep.len(),
        args.output.display()
    );
    Ok(())
}
