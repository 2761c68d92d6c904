use crate::cli::CollectArgs;
use crate::config::{CliOverrides, PartialRunConfig};
use crate::error::{CliError, Result};
use ebmetad::{
    core::pairs::PairRegistry,
    engine::counts::{SimulationCounts, discover_members, discover_pairs},
};
use tracing::{debug, info};

pub fn run(args: CollectArgs) -> Result<()> {
    let config = PartialRunConfig::from_optional_file(args.config.as_deref())?.merge_with_cli(
        CliOverrides {
            subtract_prior: args.keep_prior.then_some(false),
            ..CliOverrides::default()
        },
    )?;

    let members = if args.members.is_empty() {
        discover_members(&args.ensemble_dir)?
    } else {
        args.members.clone()
    };
    debug!("Ensemble members: {:?}", members);

    let pairs = match &args.pairs {
        Some(path) => {
            info!("Loading pair names from {:?}", path);
            PairRegistry::load(path)?.get_names()?.to_vec()
        }
        None => {
            let first = members.first().copied().ok_or_else(|| {
                CliError::Argument("no ensemble members to read".to_string())
            })?;
            discover_pairs(&args.ensemble_dir, first)?
        }
    };
    if pairs.is_empty() {
        return Err(CliError::Argument(format!(
            "no count logs found in {}",
            args.ensemble_dir.display()
        )));
    }

    println!(
        "Collecting count logs of {} pair(s) from {} member(s)...",
        pairs.len(),
        members.len()
    );
    let counts = SimulationCounts::collect(
        &args.ensemble_dir,
        &members,
        &pairs,
        config.analysis.subtract_prior,
    )?;
    counts.save(&args.output)?;

    println!("✓ Simulation data written to: {}", args.output.display());
    Ok(())
}
