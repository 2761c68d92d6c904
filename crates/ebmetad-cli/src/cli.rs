use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "EBMetaD contributors",
    version,
    about = "EBMetaD CLI - Prepare, tune and analyse experiment-biased metadynamics restraints for ensembles of molecular dynamics replicas.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare one ensemble member: derive restraint parameters and write its run configuration.
    Setup(SetupArgs),
    /// Recompute the force tables of a prepared member with new bias parameters.
    Rebias(RebiasArgs),
    /// Build force tables over a grid of bias heights and widths.
    Sweep(SweepArgs),
    /// Gather the count logs of an ensemble into a single simulation-data file.
    Collect(CollectArgs),
    /// Compare replica sampling against the experimental distributions.
    Analyze(AnalyzeArgs),
}

/// Metadynamics parameters that can override the configuration file.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct BiasOverrides {
    /// Override the bias height `w`.
    #[arg(short = 'w', long, value_name = "FLOAT")]
    pub w: Option<f64>,

    /// Override the bias width `sigma`.
    #[arg(short = 's', long, value_name = "FLOAT")]
    pub sigma: Option<f64>,
}

/// Arguments for the `setup` subcommand.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Path to the experimental pair-data JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub pairs: PathBuf,

    /// Working directory of the ensemble member.
    #[arg(short = 'd', long, default_value = ".", value_name = "PATH")]
    pub working_dir: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Index of this member within the ensemble.
    #[arg(short, long, value_name = "INT")]
    pub ensemble_num: Option<u32>,

    #[command(flatten)]
    pub bias: BiasOverrides,

    /// Override the number of steps between histogram updates.
    #[arg(long, value_name = "INT")]
    pub sample_period: Option<u64>,

    /// Override the restraint force constant.
    #[arg(short, long, value_name = "FLOAT")]
    pub k: Option<f64>,

    /// Write the merged restraint parameter sets to this JSON file.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub restraints: Option<PathBuf>,
}

/// Arguments for the `rebias` subcommand.
#[derive(Args, Debug)]
pub struct RebiasArgs {
    /// Path to the experimental pair-data JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub pairs: PathBuf,

    /// Working directory of the prepared ensemble member.
    #[arg(short = 'd', long, default_value = ".", value_name = "PATH")]
    pub working_dir: PathBuf,

    #[command(flatten)]
    pub bias: BiasOverrides,
}

/// Arguments for the `sweep` subcommand.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Path to the experimental pair-data JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub pairs: PathBuf,

    /// Bias heights to try, comma separated (e.g. 1,10,100).
    #[arg(short = 'w', long = "weights", required = true, value_delimiter = ',', value_name = "FLOAT,...")]
    pub weights: Vec<f64>,

    /// Bias widths to try, comma separated (e.g. 0.1,0.2,0.4).
    #[arg(short = 's', long = "sigmas", required = true, value_delimiter = ',', value_name = "FLOAT,...")]
    pub sigmas: Vec<f64>,

    /// Output JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `collect` subcommand.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Ensemble directory containing the `mem_<n>` member directories.
    #[arg(short = 'f', long, required = true, value_name = "PATH")]
    pub ensemble_dir: PathBuf,

    /// Output JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Restrict to the pairs of this pair-data file instead of the logs of the first member.
    #[arg(short, long, value_name = "PATH")]
    pub pairs: Option<PathBuf>,

    /// Member numbers to read, comma separated. Defaults to every `mem_<n>` directory.
    #[arg(short, long, value_delimiter = ',', value_name = "INT,...")]
    pub members: Vec<u32>,

    /// Keep the uniform prior of one count per bin in the collected counts.
    #[arg(long)]
    pub keep_prior: bool,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to the experimental pair-data JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub pairs: PathBuf,

    /// Simulation-data JSON file produced by `collect`.
    #[arg(short = 'i', long = "sim-data", required = true, value_name = "PATH")]
    pub sim_data: PathBuf,

    /// Output JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Additionally write a long-format CSV table for plotting.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the Gaussian width used to smooth replica counts.
    #[arg(long, value_name = "FLOAT")]
    pub smoothing_sigma: Option<f64>,
}
