use crate::cli::BiasOverrides;
use crate::error::{CliError, Result};
use ebmetad::engine::analysis::DEFAULT_SMOOTHING_SIGMA;
use ebmetad::engine::config::{RunConfig, RunConfigBuilder};
use ebmetad::engine::run_data::GeneralParams;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialMetadynamicsConfig {
    w: Option<f64>,
    sigma: Option<f64>,
    sample_period: Option<u64>,
    k: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialAnalysisConfig {
    smoothing_sigma: Option<f64>,
    subtract_prior: Option<bool>,
}

/// Values given on the command line. `None` leaves the file or default value in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliOverrides {
    pub bias: BiasOverrides,
    pub sample_period: Option<u64>,
    pub k: Option<f64>,
    pub ensemble_num: Option<u32>,
    pub smoothing_sigma: Option<f64>,
    pub subtract_prior: Option<bool>,
}

/// Contents of an optional TOML configuration file.
///
/// ```toml
/// [metadynamics]
/// w = 10.0
/// sigma = 0.2
/// sample-period = 500
/// k = 100.0
///
/// [analysis]
/// smoothing-sigma = 0.2
/// subtract-prior = true
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    metadynamics: Option<PartialMetadynamicsConfig>,
    analysis: Option<PartialAnalysisConfig>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads `path` when given, otherwise starts from an empty configuration.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolves every parameter as command line, then file, then built-in default.
    pub fn merge_with_cli(self, cli: CliOverrides) -> Result<RunConfig> {
        let defaults = GeneralParams::default();
        let md = self.metadynamics.unwrap_or_default();
        let analysis = self.analysis.unwrap_or_default();

        RunConfigBuilder::new()
            .w(cli.bias.w.or(md.w).unwrap_or(defaults.w))
            .sigma(cli.bias.sigma.or(md.sigma).unwrap_or(defaults.sigma))
            .sample_period(
                cli.sample_period
                    .or(md.sample_period)
                    .unwrap_or(defaults.sample_period),
            )
            .k(cli.k.or(md.k).unwrap_or(defaults.k))
            .ensemble_num(cli.ensemble_num.unwrap_or(defaults.ensemble_num))
            .smoothing_sigma(
                cli.smoothing_sigma
                    .or(analysis.smoothing_sigma)
                    .unwrap_or(DEFAULT_SMOOTHING_SIGMA),
            )
            .subtract_prior(
                cli.subtract_prior
                    .or(analysis.subtract_prior)
                    .unwrap_or(true),
            )
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}
