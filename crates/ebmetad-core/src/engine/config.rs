use super::analysis::DEFAULT_SMOOTHING_SIGMA;
use super::run_data::GeneralParams;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value {value} for '{param}': {reason}")]
    InvalidValue {
        param: &'static str,
        value: f64,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Gaussian width used to smooth replica count logs.
    pub smoothing_sigma: f64,
    /// Remove the uniform prior of one count per bin before smoothing.
    pub subtract_prior: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            smoothing_sigma: DEFAULT_SMOOTHING_SIGMA,
            subtract_prior: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub general: GeneralParams,
    pub analysis: AnalysisConfig,
}

#[derive(Default)]
pub struct RunConfigBuilder {
    w: Option<f64>,
    sigma: Option<f64>,
    sample_period: Option<u64>,
    k: Option<f64>,
    ensemble_num: Option<u32>,
    smoothing_sigma: Option<f64>,
    subtract_prior: Option<bool>,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn w(mut self, w: f64) -> Self {
        self.w = Some(w);
        self
    }
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }
    pub fn sample_period(mut self, steps: u64) -> Self {
        self.sample_period = Some(steps);
        self
    }
    pub fn k(mut self, k: f64) -> Self {
        self.k = Some(k);
        self
    }
    pub fn ensemble_num(mut self, member: u32) -> Self {
        self.ensemble_num = Some(member);
        self
    }
    pub fn smoothing_sigma(mut self, sigma: f64) -> Self {
        self.smoothing_sigma = Some(sigma);
        self
    }
    pub fn subtract_prior(mut self, subtract: bool) -> Self {
        self.subtract_prior = Some(subtract);
        self
    }

    pub(crate) fn positive(param: &'static str, value: f64) -> Result<f64, ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::InvalidValue {
                param,
                value,
                reason: "must be positive and finite",
            })
        }
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let general = GeneralParams {
            w: Self::positive("w", self.w.ok_or(ConfigError::MissingParameter("w"))?)?,
            sigma: Self::positive(
                "sigma",
                self.sigma.ok_or(ConfigError::MissingParameter("sigma"))?,
            )?,
            sample_period: self
                .sample_period
                .ok_or(ConfigError::MissingParameter("sample_period"))?,
            k: self.k.ok_or(ConfigError::MissingParameter("k"))?,
            ensemble_num: self
                .ensemble_num
                .ok_or(ConfigError::MissingParameter("ensemble_num"))?,
        };
        let analysis = AnalysisConfig {
            smoothing_sigma: Self::positive(
                "smoothing_sigma",
                self.smoothing_sigma
                    .ok_or(ConfigError::MissingParameter("smoothing_sigma"))?,
            )?,
            subtract_prior: self
                .subtract_prior
                .ok_or(ConfigError::MissingParameter("subtract_prior"))?,
        };
        Ok(RunConfig { general, analysis })
    }
}
