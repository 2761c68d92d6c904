use super::config::ConfigError;
use crate::core::metadata::MetadataError;
use crate::core::pairs::RegistryError;
use crate::core::statistics::NumericsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Numerical error for pair '{pair}': {source}")]
    Numerics {
        pair: String,
        #[source]
        source: NumericsError,
    },

    #[error("Parameter '{key}' cannot be routed {route}")]
    InvalidRoute { key: String, route: &'static str },

    #[error("Unknown run parameter '{0}'")]
    UnknownParameter(String),

    #[error("Parameter '{0}' is pair-specific; a pair name is required")]
    MissingName(String),

    #[error("Pair '{0}' has no run parameters")]
    UnknownPair(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Malformed input in '{path}': {reason}")]
    MalformedInput { path: String, reason: String },

    #[error("No replica data available for pair '{0}'")]
    NoReplicaData(String),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

impl EngineError {
    pub(crate) fn numerics(pair: &str) -> impl FnOnce(NumericsError) -> Self + '_ {
        move |source| EngineError::Numerics {
            pair: pair.to_string(),
            source,
        }
    }
}
