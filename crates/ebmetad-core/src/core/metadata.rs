use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// A plain nested key-value mapping used as the persistence form of every record.
pub type Dictionary = Map<String, Value>;

/// The distinct kinds of named record handled by the library.
///
/// Each kind declares the set of keys that must be present before a store of
/// that kind can be handed to a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Experimental target distribution for one restrained residue pair.
    Pair,
    /// Ensemble-wide metadynamics settings.
    GeneralParams,
    /// Derived, per-pair operational state of a run.
    PairParams,
    /// Merged general and pair parameters consumed by the restraint in the MD engine.
    Restraint,
    /// Convergence-tracking results for one pair.
    Analysis,
}

impl RecordKind {
    pub const fn required_keys(self) -> &'static [&'static str] {
        match self {
            RecordKind::Pair => &["distribution", "bins", "sites"],
            RecordKind::GeneralParams => &["w", "sigma", "sample_period", "k", "ensemble_num"],
            RecordKind::PairParams => &[
                "sites",
                "force_table",
                "distance_counts",
                "min_dist",
                "max_dist",
                "bin_width",
                "historical_data_filename",
            ],
            RecordKind::Restraint => &[
                "sites",
                "force_table",
                "distance_counts",
                "bin_width",
                "min_dist",
                "max_dist",
                "k",
                "sample_period",
                "historical_data_filename",
            ],
            RecordKind::Analysis => &[
                "distribution",
                "bins",
                "simulated_distributions",
                "ensemble_distribution",
                "divergences",
                "ensemble_divergence",
            ],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetadataError {
    #[error("Key '{key}' not found in metadata '{name}'")]
    KeyNotFound { name: String, key: String },

    #[error("Metadata '{name}' is missing required parameter(s): {}", missing.join(", "))]
    MissingParameter { name: String, missing: Vec<String> },

    #[error("Malformed value for '{key}' in metadata '{name}': {reason}")]
    MalformedInput {
        name: String,
        key: String,
        reason: String,
    },
}

/// A named, untyped key-value store with a declared set of required keys.
///
/// `set` stores unconditionally; type checking happens only when a typed
/// [`Record`] is extracted from the store via [`MetaData::get_as`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetaData {
    name: String,
    kind: RecordKind,
    data: Dictionary,
}

impl MetaData {
    pub fn new(name: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            name: name.into(),
            kind,
            data: Dictionary::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn requirements(&self) -> &'static [&'static str] {
        self.kind.required_keys()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set_serialized<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), MetadataError> {
        let value = serde_json::to_value(value).map_err(|e| MetadataError::MalformedInput {
            name: self.name.clone(),
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&Value, MetadataError> {
        self.data.get(key).ok_or_else(|| MetadataError::KeyNotFound {
            name: self.name.clone(),
            key: key.to_string(),
        })
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, MetadataError> {
        let value = self.get(key)?;
        T::deserialize(value).map_err(|e| MetadataError::MalformedInput {
            name: self.name.clone(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get_missing_keys(&self) -> Vec<&'static str> {
        self.requirements()
            .iter()
            .copied()
            .filter(|key| !self.data.contains_key(*key))
            .collect()
    }

    /// Fails with [`MetadataError::MissingParameter`] unless every required key is set.
    pub fn ensure_complete(&self) -> Result<(), MetadataError> {
        let missing = self.get_missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MetadataError::MissingParameter {
                name: self.name.clone(),
                missing: missing.into_iter().map(String::from).collect(),
            })
        }
    }

    /// Replaces the whole contents of the store. Existing keys are not merged.
    pub fn set_from_dictionary(&mut self, data: Dictionary) {
        self.data = data;
    }

    pub fn get_as_dictionary(&self) -> &Dictionary {
        &self.data
    }

    pub fn into_dictionary(self) -> Dictionary {
        self.data
    }

    /// Copies every key this store requires from `source`, ignoring everything else.
    pub fn scan_dictionary(&mut self, source: &Dictionary) {
        for &key in self.requirements() {
            if let Some(value) = source.get(key) {
                self.data.insert(key.to_string(), value.clone());
            }
        }
    }
}

/// A strongly typed view over a [`MetaData`] store of a fixed [`RecordKind`].
///
/// Conversion from the untyped store is the validation boundary: missing keys
/// and wrongly typed values are rejected there and nowhere else.
pub trait Record: Sized {
    const KIND: RecordKind;

    fn record_name(&self) -> &str;

    fn to_metadata(&self) -> Result<MetaData, MetadataError>;

    fn from_fields(metadata: &MetaData) -> Result<Self, MetadataError>;

    fn from_metadata(metadata: &MetaData) -> Result<Self, MetadataError> {
        if metadata.kind() != Self::KIND {
            return Err(MetadataError::MalformedInput {
                name: metadata.name().to_string(),
                key: String::new(),
                reason: format!(
                    "expected a {:?} record, found {:?}",
                    Self::KIND,
                    metadata.kind()
                ),
            });
        }
        metadata.ensure_complete()?;
        Self::from_fields(metadata)
    }

    fn from_dictionary(name: &str, data: Dictionary) -> Result<Self, MetadataError> {
        let mut metadata = MetaData::new(name, Self::KIND);
        metadata.set_from_dictionary(data);
        Self::from_metadata(&metadata)
    }

    fn to_dictionary(&self) -> Result<Dictionary, MetadataError> {
        Ok(self.to_metadata()?.into_dictionary())
    }
}
