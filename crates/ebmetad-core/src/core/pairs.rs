use super::force_table::{ForceTable, build_force_table};
use super::metadata::{Dictionary, MetaData, MetadataError, Record, RecordKind};
use super::statistics::NumericsError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

/// Identifier of a restrained atom or residue, as understood by the MD engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Site {
    Index(u64),
    Label(String),
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Index(index) => write!(f, "{index}"),
            Site::Label(label) => f.write_str(label),
        }
    }
}

/// One restrained residue pair and its experimental target distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRecord {
    pub name: String,
    /// Target probability per distance bin.
    pub distribution: Vec<f64>,
    /// Distance-bin centers, strictly increasing.
    pub bins: Vec<f64>,
    pub sites: Vec<Site>,
}

impl PairRecord {
    pub fn new(
        name: impl Into<String>,
        distribution: Vec<f64>,
        bins: Vec<f64>,
        sites: Vec<Site>,
    ) -> Self {
        Self {
            name: name.into(),
            distribution,
            bins,
            sites,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn build_force_table(&self, w: f64, sigma: f64) -> Result<ForceTable, NumericsError> {
        build_force_table(&self.distribution, &self.bins, w, sigma)
    }
}

impl Record for PairRecord {
    const KIND: RecordKind = RecordKind::Pair;

    fn record_name(&self) -> &str {
        &self.name
    }

    fn to_metadata(&self) -> Result<MetaData, MetadataError> {
        let mut metadata = MetaData::new(&self.name, Self::KIND);
        metadata.set_serialized("distribution", &self.distribution)?;
        metadata.set_serialized("bins", &self.bins)?;
        metadata.set_serialized("sites", &self.sites)?;
        Ok(metadata)
    }

    fn from_fields(metadata: &MetaData) -> Result<Self, MetadataError> {
        Ok(Self {
            name: metadata.name().to_string(),
            distribution: metadata.get_as("distribution")?,
            bins: metadata.get_as("bins")?,
            sites: metadata.get_as("sites")?,
        })
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Malformed pair data: {0}")]
    MalformedInput(String),
    #[error("Pair '{0}' is not registered")]
    UnknownPair(String),
    #[error("Pair '{0}' is already registered")]
    DuplicatePair(String),
    #[error("Pair index {index} is out of range for a registry of {len} pairs")]
    InvalidIndex { index: usize, len: usize },
    #[error("Pair registry is empty; load pair data before requesting names")]
    EmptyRegistry,
}

impl From<MetadataError> for RegistryError {
    fn from(e: MetadataError) -> Self {
        RegistryError::MalformedInput(e.to_string())
    }
}

/// Ordered collection of [`PairRecord`]s with unique names.
///
/// Names are derived once from the records and cached; loading a file
/// replaces the whole collection and drops the cache.
#[derive(Debug, Default)]
pub struct PairRegistry {
    records: Vec<PairRecord>,
    names: OnceLock<Vec<String>>,
}

impl Clone for PairRegistry {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            names: OnceLock::new(),
        }
    }
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.read_from_json(path)?;
        Ok(registry)
    }

    pub fn read_from_json(&mut self, path: &Path) -> Result<(), RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let data: Value = serde_json::from_str(&content).map_err(|e| RegistryError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        self.set_from_value(data)?;
        info!(
            num_pairs = self.records.len(),
            "Loaded pair data from {}",
            path.display()
        );
        Ok(())
    }

    /// Replaces the registry contents with a `name -> {distribution, bins, sites}` mapping.
    pub fn set_from_value(&mut self, data: Value) -> Result<(), RegistryError> {
        let Value::Object(entries) = data else {
            return Err(RegistryError::MalformedInput(
                "expected a mapping from pair name to pair data".to_string(),
            ));
        };

        let mut records = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            let Value::Object(fields) = entry else {
                return Err(RegistryError::MalformedInput(format!(
                    "entry for pair '{name}' is not a mapping"
                )));
            };
            debug!("Parsing pair '{}'", name);
            records.push(PairRecord::from_dictionary(&name, fields)?);
        }

        self.records = records;
        self.names = OnceLock::new();
        Ok(())
    }

    pub fn write_to_json(&self, path: &Path) -> Result<(), RegistryError> {
        let dataset = self.get_as_single_dataset()?;
        let content = serde_json::to_string_pretty(&dataset).map_err(|e| RegistryError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| RegistryError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// All records as one `name -> record` mapping, in registry order.
    pub fn get_as_single_dataset(&self) -> Result<Dictionary, RegistryError> {
        let mut dataset = Dictionary::new();
        for record in &self.records {
            dataset.insert(record.name.clone(), Value::Object(record.to_dictionary()?));
        }
        Ok(dataset)
    }

    pub fn push(&mut self, record: PairRecord) -> Result<usize, RegistryError> {
        if self.records.iter().any(|r| r.name == record.name) {
            return Err(RegistryError::DuplicatePair(record.name));
        }
        self.records.push(record);
        self.names = OnceLock::new();
        Ok(self.records.len() - 1)
    }

    pub fn get_names(&self) -> Result<&[String], RegistryError> {
        if self.records.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }
        let names = self
            .names
            .get_or_init(|| self.records.iter().map(|r| r.name.clone()).collect());
        Ok(names)
    }

    pub fn name_to_id(&self, name: &str) -> Result<usize, RegistryError> {
        self.get_names()?
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| RegistryError::UnknownPair(name.to_string()))
    }

    pub fn id_to_name(&self, id: usize) -> Result<&str, RegistryError> {
        let names = self.get_names()?;
        names
            .get(id)
            .map(String::as_str)
            .ok_or(RegistryError::InvalidIndex {
                index: id,
                len: names.len(),
            })
    }

    pub fn get(&self, id: usize) -> Option<&PairRecord> {
        self.records.get(id)
    }

    pub fn by_name(&self, name: &str) -> Result<&PairRecord, RegistryError> {
        let id = self.name_to_id(name)?;
        Ok(&self.records[id])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a PairRegistry {
    type Item = &'a PairRecord;
    type IntoIter = std::slice::Iter<'a, PairRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    pub(crate) const PAIR_DATA: &str = r#"{
        "052_210": {
            "distribution": [0.0001, 0.01, 0.3, 0.4, 0.2, 0.01, 0.0001],
            "bins": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
            "sites": [52, 210]
        },
        "105_216": {
            "distribution": [0.1, 0.2, 0.4, 0.2, 0.1],
            "bins": [1.0, 2.0, 3.0, 4.0, 5.0],
            "sites": ["105_CA", "216_CA"]
        }
    }"#;

    pub(crate) fn sample_registry() -> PairRegistry {
        let mut registry = PairRegistry::new();
        registry
            .set_from_value(serde_json::from_str(PAIR_DATA).unwrap())
            .unwrap();
        registry
    }

    #[test]
    fn read_from_json_keeps_file_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pair_data.json");
        fs::write(&path, PAIR_DATA).unwrap();

        let registry = PairRegistry::load(&path).unwrap();
        assert_eq!(registry.get_names().unwrap(), ["052_210", "105_216"]);
        assert_eq!(
            registry.get(1).unwrap().sites,
            vec![
                Site::Label("105_CA".to_string()),
                Site::Label("216_CA".to_string())
            ]
        );
    }

    #[test]
    fn name_to_id_inverts_id_to_name() {
        let registry = sample_registry();
        for name in registry.get_names().unwrap() {
            let id = registry.name_to_id(name).unwrap();
            assert_eq!(registry.id_to_name(id).unwrap(), name);
        }
        for id in 0..registry.len() {
            let name = registry.id_to_name(id).unwrap();
            assert_eq!(registry.name_to_id(name).unwrap(), id);
        }
    }

    #[test]
    fn get_names_before_load_fails() {
        let registry = PairRegistry::new();
        assert!(matches!(
            registry.get_names(),
            Err(RegistryError::EmptyRegistry)
        ));
    }

    #[test]
    fn unknown_name_fails() {
        let registry = sample_registry();
        assert!(matches!(
            registry.name_to_id("999_999"),
            Err(RegistryError::UnknownPair(name)) if name == "999_999"
        ));
        assert!(matches!(
            registry.id_to_name(7),
            Err(RegistryError::InvalidIndex { index: 7, len: 2 })
        ));
    }

    #[test]
    fn reload_replaces_contents() {
        let mut registry = sample_registry();
        assert_eq!(registry.len(), 2);
        registry
            .set_from_value(json!({
                "001_002": {"distribution": [1.0, 1.0], "bins": [1.0, 2.0], "sites": [1, 2]}
            }))
            .unwrap();
        assert_eq!(registry.get_names().unwrap(), ["001_002"]);
    }

    #[test]
    fn missing_required_key_is_malformed() {
        let mut registry = PairRegistry::new();
        let result = registry.set_from_value(json!({
            "052_210": {"distribution": [1.0], "sites": [1, 2]}
        }));
        match result {
            Err(RegistryError::MalformedInput(message)) => assert!(message.contains("bins")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_mapping_file_is_malformed() {
        let mut registry = PairRegistry::new();
        assert!(matches!(
            registry.set_from_value(json!([1, 2, 3])),
            Err(RegistryError::MalformedInput(_))
        ));
        assert!(matches!(
            registry.set_from_value(json!({"052_210": [1, 2]})),
            Err(RegistryError::MalformedInput(_))
        ));
    }

    #[test]
    fn invalid_json_file_reports_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PairRegistry::load(&path),
            Err(RegistryError::Json { .. })
        ));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            PairRegistry::load(&dir.path().join("absent.json")),
            Err(RegistryError::Io { .. })
        ));
    }

    #[test]
    fn push_rejects_duplicate_names_and_refreshes_names() {
        let mut registry = sample_registry();
        let _ = registry.get_names().unwrap();
        let id = registry
            .push(PairRecord::new("300_310", vec![1.0], vec![1.0], vec![]))
            .unwrap();
        assert_eq!(id, 2);
        assert_eq!(registry.name_to_id("300_310").unwrap(), 2);
        assert!(matches!(
            registry.push(PairRecord::new("300_310", vec![1.0], vec![1.0], vec![])),
            Err(RegistryError::DuplicatePair(_))
        ));
    }

    #[test]
    fn written_file_reads_back_identically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("copy.json");
        let registry = sample_registry();
        registry.write_to_json(&path).unwrap();

        let reloaded = PairRegistry::load(&path).unwrap();
        assert_eq!(
            reloaded.get_as_single_dataset().unwrap(),
            registry.get_as_single_dataset().unwrap()
        );
        assert_eq!(reloaded.get(0), registry.get(0));
    }
}
