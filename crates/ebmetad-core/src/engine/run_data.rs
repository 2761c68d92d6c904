use super::boundary::boundary_scan;
use super::error::EngineError;
use crate::core::force_table::ForceTable;
use crate::core::metadata::{Dictionary, MetaData, MetadataError, Record, RecordKind};
use crate::core::pairs::{PairRecord, PairRegistry, Site};
use crate::core::statistics::NumericsError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const GENERAL_SECTION: &str = "general parameters";
pub const PAIR_SECTION: &str = "pair parameters";
pub const GENERAL_RECORD_NAME: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralKey {
    W,
    Sigma,
    SamplePeriod,
    K,
    EnsembleNum,
}

impl GeneralKey {
    pub const ALL: [GeneralKey; 5] = [
        GeneralKey::W,
        GeneralKey::Sigma,
        GeneralKey::SamplePeriod,
        GeneralKey::K,
        GeneralKey::EnsembleNum,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            GeneralKey::W => "w",
            GeneralKey::Sigma => "sigma",
            GeneralKey::SamplePeriod => "sample_period",
            GeneralKey::K => "k",
            GeneralKey::EnsembleNum => "ensemble_num",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairKey {
    Sites,
    ForceTable,
    DistanceCounts,
    MinDist,
    MaxDist,
    BinWidth,
    HistoricalDataFilename,
}

impl PairKey {
    pub const ALL: [PairKey; 7] = [
        PairKey::Sites,
        PairKey::ForceTable,
        PairKey::DistanceCounts,
        PairKey::MinDist,
        PairKey::MaxDist,
        PairKey::BinWidth,
        PairKey::HistoricalDataFilename,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PairKey::Sites => "sites",
            PairKey::ForceTable => "force_table",
            PairKey::DistanceCounts => "distance_counts",
            PairKey::MinDist => "min_dist",
            PairKey::MaxDist => "max_dist",
            PairKey::BinWidth => "bin_width",
            PairKey::HistoricalDataFilename => "historical_data_filename",
        }
    }
}

/// A run parameter name, resolved to the branch of [`RunData`] it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    General(GeneralKey),
    Pair(PairKey),
}

impl FromStr for ParamKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = GeneralKey::ALL.into_iter().find(|k| k.as_str() == s) {
            return Ok(ParamKey::General(key));
        }
        if let Some(key) = PairKey::ALL.into_iter().find(|k| k.as_str() == s) {
            return Ok(ParamKey::Pair(key));
        }
        Err(EngineError::UnknownParameter(s.to_string()))
    }
}

fn encode<T: Serialize + ?Sized>(owner: &str, key: &str, value: &T) -> Result<Value, MetadataError> {
    serde_json::to_value(value).map_err(|e| MetadataError::MalformedInput {
        name: owner.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(owner: &str, key: &str, value: Value) -> Result<T, MetadataError> {
    serde_json::from_value(value).map_err(|e| MetadataError::MalformedInput {
        name: owner.to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn section<'a>(data: &'a Value, key: &str) -> Result<&'a Dictionary, EngineError> {
    data.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| EngineError::MalformedInput {
            path: "run data".to_string(),
            reason: format!("missing or non-mapping section '{key}'"),
        })
}

/// Metadynamics settings shared by every restraint of one ensemble member.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralParams {
    /// Gaussian height.
    pub w: f64,
    /// Gaussian width, in distance units.
    pub sigma: f64,
    /// Steps between distance samples.
    pub sample_period: u64,
    /// Spring constant applied outside the active window.
    pub k: f64,
    pub ensemble_num: u32,
}

impl Default for GeneralParams {
    fn default() -> Self {
        Self {
            w: 10.0,
            sigma: 0.2,
            sample_period: 500,
            k: 100.0,
            ensemble_num: 1,
        }
    }
}

impl GeneralParams {
    pub fn value(&self, key: GeneralKey) -> Result<Value, MetadataError> {
        let name = GENERAL_RECORD_NAME;
        let k = key.as_str();
        match key {
            GeneralKey::W => encode(name, k, &self.w),
            GeneralKey::Sigma => encode(name, k, &self.sigma),
            GeneralKey::SamplePeriod => encode(name, k, &self.sample_period),
            GeneralKey::K => encode(name, k, &self.k),
            GeneralKey::EnsembleNum => encode(name, k, &self.ensemble_num),
        }
    }

    pub fn set_value(&mut self, key: GeneralKey, value: Value) -> Result<(), MetadataError> {
        let name = GENERAL_RECORD_NAME;
        let k = key.as_str();
        match key {
            GeneralKey::W => self.w = decode(name, k, value)?,
            GeneralKey::Sigma => self.sigma = decode(name, k, value)?,
            GeneralKey::SamplePeriod => self.sample_period = decode(name, k, value)?,
            GeneralKey::K => self.k = decode(name, k, value)?,
            GeneralKey::EnsembleNum => self.ensemble_num = decode(name, k, value)?,
        }
        Ok(())
    }
}

impl Record for GeneralParams {
    const KIND: RecordKind = RecordKind::GeneralParams;

    fn record_name(&self) -> &str {
        GENERAL_RECORD_NAME
    }

    fn to_metadata(&self) -> Result<MetaData, MetadataError> {
        let mut metadata = MetaData::new(GENERAL_RECORD_NAME, Self::KIND);
        for key in GeneralKey::ALL {
            metadata.set(key.as_str(), self.value(key)?);
        }
        Ok(metadata)
    }

    fn from_fields(metadata: &MetaData) -> Result<Self, MetadataError> {
        let mut params = Self::default();
        for key in GeneralKey::ALL {
            params.set_value(key, metadata.get(key.as_str())?.clone())?;
        }
        Ok(params)
    }
}

/// Derived, per-restraint state of a run.
///
/// `force_table` is square with side `distance_counts.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairParams {
    pub name: String,
    pub sites: Vec<Site>,
    pub force_table: ForceTable,
    /// Accumulated sampling histogram, one entry per distance bin.
    pub distance_counts: Vec<u64>,
    pub min_dist: f64,
    pub max_dist: f64,
    pub bin_width: f64,
    pub historical_data_filename: String,
}

impl PairParams {
    pub fn historical_data_filename_for(name: &str) -> String {
        format!("counts_{name}.log")
    }

    /// Derives the run parameters of `pair` for the current `w`/`sigma`.
    ///
    /// Bins are assumed uniformly spaced; only the first two are used for the
    /// bin width. The sampling histogram starts as a uniform prior of ones.
    pub fn derive(pair: &PairRecord, general: &GeneralParams) -> Result<Self, EngineError> {
        let bin_width = match pair.bins.as_slice() {
            [first, second, ..] => second - first,
            bins => {
                return Err(EngineError::Numerics {
                    pair: pair.name.clone(),
                    source: NumericsError::TooFewBins {
                        required: 2,
                        found: bins.len(),
                    },
                });
            }
        };

        let bounds = boundary_scan(&pair.distribution, bin_width);
        let force_table = pair
            .build_force_table(general.w, general.sigma)
            .map_err(EngineError::numerics(&pair.name))?;

        debug!(
            pair = %pair.name,
            bin_width,
            min_dist = bounds.min_dist,
            max_dist = bounds.max_dist,
            "Derived restraint parameters."
        );

        Ok(Self {
            name: pair.name.clone(),
            sites: pair.sites.clone(),
            distance_counts: vec![1; force_table.side()],
            force_table,
            min_dist: bounds.min_dist,
            max_dist: bounds.max_dist,
            bin_width,
            historical_data_filename: Self::historical_data_filename_for(&pair.name),
        })
    }

    pub fn num_bins(&self) -> usize {
        self.distance_counts.len()
    }

    /// Fails unless the force table is square with one row per histogram bin.
    pub fn check_consistency(&self) -> Result<(), EngineError> {
        let side = self.force_table.side();
        let widest = self.force_table.rows().iter().map(Vec::len).max().unwrap_or(0);
        let mismatch = if !self.force_table.is_square() {
            Some(widest)
        } else if side != self.distance_counts.len() {
            Some(self.distance_counts.len())
        } else {
            None
        };

        match mismatch {
            None => Ok(()),
            Some(right) => Err(EngineError::Numerics {
                pair: self.name.clone(),
                source: NumericsError::DimensionMismatch {
                    left_name: "force_table",
                    left: side,
                    right_name: if self.force_table.is_square() {
                        "distance_counts"
                    } else {
                        "force_table row"
                    },
                    right,
                },
            }),
        }
    }

    pub fn value(&self, key: PairKey) -> Result<Value, MetadataError> {
        let name = self.name.as_str();
        let k = key.as_str();
        match key {
            PairKey::Sites => encode(name, k, &self.sites),
            PairKey::ForceTable => encode(name, k, &self.force_table),
            PairKey::DistanceCounts => encode(name, k, &self.distance_counts),
            PairKey::MinDist => encode(name, k, &self.min_dist),
            PairKey::MaxDist => encode(name, k, &self.max_dist),
            PairKey::BinWidth => encode(name, k, &self.bin_width),
            PairKey::HistoricalDataFilename => encode(name, k, &self.historical_data_filename),
        }
    }

    pub fn set_value(&mut self, key: PairKey, value: Value) -> Result<(), MetadataError> {
        let name = self.name.clone();
        let k = key.as_str();
        match key {
            PairKey::Sites => self.sites = decode(&name, k, value)?,
            PairKey::ForceTable => self.force_table = decode(&name, k, value)?,
            PairKey::DistanceCounts => self.distance_counts = decode(&name, k, value)?,
            PairKey::MinDist => self.min_dist = decode(&name, k, value)?,
            PairKey::MaxDist => self.max_dist = decode(&name, k, value)?,
            PairKey::BinWidth => self.bin_width = decode(&name, k, value)?,
            PairKey::HistoricalDataFilename => {
                self.historical_data_filename = decode(&name, k, value)?
            }
        }
        Ok(())
    }
}

impl Record for PairParams {
    const KIND: RecordKind = RecordKind::PairParams;

    fn record_name(&self) -> &str {
        &self.name
    }

    fn to_metadata(&self) -> Result<MetaData, MetadataError> {
        let mut metadata = MetaData::new(&self.name, Self::KIND);
        for key in PairKey::ALL {
            metadata.set(key.as_str(), self.value(key)?);
        }
        Ok(metadata)
    }

    fn from_fields(metadata: &MetaData) -> Result<Self, MetadataError> {
        Ok(Self {
            name: metadata.name().to_string(),
            sites: metadata.get_as(PairKey::Sites.as_str())?,
            force_table: metadata.get_as(PairKey::ForceTable.as_str())?,
            distance_counts: metadata.get_as(PairKey::DistanceCounts.as_str())?,
            min_dist: metadata.get_as(PairKey::MinDist.as_str())?,
            max_dist: metadata.get_as(PairKey::MaxDist.as_str())?,
            bin_width: metadata.get_as(PairKey::BinWidth.as_str())?,
            historical_data_filename: metadata
                .get_as(PairKey::HistoricalDataFilename.as_str())?,
        })
    }
}

/// The full parameter set of one ensemble member: general settings plus the
/// derived parameters of every restrained pair, in pair-data order.
///
/// Changing `w` or `sigma` does not touch existing force tables; call
/// [`RunData::refresh_force_tables`] (or [`RunData::derive_from_pair`]) afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunData {
    general: GeneralParams,
    pairs: Vec<PairParams>,
}

impl RunData {
    pub fn new(general: GeneralParams) -> Self {
        Self {
            general,
            pairs: Vec::new(),
        }
    }

    /// Derives run parameters for every pair of `registry`.
    pub fn from_registry(
        registry: &PairRegistry,
        general: GeneralParams,
    ) -> Result<Self, EngineError> {
        let mut run_data = Self::new(general);
        for pair in registry {
            run_data.derive_from_pair(pair)?;
        }
        info!(
            num_pairs = run_data.pairs.len(),
            ensemble_num = run_data.general.ensemble_num,
            "Run parameters derived from pair data."
        );
        Ok(run_data)
    }

    pub fn general(&self) -> &GeneralParams {
        &self.general
    }

    pub fn general_mut(&mut self) -> &mut GeneralParams {
        &mut self.general
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.pairs.iter().position(|params| params.name == name)
    }

    pub fn pair(&self, name: &str) -> Result<&PairParams, EngineError> {
        self.position(name)
            .map(|index| &self.pairs[index])
            .ok_or_else(|| EngineError::UnknownPair(name.to_string()))
    }

    pub fn pair_mut(&mut self, name: &str) -> Result<&mut PairParams, EngineError> {
        match self.position(name) {
            Some(index) => Ok(&mut self.pairs[index]),
            None => Err(EngineError::UnknownPair(name.to_string())),
        }
    }

    pub fn pair_names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|params| params.name.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = &PairParams> {
        self.pairs.iter()
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// Sets a parameter by name. General parameters take no pair name; pair
    /// parameters require one.
    pub fn set(&mut self, key: &str, value: Value, name: Option<&str>) -> Result<(), EngineError> {
        match (key.parse::<ParamKey>()?, name) {
            (ParamKey::General(key), None) => self.general.set_value(key, value)?,
            (ParamKey::Pair(key), Some(name)) => self.pair_mut(name)?.set_value(key, value)?,
            (ParamKey::General(key), Some(_)) => {
                return Err(EngineError::InvalidRoute {
                    key: key.as_str().to_string(),
                    route: "to a pair; it is a general parameter",
                });
            }
            (ParamKey::Pair(key), None) => {
                return Err(EngineError::InvalidRoute {
                    key: key.as_str().to_string(),
                    route: "to the general parameters; it is pair-specific",
                });
            }
        }
        Ok(())
    }

    /// Looks up a parameter by name. General parameters ignore `name`.
    pub fn get(&self, key: &str, name: Option<&str>) -> Result<Value, EngineError> {
        match key.parse::<ParamKey>()? {
            ParamKey::General(key) => Ok(self.general.value(key)?),
            ParamKey::Pair(key) => {
                let name = name.ok_or_else(|| EngineError::MissingName(key.as_str().to_string()))?;
                Ok(self.pair(name)?.value(key)?)
            }
        }
    }

    /// (Re)derives the parameters of one pair from its target distribution,
    /// discarding any previous state for that pair.
    pub fn derive_from_pair(&mut self, pair: &PairRecord) -> Result<(), EngineError> {
        let params = PairParams::derive(pair, &self.general)?;
        match self.position(&pair.name) {
            Some(index) => self.pairs[index] = params,
            None => self.pairs.push(params),
        }
        Ok(())
    }

    /// Rebuilds every force table with the current `w`/`sigma`, keeping the
    /// sampling histograms.
    pub fn refresh_force_tables(&mut self, registry: &PairRegistry) -> Result<(), EngineError> {
        let (w, sigma) = (self.general.w, self.general.sigma);
        for params in self.pairs.iter_mut() {
            let pair = registry.by_name(&params.name)?;
            params.force_table = pair
                .build_force_table(w, sigma)
                .map_err(EngineError::numerics(&params.name))?;
        }
        info!(w, sigma, "Force tables recomputed for {} pair(s).", self.pairs.len());
        Ok(())
    }

    /// The merged general and pair parameters handed to one restraint.
    pub fn restraint_parameters(&self, name: &str) -> Result<Dictionary, EngineError> {
        let pair = self.pair(name)?;
        pair.check_consistency()?;

        let mut restraint = MetaData::new(name, RecordKind::Restraint);
        restraint.scan_dictionary(&self.general.to_dictionary()?);
        restraint.scan_dictionary(&pair.to_dictionary()?);
        restraint.ensure_complete()?;
        Ok(restraint.into_dictionary())
    }

    pub fn as_dictionary(&self) -> Result<Value, EngineError> {
        let mut pair_section = Dictionary::new();
        for params in &self.pairs {
            pair_section.insert(params.name.clone(), Value::Object(params.to_dictionary()?));
        }

        let mut root = Dictionary::new();
        root.insert(
            GENERAL_SECTION.to_string(),
            Value::Object(self.general.to_dictionary()?),
        );
        root.insert(PAIR_SECTION.to_string(), Value::Object(pair_section));
        Ok(Value::Object(root))
    }

    pub fn from_dictionary(data: &Value) -> Result<Self, EngineError> {
        let general_section = section(data, GENERAL_SECTION)?;
        let pair_section = section(data, PAIR_SECTION)?;

        let general = GeneralParams::from_dictionary(GENERAL_RECORD_NAME, general_section.clone())?;

        let mut pairs = Vec::with_capacity(pair_section.len());
        for (name, entry) in pair_section {
            let fields = entry
                .as_object()
                .cloned()
                .ok_or_else(|| EngineError::MalformedInput {
                    path: "run data".to_string(),
                    reason: format!("parameters of pair '{name}' are not a mapping"),
                })?;
            pairs.push(PairParams::from_dictionary(name, fields)?);
        }

        Ok(Self { general, pairs })
    }

    pub fn save_config(&self, path: &Path) -> Result<(), EngineError> {
        let json_err = |e| EngineError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        };
        let content = serde_json::to_string(&self.as_dictionary()?).map_err(json_err)?;
        std::fs::write(path, content).map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        debug!("Run configuration written to {}", path.display());
        Ok(())
    }

    pub fn load_config(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let data: Value = serde_json::from_str(&content).map_err(|e| EngineError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_dictionary(&data).map_err(|e| match e {
            EngineError::MalformedInput { reason, .. } => EngineError::MalformedInput {
                path: path.to_string_lossy().to_string(),
                reason,
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pairs::tests::sample_registry;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_run_data() -> RunData {
        RunData::from_registry(&sample_registry(), GeneralParams::default()).unwrap()
    }

    #[test]
    fn defaults_match_reference_settings() {
        let general = GeneralParams::default();
        assert_eq!(general.w, 10.0);
        assert_eq!(general.sigma, 0.2);
        assert_eq!(general.sample_period, 500);
        assert_eq!(general.k, 100.0);
        assert_eq!(general.ensemble_num, 1);
        assert!(general.to_metadata().unwrap().get_missing_keys().is_empty());
    }

    #[test]
    fn from_registry_creates_params_for_every_pair() {
        let run_data = sample_run_data();
        assert_eq!(
            run_data.pair_names().collect::<Vec<_>>(),
            vec!["052_210", "105_216"]
        );
        for params in run_data.pairs() {
            assert!(params.to_metadata().unwrap().get_missing_keys().is_empty());
            params.check_consistency().unwrap();
        }
    }

    #[test]
    fn derive_computes_width_bounds_filename_and_table() {
        let registry = sample_registry();
        let run_data = sample_run_data();
        let params = run_data.pair("052_210").unwrap();

        assert_eq!(params.bin_width, 1.0);
        assert_eq!(params.min_dist, 1.0);
        assert_eq!(params.max_dist, 5.0);
        assert_eq!(params.historical_data_filename, "counts_052_210.log");
        assert_eq!(params.distance_counts, vec![1; 7]);
        assert_eq!(params.sites, vec![Site::Index(52), Site::Index(210)]);

        let expected = registry
            .by_name("052_210")
            .unwrap()
            .build_force_table(10.0, 0.2)
            .unwrap();
        assert_eq!(params.force_table, expected);
    }

    #[test]
    fn derive_rejects_single_bin() {
        let pair = PairRecord::new("001_002", vec![1.0], vec![3.0], vec![]);
        let err = PairParams::derive(&pair, &GeneralParams::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Numerics {
                source: NumericsError::TooFewBins { found: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn set_routes_general_and_pair_keys() {
        let mut run_data = sample_run_data();
        run_data.set("w", json!(5.0), None).unwrap();
        run_data
            .set("distance_counts", json!([2, 2, 2, 2, 2]), Some("105_216"))
            .unwrap();

        assert_eq!(run_data.general().w, 5.0);
        assert_eq!(run_data.get("w", None).unwrap(), json!(5.0));
        assert_eq!(
            run_data.get("distance_counts", Some("105_216")).unwrap(),
            json!([2, 2, 2, 2, 2])
        );
    }

    #[test]
    fn set_rejects_crossed_routes() {
        let mut run_data = sample_run_data();
        assert!(matches!(
            run_data.set("force_table", json!([]), None),
            Err(EngineError::InvalidRoute { .. })
        ));
        assert!(matches!(
            run_data.set("sigma", json!(0.3), Some("052_210")),
            Err(EngineError::InvalidRoute { .. })
        ));
        assert!(matches!(
            run_data.set("temperature", json!(300), None),
            Err(EngineError::UnknownParameter(_))
        ));
    }

    #[test]
    fn set_with_wrong_type_is_malformed() {
        let mut run_data = sample_run_data();
        assert!(matches!(
            run_data.set("sample_period", json!("often"), None),
            Err(EngineError::Metadata(MetadataError::MalformedInput { .. }))
        ));
    }

    #[test]
    fn get_pair_key_requires_name() {
        let run_data = sample_run_data();
        assert!(matches!(
            run_data.get("min_dist", None),
            Err(EngineError::MissingName(key)) if key == "min_dist"
        ));
        assert!(matches!(
            run_data.get("min_dist", Some("999_999")),
            Err(EngineError::UnknownPair(_))
        ));
        assert_eq!(run_data.get("k", Some("052_210")).unwrap(), json!(100.0));
    }

    #[test]
    fn changing_sigma_leaves_tables_stale_until_refreshed() {
        let registry = sample_registry();
        let mut run_data = sample_run_data();
        run_data
            .set("distance_counts", json!([3, 3, 3, 3, 3]), Some("105_216"))
            .unwrap();
        let before = run_data.pair("105_216").unwrap().force_table.clone();

        run_data.set("sigma", json!(0.5), None).unwrap();
        assert_eq!(run_data.pair("105_216").unwrap().force_table, before);

        run_data.refresh_force_tables(&registry).unwrap();
        let params = run_data.pair("105_216").unwrap();
        assert_ne!(params.force_table, before);
        assert_eq!(
            params.force_table,
            registry
                .by_name("105_216")
                .unwrap()
                .build_force_table(10.0, 0.5)
                .unwrap()
        );
        assert_eq!(params.distance_counts, vec![3; 5]);
    }

    #[test]
    fn dictionary_round_trip_is_lossless() {
        let mut run_data = sample_run_data();
        run_data.general_mut().ensemble_num = 4;
        run_data.pair_mut("052_210").unwrap().distance_counts = vec![5, 1, 9, 12, 4, 1, 0];

        let dictionary = run_data.as_dictionary().unwrap();
        assert!(dictionary.get(GENERAL_SECTION).is_some());
        assert!(dictionary[PAIR_SECTION].get("105_216").is_some());

        let restored = RunData::from_dictionary(&dictionary).unwrap();
        assert_eq!(restored, run_data);
    }

    #[test]
    fn pairs_keep_pair_data_order_through_save_and_load() {
        let mut registry = PairRegistry::new();
        registry
            .set_from_value(json!({
                "105_216": {"distribution": [0.1, 0.4, 0.5], "bins": [1.0, 2.0, 3.0], "sites": [105, 216]},
                "052_210": {"distribution": [0.5, 0.4, 0.1], "bins": [1.0, 2.0, 3.0], "sites": [52, 210]}
            }))
            .unwrap();
        let run_data = RunData::from_registry(&registry, GeneralParams::default()).unwrap();
        assert_eq!(
            run_data.pair_names().collect::<Vec<_>>(),
            vec!["105_216", "052_210"]
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("run_config.json");
        run_data.save_config(&path).unwrap();
        let restored = RunData::load_config(&path).unwrap();
        assert_eq!(
            restored.pair_names().collect::<Vec<_>>(),
            vec!["105_216", "052_210"]
        );
    }

    #[test]
    fn from_dictionary_reports_missing_parameters() {
        let data = json!({
            GENERAL_SECTION: {"w": 10.0, "sigma": 0.2, "k": 100.0, "ensemble_num": 1},
            PAIR_SECTION: {}
        });
        match RunData::from_dictionary(&data) {
            Err(EngineError::Metadata(MetadataError::MissingParameter { missing, .. })) => {
                assert_eq!(missing, vec!["sample_period"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn from_dictionary_requires_both_sections() {
        let data = json!({ GENERAL_SECTION: {} });
        assert!(matches!(
            RunData::from_dictionary(&data),
            Err(EngineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run_config.json");
        let run_data = sample_run_data();
        run_data.save_config(&path).unwrap();

        assert_eq!(RunData::load_config(&path).unwrap(), run_data);
    }

    #[test]
    fn restraint_parameters_merge_general_and_pair_keys() {
        let run_data = sample_run_data();
        let restraint = run_data.restraint_parameters("105_216").unwrap();

        for key in RecordKind::Restraint.required_keys() {
            assert!(restraint.contains_key(*key), "missing {key}");
        }
        assert!(!restraint.contains_key("w"));
        assert_eq!(restraint["k"], json!(100.0));
        assert_eq!(restraint["bin_width"], json!(1.0));
    }

    #[test]
    fn restraint_parameters_reject_inconsistent_histogram() {
        let mut run_data = sample_run_data();
        run_data.pair_mut("105_216").unwrap().distance_counts = vec![1, 1];
        assert!(matches!(
            run_data.restraint_parameters("105_216"),
            Err(EngineError::Numerics {
                source: NumericsError::DimensionMismatch { left: 5, right: 2, .. },
                ..
            })
        ));
    }
}
