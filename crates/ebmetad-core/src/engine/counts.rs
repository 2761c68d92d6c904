use super::error::EngineError;
use super::run_data::PairParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Count logs start from a uniform prior of one sample per bin.
pub const UNIFORM_PRIOR: f64 = 1.0;

pub fn replica_id(member: u32) -> String {
    format!("mem_{member}")
}

/// `<ensemble_dir>/mem_<member>/counts_<pair>.log`
pub fn count_log_path(ensemble_dir: &Path, member: u32, pair: &str) -> PathBuf {
    ensemble_dir
        .join(replica_id(member))
        .join(PairParams::historical_data_filename_for(pair))
}

fn parse_values(path: &Path, content: &str) -> Result<Vec<f64>, EngineError> {
    content
        .split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            let value: f64 = token.parse().map_err(|_| EngineError::MalformedInput {
                path: path.to_string_lossy().to_string(),
                reason: format!("entry {i} ('{token}') is not a number"),
            })?;
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::MalformedInput {
                    path: path.to_string_lossy().to_string(),
                    reason: format!("entry {i} ({value}) is not a non-negative count"),
                });
            }
            Ok(value)
        })
        .collect()
}

fn read_optional(path: &Path) -> Result<Option<String>, EngineError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        }),
    }
}

/// Reads a whitespace-separated count log, one entry per distance bin.
///
/// A missing or empty log yields `Ok(None)` after a warning; unreadable or
/// non-numeric content is an error.
pub fn read_count_log(path: &Path) -> Result<Option<Vec<f64>>, EngineError> {
    let Some(content) = read_optional(path)? else {
        warn!("{} does not exist. This file will be skipped.", path.display());
        return Ok(None);
    };
    let counts = parse_values(path, &content)?;
    if counts.is_empty() {
        warn!("{} is empty. This file will be skipped.", path.display());
        return Ok(None);
    }
    Ok(Some(counts))
}

/// Reads a historical sampling histogram as integer counts. Absent files yield
/// `Ok(None)`; empty ones do too, after a warning.
pub fn read_historical_counts(path: &Path) -> Result<Option<Vec<u64>>, EngineError> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    let values = parse_values(path, &content)?;
    if values.is_empty() {
        warn!("{} is empty. The uniform prior will be used instead.", path.display());
        return Ok(None);
    }
    values
        .into_iter()
        .map(|value| {
            if value.fract() == 0.0 {
                Ok(value as u64)
            } else {
                Err(EngineError::MalformedInput {
                    path: path.to_string_lossy().to_string(),
                    reason: format!("count {value} is not an integer"),
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn read_dir_names(dir: &Path) -> Result<Vec<String>, EngineError> {
    let io_error = |e: std::io::Error| EngineError::Io {
        path: dir.to_string_lossy().to_string(),
        source: e,
    };
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Member numbers of every `mem_<n>` directory in `ensemble_dir`, ascending.
pub fn discover_members(ensemble_dir: &Path) -> Result<Vec<u32>, EngineError> {
    let mut members: Vec<u32> = read_dir_names(ensemble_dir)?
        .iter()
        .filter(|name| ensemble_dir.join(name).is_dir())
        .filter_map(|name| name.strip_prefix("mem_")?.parse().ok())
        .collect();
    if members.is_empty() {
        return Err(EngineError::MalformedInput {
            path: ensemble_dir.to_string_lossy().to_string(),
            reason: "not an ensemble directory (no mem_<n> members)".to_string(),
        });
    }
    members.sort_unstable();
    Ok(members)
}

/// Pair names that have a `counts_<pair>.log` in the directory of `member`, sorted.
pub fn discover_pairs(ensemble_dir: &Path, member: u32) -> Result<Vec<String>, EngineError> {
    let mut pairs: Vec<String> = read_dir_names(&ensemble_dir.join(replica_id(member)))?
        .iter()
        .filter_map(|name| {
            let pair = name.strip_prefix("counts_")?.strip_suffix(".log")?;
            (!pair.is_empty()).then(|| pair.to_string())
        })
        .collect();
    pairs.sort();
    Ok(pairs)
}

/// Sampled-distance histograms of every replica, keyed `pair -> replica -> counts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationCounts(BTreeMap<String, BTreeMap<String, Vec<f64>>>);

impl SimulationCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gathers the count logs of `members` for every pair in `pairs`.
    ///
    /// With `subtract_prior`, the uniform prior is removed from each bin
    /// (clamped at zero). Missing or empty logs skip only that replica.
    pub fn collect(
        ensemble_dir: &Path,
        members: &[u32],
        pairs: &[String],
        subtract_prior: bool,
    ) -> Result<Self, EngineError> {
        let mut counts = Self::new();
        for pair in pairs {
            for &member in members {
                let path = count_log_path(ensemble_dir, member, pair);
                let Some(mut values) = read_count_log(&path)? else {
                    continue;
                };
                if subtract_prior {
                    for value in &mut values {
                        *value = (*value - UNIFORM_PRIOR).max(0.0);
                    }
                }
                debug!(pair = %pair, member, bins = values.len(), "Loaded count log.");
                counts.insert(pair, replica_id(member), values);
            }
        }
        info!(
            num_pairs = counts.0.len(),
            "Collected count logs from {} member(s) of {}",
            members.len(),
            ensemble_dir.display()
        );
        Ok(counts)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| EngineError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let content = serde_json::to_string(self).map_err(|e| EngineError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn insert(&mut self, pair: &str, replica: String, counts: Vec<f64>) {
        self.0
            .entry(pair.to_string())
            .or_default()
            .insert(replica, counts);
    }

    pub fn pair(&self, name: &str) -> Option<&BTreeMap<String, Vec<f64>>> {
        self.0.get(name)
    }

    pub fn pair_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_log(root: &Path, member: u32, pair: &str, content: &str) {
        let path = count_log_path(root, member, pair);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn count_log_path_follows_member_layout() {
        let path = count_log_path(Path::new("/ens"), 3, "052_210");
        assert_eq!(path, PathBuf::from("/ens/mem_3/counts_052_210.log"));
    }

    #[test]
    fn read_count_log_parses_whitespace_separated_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.log");
        fs::write(&path, "1\n2\n 3.000000e+00\n").unwrap();
        assert_eq!(read_count_log(&path).unwrap(), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn missing_and_empty_logs_are_skipped() {
        let dir = tempdir().unwrap();
        assert_eq!(read_count_log(&dir.path().join("absent.log")).unwrap(), None);

        let empty = dir.path().join("empty.log");
        fs::write(&empty, "\n").unwrap();
        assert_eq!(read_count_log(&empty).unwrap(), None);
    }

    #[test]
    fn non_numeric_or_negative_entries_are_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.log");
        fs::write(&path, "1 two 3").unwrap();
        assert!(matches!(
            read_count_log(&path),
            Err(EngineError::MalformedInput { .. })
        ));
        fs::write(&path, "1 -2 3").unwrap();
        assert!(matches!(
            read_count_log(&path),
            Err(EngineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn historical_counts_must_be_integers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.log");
        fs::write(&path, "4 0 7").unwrap();
        assert_eq!(read_historical_counts(&path).unwrap(), Some(vec![4, 0, 7]));
        fs::write(&path, "4 0.5 7").unwrap();
        assert!(read_historical_counts(&path).is_err());
        assert_eq!(
            read_historical_counts(&dir.path().join("absent.log")).unwrap(),
            None
        );
    }

    #[test]
    fn empty_historical_log_counts_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.log");
        fs::write(&path, "\n  \n").unwrap();
        assert_eq!(read_historical_counts(&path).unwrap(), None);
    }

    #[test]
    fn collect_skips_missing_replicas_and_continues() {
        let dir = tempdir().unwrap();
        let pairs = vec!["052_210".to_string()];
        write_log(dir.path(), 0, "052_210", "3 1 1");
        write_log(dir.path(), 1, "052_210", "");
        write_log(dir.path(), 3, "052_210", "1 5 2");

        let counts = SimulationCounts::collect(dir.path(), &[0, 1, 2, 3], &pairs, true).unwrap();
        let replicas = counts.pair("052_210").unwrap();

        assert_eq!(replicas.keys().collect::<Vec<_>>(), vec!["mem_0", "mem_3"]);
        assert_eq!(replicas["mem_0"], vec![2.0, 0.0, 0.0]);
        assert_eq!(replicas["mem_3"], vec![0.0, 4.0, 1.0]);
    }

    #[test]
    fn collect_without_prior_subtraction_keeps_raw_counts() {
        let dir = tempdir().unwrap();
        write_log(dir.path(), 0, "105_216", "0.5 1 1");
        let counts =
            SimulationCounts::collect(dir.path(), &[0], &["105_216".to_string()], false).unwrap();
        assert_eq!(counts.pair("105_216").unwrap()["mem_0"], vec![0.5, 1.0, 1.0]);
    }

    #[test]
    fn discovers_members_and_pairs_of_an_ensemble() {
        let dir = tempdir().unwrap();
        write_log(dir.path(), 10, "052_210", "1");
        write_log(dir.path(), 2, "052_210", "1");
        write_log(dir.path(), 2, "105_216", "1");
        fs::write(dir.path().join("mem_notes.txt"), "").unwrap();
        fs::write(dir.path().join("mem_2").join("other.log"), "").unwrap();

        assert_eq!(discover_members(dir.path()).unwrap(), vec![2, 10]);
        assert_eq!(
            discover_pairs(dir.path(), 2).unwrap(),
            vec!["052_210", "105_216"]
        );
    }

    #[test]
    fn directory_without_members_is_not_an_ensemble() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_members(dir.path()),
            Err(EngineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn saved_counts_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sim_data.json");
        let mut counts = SimulationCounts::new();
        counts.insert("052_210", "mem_0".to_string(), vec![1.0, 2.0]);
        counts.save(&path).unwrap();

        let loaded = SimulationCounts::load(&path).unwrap();
        assert_eq!(loaded, counts);
        assert_eq!(loaded.pair_names().collect::<Vec<_>>(), vec!["052_210"]);
    }
}
