use super::error::EngineError;
use crate::core::metadata::{MetaData, MetadataError, Record, RecordKind};
use crate::core::pairs::PairRecord;
use crate::core::statistics::{NumericsError, gaussian_smoothing, jensen_shannon, normalize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default Gaussian width used to smooth count logs, matching the force-table default.
pub const DEFAULT_SMOOTHING_SIGMA: f64 = 0.2;

/// Convergence-tracking results for one restrained pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub name: String,
    /// Experimental target, as stored in the pair data.
    pub distribution: Vec<f64>,
    pub bins: Vec<f64>,
    /// Smoothed (unnormalized) distribution of each replica.
    pub simulated_distributions: BTreeMap<String, Vec<f64>>,
    /// Normalized average over all replicas.
    pub ensemble_distribution: Vec<f64>,
    /// Jensen-Shannon divergence of each replica against experiment.
    pub divergences: BTreeMap<String, f64>,
    pub ensemble_divergence: f64,
}

impl AnalysisRecord {
    /// Smooths every replica's counts with the experimental bins and compares
    /// the replicas, and their ensemble average, against the experimental target.
    ///
    /// Replicas without any counts are skipped; if none remain the pair has no
    /// replica data.
    pub fn build(
        pair: &PairRecord,
        replicas: &BTreeMap<String, Vec<f64>>,
        sigma: f64,
    ) -> Result<Self, EngineError> {
        if replicas.is_empty() {
            return Err(EngineError::NoReplicaData(pair.name.clone()));
        }

        let num_bins = pair.num_bins();
        if pair.distribution.len() != num_bins {
            return Err(EngineError::Numerics {
                pair: pair.name.clone(),
                source: NumericsError::DimensionMismatch {
                    left_name: "bins",
                    left: num_bins,
                    right_name: "distribution",
                    right: pair.distribution.len(),
                },
            });
        }

        let mut simulated_distributions = BTreeMap::new();
        let mut divergences = BTreeMap::new();
        let mut ensemble_sum = vec![0.0; num_bins];

        for (replica, counts) in replicas {
            if counts.len() != num_bins {
                return Err(EngineError::Numerics {
                    pair: pair.name.clone(),
                    source: NumericsError::DimensionMismatch {
                        left_name: "experimental bins",
                        left: num_bins,
                        right_name: "replica counts",
                        right: counts.len(),
                    },
                });
            }
            if counts.iter().sum::<f64>() <= 0.0 {
                warn!(
                    "Replica '{}' has no counts for pair '{}'; it will be skipped.",
                    replica, pair.name
                );
                continue;
            }

            let smoothed = gaussian_smoothing(counts, &pair.bins, sigma)
                .map_err(EngineError::numerics(&pair.name))?;
            let divergence = jensen_shannon(&smoothed, &pair.distribution)
                .map_err(EngineError::numerics(&pair.name))?;
            debug!(pair = %pair.name, replica = %replica, divergence, "Replica analysed.");

            for (total, value) in ensemble_sum.iter_mut().zip(&smoothed) {
                *total += value;
            }
            simulated_distributions.insert(replica.clone(), smoothed);
            divergences.insert(replica.clone(), divergence);
        }

        if simulated_distributions.is_empty() {
            return Err(EngineError::NoReplicaData(pair.name.clone()));
        }

        let ensemble_distribution =
            normalize(&ensemble_sum).map_err(EngineError::numerics(&pair.name))?;
        let ensemble_divergence = jensen_shannon(&ensemble_distribution, &pair.distribution)
            .map_err(EngineError::numerics(&pair.name))?;

        Ok(Self {
            name: pair.name.clone(),
            distribution: pair.distribution.clone(),
            bins: pair.bins.clone(),
            simulated_distributions,
            ensemble_distribution,
            divergences,
            ensemble_divergence,
        })
    }
}

impl Record for AnalysisRecord {
    const KIND: RecordKind = RecordKind::Analysis;

    fn record_name(&self) -> &str {
        &self.name
    }

    fn to_metadata(&self) -> Result<MetaData, MetadataError> {
        let mut metadata = MetaData::new(&self.name, Self::KIND);
        metadata.set_serialized("distribution", &self.distribution)?;
        metadata.set_serialized("bins", &self.bins)?;
        metadata.set_serialized("simulated_distributions", &self.simulated_distributions)?;
        metadata.set_serialized("ensemble_distribution", &self.ensemble_distribution)?;
        metadata.set_serialized("divergences", &self.divergences)?;
        metadata.set_serialized("ensemble_divergence", &self.ensemble_divergence)?;
        Ok(metadata)
    }

    fn from_fields(metadata: &MetaData) -> Result<Self, MetadataError> {
        Ok(Self {
            name: metadata.name().to_string(),
            distribution: metadata.get_as("distribution")?,
            bins: metadata.get_as("bins")?,
            simulated_distributions: metadata.get_as("simulated_distributions")?,
            ensemble_distribution: metadata.get_as("ensemble_distribution")?,
            divergences: metadata.get_as("divergences")?,
            ensemble_divergence: metadata.get_as("ensemble_divergence")?,
        })
    }
}

#[derive(Debug, Serialize)]
struct DistributionRow<'a> {
    pair: &'a str,
    series: &'a str,
    bin: usize,
    distance: f64,
    probability: f64,
}

/// Analysis results of every pair, keyed by pair name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisReport(BTreeMap<String, AnalysisRecord>);

impl AnalysisReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: AnalysisRecord) {
        self.0.insert(record.name.clone(), record);
    }

    pub fn get(&self, name: &str) -> Option<&AnalysisRecord> {
        self.0.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean of the per-pair ensemble divergences, or `None` for an empty report.
    pub fn mean_ensemble_divergence(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        let total: f64 = self.records().map(|r| r.ensemble_divergence).sum();
        Some(total / self.0.len() as f64)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), EngineError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| EngineError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        info!("Analysis written to {}", path.display());
        Ok(())
    }

    /// Long-format table with one row per pair, series and bin. Series are
    /// `experiment`, `ensemble` and each replica id; replica rows are normalized.
    pub fn write_csv(&self, path: &Path) -> Result<(), EngineError> {
        let csv_err = |e| EngineError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        };
        let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

        for record in self.records() {
            let experiment = normalize(&record.distribution)
                .map_err(EngineError::numerics(&record.name))?;
            let mut series: Vec<(&str, Vec<f64>)> = vec![
                ("experiment", experiment),
                ("ensemble", record.ensemble_distribution.clone()),
            ];
            for (replica, smoothed) in &record.simulated_distributions {
                let normalized =
                    normalize(smoothed).map_err(EngineError::numerics(&record.name))?;
                series.push((replica.as_str(), normalized));
            }

            for (label, values) in &series {
                for (bin, (&distance, &probability)) in record.bins.iter().zip(values).enumerate() {
                    writer
                        .serialize(DistributionRow {
                            pair: &record.name,
                            series: label,
                            bin,
                            distance,
                            probability,
                        })
                        .map_err(csv_err)?;
                }
            }
        }

        writer.flush().map_err(|e| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        info!("Analysis table written to {}", path.display());
        Ok(())
    }
}
