use super::statistics::{NumericsError, check_same_len, check_width, normalize};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Probabilities at or below this floor contribute nothing to the entropy sum.
pub const PROBABILITY_FLOOR: f64 = 1e-5;

/// Dense square lookup table of biasing force contributions.
///
/// Row `i` is the currently sampled distance bin, column `j` a historical
/// distance bin. Serializes as a plain list of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForceTable(Vec<Vec<f64>>);

impl ForceTable {
    pub fn zeros(side: usize) -> Self {
        Self(vec![vec![0.0; side]; side])
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self(rows)
    }

    pub fn side(&self) -> usize {
        self.0.len()
    }

    pub fn is_square(&self) -> bool {
        let side = self.side();
        self.0.iter().all(|row| row.len() == side)
    }

    pub fn get(&self, current: usize, historical: usize) -> Option<f64> {
        self.0.get(current)?.get(historical).copied()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.0
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.0
    }
}

/// `Σ p·ln(p)` over the bins above [`PROBABILITY_FLOOR`].
///
/// Note the sign: this is the negative of the Shannon entropy.
pub fn entropy(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|&&p| p > PROBABILITY_FLOOR)
        .map(|&p| p * p.ln())
        .sum()
}

/// `exp(entropy(p))` of a normalized distribution.
pub fn effective_volume(probs: &[f64]) -> f64 {
    entropy(probs).exp()
}

/// Builds the EBMetaD force table for a target distribution `distribution`
/// over bin centers `bins`, with Gaussian height `w` and width `sigma`.
///
/// Cells where either bin coordinate is exactly zero are left at zero. The
/// table does not encode the restraint's active window; the consuming engine
/// must switch the restraint off outside `[min_dist, max_dist]`.
pub fn build_force_table(
    distribution: &[f64],
    bins: &[f64],
    w: f64,
    sigma: f64,
) -> Result<ForceTable, NumericsError> {
    check_same_len("bins", bins, "distribution", distribution)?;
    check_width(sigma)?;

    let n = bins.len();
    if n == 0 {
        return Ok(ForceTable::zeros(0));
    }

    let probs = normalize(distribution)?;
    let volume = effective_volume(&probs);
    let sigma_sq = sigma * sigma;
    let prefactor = w / volume / sigma_sq;

    if bins.iter().any(|&x| x == 0.0) {
        warn!(
            "Distance bins contain a zero coordinate; the corresponding force-table cells are left at zero."
        );
    }

    let rows = bins
        .iter()
        .map(|&current| {
            bins.iter()
                .zip(&probs)
                .map(|(&historical, &p)| {
                    if current == 0.0 || historical == 0.0 {
                        return 0.0;
                    }
                    let delta = current - historical;
                    let exponent = -(delta * delta) / sigma_sq / 2.0;
                    // The +1 keeps the bias finite and non-zero where the target is empty.
                    let deer = 1.0 / (p + 1.0);
                    prefactor * deer * (1.0 - historical / current) * exponent.exp()
                })
                .collect()
        })
        .collect();

    Ok(ForceTable(rows))
}
