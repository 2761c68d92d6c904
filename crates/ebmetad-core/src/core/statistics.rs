use std::f64::consts::PI;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumericsError {
    #[error("Dimension mismatch: {left_name} has {left} entries but {right_name} has {right}")]
    DimensionMismatch {
        left_name: &'static str,
        left: usize,
        right_name: &'static str,
        right: usize,
    },

    #[error("At least {required} bins are required, found {found}")]
    TooFewBins { required: usize, found: usize },

    #[error("Gaussian width must be positive and finite, got {0}")]
    InvalidWidth(f64),

    #[error("Cannot normalize a sequence whose total weight is {0}")]
    NonPositiveTotal(f64),
}

pub(crate) fn check_same_len(
    left_name: &'static str,
    left: &[f64],
    right_name: &'static str,
    right: &[f64],
) -> Result<(), NumericsError> {
    if left.len() != right.len() {
        return Err(NumericsError::DimensionMismatch {
            left_name,
            left: left.len(),
            right_name,
            right: right.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_width(sigma: f64) -> Result<(), NumericsError> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(NumericsError::InvalidWidth(sigma))
    }
}

/// Scales a non-negative sequence so that it sums to one.
pub fn normalize(weights: &[f64]) -> Result<Vec<f64>, NumericsError> {
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(NumericsError::NonPositiveTotal(total));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

/// Kernel-density smoothing of a binned histogram onto its own bin coordinates.
///
/// `hist[i] = 1/(2π·σ²) · Σ_j weights[j] · exp(-(values[j] - values[i])² / (2σ²))`
///
/// The result is not divided by `Σ weights`; callers comparing distributions
/// must [`normalize`] first.
pub fn gaussian_smoothing(
    weights: &[f64],
    values: &[f64],
    sigma: f64,
) -> Result<Vec<f64>, NumericsError> {
    check_same_len("weights", weights, "values", values)?;
    check_width(sigma)?;

    let two_sigma_sq = 2.0 * sigma * sigma;
    let norm = 1.0 / (PI * two_sigma_sq);

    let hist = values
        .iter()
        .map(|&center| {
            let sum: f64 = weights
                .iter()
                .zip(values)
                .map(|(&weight, &value)| {
                    let delta = value - center;
                    weight * (-(delta * delta) / two_sigma_sq).exp()
                })
                .sum();
            norm * sum
        })
        .collect();

    Ok(hist)
}

/// Natural-log Kullback-Leibler divergence of two already-normalized distributions,
/// with `0 · ln(0 / q) = 0`.
fn kullback_leibler(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .filter(|&(&pi, _)| pi > 0.0)
        .map(|(&pi, &qi)| pi * (pi / qi).ln())
        .sum()
}

/// Jensen-Shannon divergence between two non-negative sequences.
///
/// Both inputs are normalized first. The result lies in `[0, ln 2]`.
pub fn jensen_shannon(p: &[f64], q: &[f64]) -> Result<f64, NumericsError> {
    check_same_len("p", p, "q", q)?;
    let p = normalize(p)?;
    let q = normalize(q)?;

    let m: Vec<f64> = p.iter().zip(&q).map(|(a, b)| 0.5 * (a + b)).collect();
    let divergence = 0.5 * (kullback_leibler(&p, &m) + kullback_leibler(&q, &m));

    // Rounding can push identical inputs a hair below zero.
    Ok(divergence.max(0.0))
}
