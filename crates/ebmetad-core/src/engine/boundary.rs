/// Probability a bin must exceed to fall inside the restraint's active window.
pub const BOUNDARY_CUTOFF: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestraintBounds {
    pub min_dist: f64,
    pub max_dist: f64,
}

/// Finds the distance window in which the restraint is active.
///
/// `min_dist` is the scaled index of the first bin above [`BOUNDARY_CUTOFF`],
/// defaulting to one bin width. `max_dist` is the scaled index of the last such
/// bin, found scanning downwards and never inspecting bin 0; it defaults to the
/// last bin's scaled index.
///
/// Distances are `index * bin_width`, i.e. measured from a zero origin rather
/// than from the first bin center.
pub fn boundary_scan(probs: &[f64], bin_width: f64) -> RestraintBounds {
    let last = probs.len().saturating_sub(1);
    let above = |p: f64| p > BOUNDARY_CUTOFF;

    let min_dist = probs
        .iter()
        .position(|&p| above(p))
        .map_or(bin_width, |i| i as f64 * bin_width);

    // The downward scan stops before index 0; each miss leaves the last bin as the answer.
    let mut max_dist = last as f64 * bin_width;
    for i in (1..=last).rev() {
        if above(probs[i]) {
            max_dist = i as f64 * bin_width;
            break;
        }
        max_dist = last as f64 * bin_width;
    }

    RestraintBounds { min_dist, max_dist }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_tail_above_cutoff_sets_max_at_that_bin() {
        let probs = [0.0001, 0.01, 0.3, 0.4, 0.2, 0.01, 0.0001];
        let bounds = boundary_scan(&probs, 1.0);
        assert_eq!(bounds.min_dist, 1.0);
        assert_eq!(bounds.max_dist, 5.0);
    }

    #[test]
    fn upper_tail_below_cutoff_is_excluded() {
        let probs = [0.0001, 0.01, 0.3, 0.4, 0.2, 0.004, 0.0001];
        let bounds = boundary_scan(&probs, 1.0);
        assert_eq!(bounds.min_dist, 1.0);
        assert_eq!(bounds.max_dist, 4.0);
    }

    #[test]
    fn bounds_scale_with_bin_width() {
        let probs = [0.0, 0.0, 0.5, 0.5, 0.0];
        let bounds = boundary_scan(&probs, 0.25);
        assert_eq!(bounds.min_dist, 0.5);
        assert_eq!(bounds.max_dist, 0.75);
    }

    #[test]
    fn first_bin_above_cutoff_gives_zero_min() {
        let bounds = boundary_scan(&[0.9, 0.1], 2.0);
        assert_eq!(bounds.min_dist, 0.0);
        assert_eq!(bounds.max_dist, 2.0);
    }

    #[test]
    fn nothing_above_cutoff_uses_defaults() {
        let bounds = boundary_scan(&[0.001; 6], 0.5);
        assert_eq!(bounds.min_dist, 0.5);
        assert_eq!(bounds.max_dist, 2.5);
    }

    #[test]
    fn only_first_bin_above_cutoff_falls_back_to_last_bin() {
        let bounds = boundary_scan(&[1.0, 0.0, 0.0, 0.0], 1.0);
        assert_eq!(bounds.min_dist, 0.0);
        assert_eq!(bounds.max_dist, 3.0);
    }

    #[test]
    fn empty_distribution_does_not_panic() {
        let bounds = boundary_scan(&[], 1.0);
        assert_eq!(bounds.min_dist, 1.0);
        assert_eq!(bounds.max_dist, 0.0);
    }
}
