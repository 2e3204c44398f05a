//! Efficient frontier sweeps over a target-return interval.

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MarkowitzError;
use crate::linalg::checked_sub;
use crate::market::MarketModel;
use crate::solver::{self, Portfolio};
use crate::types::Rate;
use crate::MarkowitzResult;

/// Frontier portfolios in ascending target-return order.
///
/// Risk is not monotonic along the curve: below the global minimum-variance
/// return it decreases, above it increases, so the curve folds back on
/// itself at its leftmost point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierCurve {
    points: Vec<Portfolio>,
}

impl FrontierCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Portfolio> {
        self.points.iter()
    }

    pub fn points(&self) -> &[Portfolio] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Portfolio> {
        self.points
    }

    /// `(risk, expected_return)` pairs in curve order.
    pub fn risk_return_pairs(&self) -> Vec<(Rate, Rate)> {
        self.points
            .iter()
            .map(|p| (p.risk, p.expected_return))
            .collect()
    }

    /// Index of the lowest-risk sample (first one on ties).
    pub fn min_risk_index(&self) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, Rate)>, (i, p)| match best {
                Some((_, r)) if r <= p.risk => best,
                _ => Some((i, p.risk)),
            })
            .map(|(i, _)| i)
    }
}

impl<'a> IntoIterator for &'a FrontierCurve {
    type Item = &'a Portfolio;
    type IntoIter = std::slice::Iter<'a, Portfolio>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// `k` evenly spaced targets `r_min + i * (r_max - r_min) / (k - 1)`.
pub fn sample_targets(r_min: Rate, r_max: Rate, k: usize) -> MarkowitzResult<Vec<Rate>> {
    if k < 2 {
        return Err(MarkowitzError::InvalidRange {
            reason: format!("At least 2 sample points required, got {}", k),
        });
    }
    if r_min > r_max {
        return Err(MarkowitzError::InvalidRange {
            reason: format!("r_min {} exceeds r_max {}", r_min, r_max),
        });
    }

    let width = checked_sub(r_max, r_min, "frontier range")?;
    let step = width / Decimal::from(k as u64 - 1);
    Ok((0..k)
        .map(|i| r_min + step * Decimal::from(i as u64))
        .collect())
}

/// Solve the frontier at `k` evenly spaced targets across `[r_min, r_max]`.
///
/// Samples are solved in parallel; the result keeps ascending-target order.
pub fn sweep(
    model: &MarketModel,
    r_min: Rate,
    r_max: Rate,
    k: usize,
) -> MarkowitzResult<FrontierCurve> {
    let targets = sample_targets(r_min, r_max, k)?;
    // D is market-wide, so degeneracy fails every sample or none.
    model.ensure_solvable()?;

    debug!(%r_min, %r_max, k, "sweeping frontier");
    let points = targets
        .par_iter()
        .map(|target| solver::solve(model, *target))
        .collect::<MarkowitzResult<Vec<Portfolio>>>()?;
    debug!(points = points.len(), "frontier sweep complete");

    Ok(FrontierCurve { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TOL: Decimal = dec!(0.000000001);

    fn three_asset_model() -> MarketModel {
        MarketModel::new(
            vec![dec!(0.08), dec!(0.12), dec!(0.15)],
            vec![
                vec![dec!(0.01), dec!(0.003), dec!(0.002)],
                vec![dec!(0.003), dec!(0.0225), dec!(0.009)],
                vec![dec!(0.002), dec!(0.009), dec!(0.04)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_sample_targets_grid() {
        let t = sample_targets(dec!(0.10), dec!(0.20), 5).unwrap();
        assert_eq!(
            t,
            vec![dec!(0.10), dec!(0.125), dec!(0.15), dec!(0.175), dec!(0.20)]
        );
    }

    #[test]
    fn test_sample_targets_degenerate_interval() {
        let t = sample_targets(dec!(0.1), dec!(0.1), 3).unwrap();
        assert!(t.iter().all(|r| *r == dec!(0.1)));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(matches!(
            sample_targets(dec!(0.1), dec!(0.2), 1),
            Err(MarkowitzError::InvalidRange { .. })
        ));
        assert!(matches!(
            sample_targets(dec!(0.1), dec!(0.2), 0),
            Err(MarkowitzError::InvalidRange { .. })
        ));
        assert!(matches!(
            sample_targets(dec!(0.2), dec!(0.1), 10),
            Err(MarkowitzError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_range_wider_than_decimal_is_an_error() {
        assert!(matches!(
            sample_targets(Decimal::MIN, Decimal::MAX, 3),
            Err(MarkowitzError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_sweep_past_decimal_range_fails_cleanly() {
        let model = three_asset_model();
        let err = sweep(&model, dec!(0.1), dec!(100000000000000), 5).unwrap_err();
        assert!(matches!(err, MarkowitzError::ArithmeticOverflow { .. }), "{err}");
    }

    #[test]
    fn test_sweep_length_and_endpoints() {
        let model = three_asset_model();
        let curve = sweep(&model, dec!(0.07), dec!(0.16), 10).unwrap();
        assert_eq!(curve.len(), 10);
        assert!(!curve.is_empty());
        let first = &curve.points()[0];
        let last = &curve.points()[9];
        assert!((first.expected_return - dec!(0.07)).abs() < TOL);
        assert!((last.expected_return - dec!(0.16)).abs() < TOL);
    }

    #[test]
    fn test_sweep_matches_individual_solves() {
        let model = three_asset_model();
        let curve = sweep(&model, dec!(0.08), dec!(0.14), 4).unwrap();
        let targets = sample_targets(dec!(0.08), dec!(0.14), 4).unwrap();
        for (p, t) in curve.iter().zip(targets) {
            assert_eq!(*p, solver::solve(&model, t).unwrap());
        }
    }

    #[test]
    fn test_sweep_rejects_invalid_range_before_solving() {
        let model = three_asset_model();
        assert!(matches!(
            sweep(&model, dec!(0.16), dec!(0.07), 100),
            Err(MarkowitzError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_sweep_degenerate_market() {
        let model = MarketModel::new(
            vec![dec!(0.1), dec!(0.1)],
            vec![vec![dec!(0.04), dec!(0.01)], vec![dec!(0.01), dec!(0.09)]],
        )
        .unwrap();
        assert!(matches!(
            sweep(&model, dec!(0.05), dec!(0.15), 5),
            Err(MarkowitzError::DegenerateMarket { .. })
        ));
    }

    #[test]
    fn test_risk_return_pairs_and_min_index() {
        let model = three_asset_model();
        let curve = model.sweep(dec!(0.07), dec!(0.16), 19).unwrap();
        let pairs = curve.risk_return_pairs();
        assert_eq!(pairs.len(), 19);
        assert_eq!(pairs[0], (curve.points()[0].risk, curve.points()[0].expected_return));

        // Minimum variance return is B/A ~ 0.096, so the fold is interior
        let idx = curve.min_risk_index().unwrap();
        assert!(idx > 0 && idx < 18, "min risk index {}", idx);
        let min_risk = curve.points()[idx].risk;
        assert!(curve.iter().all(|p| p.risk >= min_risk));
    }

    #[test]
    fn test_min_risk_index_empty() {
        let curve = FrontierCurve { points: Vec::new() };
        assert_eq!(curve.min_risk_index(), None);
    }
}
