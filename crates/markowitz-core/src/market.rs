//! Immutable market description: expected returns, covariance and the
//! cached quantities every frontier computation reuses.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MarkowitzError;
use crate::frontier::{self, FrontierCurve};
use crate::linalg::{
    checked_div, checked_mul, checked_sub, mat_inverse, mat_vec_multiply, max_abs_entry, vec_dot,
};
use crate::solver::{self, Portfolio};
use crate::types::Rate;
use crate::MarkowitzResult;

/// Pivot threshold for inverting the covariance after it is divided by its
/// largest absolute entry.
pub const SINGULARITY_TOLERANCE: Decimal = dec!(0.000000000001);

/// `D` is treated as zero when `|D| <= DEGENERACY_TOLERANCE * |A * C|`.
pub const DEGENERACY_TOLERANCE: Decimal = dec!(0.0000000001);

/// The scalar aggregates of the closed-form frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregates {
    /// `1' * inv(cov) * 1`
    pub a: Decimal,
    /// `1' * inv(cov) * mu`
    pub b: Decimal,
    /// `mu' * inv(cov) * mu`
    pub c: Decimal,
    /// `A * C - B^2`
    pub d: Decimal,
}

impl Aggregates {
    fn from_inverse(inv: &[Vec<Decimal>], mu: &[Rate]) -> MarkowitzResult<Self> {
        let ones = vec![Decimal::ONE; mu.len()];
        let inv_ones = mat_vec_multiply(inv, &ones)?;
        let inv_mu = mat_vec_multiply(inv, mu)?;
        let a = vec_dot(&ones, &inv_ones)?;
        let b = vec_dot(&ones, &inv_mu)?;
        let c = vec_dot(mu, &inv_mu)?;
        let d = checked_sub(
            checked_mul(a, c, "aggregates")?,
            checked_mul(b, b, "aggregates")?,
            "aggregates",
        )?;
        Ok(Self { a, b, c, d })
    }

    /// Aggregates of `s * M` given those of `M`: `A, B, C` scale by `1/s`
    /// and `D` by `1/s²`.
    fn rescale(self, s: Decimal) -> MarkowitzResult<Self> {
        let ctx = "aggregate rescaling";
        Ok(Self {
            a: checked_div(self.a, s, ctx)?,
            b: checked_div(self.b, s, ctx)?,
            c: checked_div(self.c, s, ctx)?,
            d: checked_div(checked_div(self.d, s, ctx)?, s, ctx)?,
        })
    }
}

/// Expected returns and covariance of `n` assets, with the inverse
/// covariance and aggregates computed once at construction.
///
/// The inverse is taken of `cov / cov_scale`, whose entries lie in
/// `[-1, 1]`, so Decimal's fixed fractional precision is spent on
/// significant digits whatever the units of the input. Solves run on the
/// normalized inverse and aggregates; weights do not depend on the scale.
#[derive(Debug, Clone)]
pub struct MarketModel {
    mu: Vec<Rate>,
    cov: Vec<Vec<Decimal>>,
    cov_scale: Decimal,
    normalized_inv: Vec<Vec<Decimal>>,
    normalized: Aggregates,
    inv_cov: Vec<Vec<Decimal>>,
    aggregates: Aggregates,
}

impl MarketModel {
    /// Build a model from expected returns and a covariance matrix.
    ///
    /// Only shapes are validated; symmetry and definiteness are the caller's
    /// responsibility. A non-invertible covariance fails with
    /// [`MarkowitzError::SingularCovariance`].
    pub fn new(mu: Vec<Rate>, cov: Vec<Vec<Decimal>>) -> MarkowitzResult<Self> {
        validate_shapes(&mu, &cov)?;

        let n = mu.len();
        let cov_scale = max_abs_entry(&cov);
        if cov_scale.is_zero() {
            return Err(MarkowitzError::SingularCovariance(
                "covariance matrix is all zeros".into(),
            ));
        }

        let scaled: Vec<Vec<Decimal>> = cov
            .iter()
            .map(|row| row.iter().map(|x| *x / cov_scale).collect())
            .collect();
        let normalized_inv = mat_inverse(&scaled, SINGULARITY_TOLERANCE)?;
        let normalized = Aggregates::from_inverse(&normalized_inv, &mu)?;

        let inv_cov = normalized_inv
            .iter()
            .map(|row| {
                row.iter()
                    .map(|x| checked_div(*x, cov_scale, "inverse rescaling"))
                    .collect()
            })
            .collect::<MarkowitzResult<Vec<Vec<Decimal>>>>()?;
        let aggregates = normalized.rescale(cov_scale)?;

        let Aggregates { a, b, c, d } = aggregates;
        debug!(n, %cov_scale, %a, %b, %c, %d, "constructed market model");

        let model = Self {
            mu,
            cov,
            cov_scale,
            normalized_inv,
            normalized,
            inv_cov,
            aggregates,
        };
        if model.is_degenerate() {
            warn!(%d, "market is degenerate; target-return solves will fail");
        }
        Ok(model)
    }

    /// Number of assets.
    pub fn n(&self) -> usize {
        self.mu.len()
    }

    pub fn mu(&self) -> &[Rate] {
        &self.mu
    }

    pub fn cov(&self) -> &[Vec<Decimal>] {
        &self.cov
    }

    pub fn inv_cov(&self) -> &[Vec<Decimal>] {
        &self.inv_cov
    }

    /// Cached `(A, B, C, D)`.
    pub fn aggregates(&self) -> Aggregates {
        self.aggregates
    }

    /// Largest absolute covariance entry.
    pub fn cov_scale(&self) -> Decimal {
        self.cov_scale
    }

    /// Inverse of `cov / cov_scale`, i.e. `cov_scale * inv(cov)`.
    pub fn normalized_inv_cov(&self) -> &[Vec<Decimal>] {
        &self.normalized_inv
    }

    /// Aggregates of [`Self::normalized_inv_cov`]: `A, B, C` are
    /// `cov_scale` times the true ones and `D` is `cov_scale²` times.
    pub fn normalized_aggregates(&self) -> Aggregates {
        self.normalized
    }

    /// True when `D` is zero within tolerance, i.e. the budget and return
    /// constraints are not independent under the inverse-covariance metric.
    /// The test is scale-free, so it runs on the normalized aggregates.
    pub fn is_degenerate(&self) -> bool {
        let Aggregates { a, c, d, .. } = self.normalized;
        match a.checked_mul(c) {
            Some(ac) => d.abs() <= DEGENERACY_TOLERANCE * ac.abs(),
            None => false,
        }
    }

    /// Fails with [`MarkowitzError::DegenerateMarket`] for a degenerate market.
    pub fn ensure_solvable(&self) -> MarkowitzResult<()> {
        if self.is_degenerate() {
            return Err(MarkowitzError::DegenerateMarket {
                d: self.aggregates.d,
            });
        }
        Ok(())
    }

    /// Minimum-variance portfolio with expected return `target`.
    pub fn solve(&self, target: Rate) -> MarkowitzResult<Portfolio> {
        solver::solve(self, target)
    }

    /// Frontier over `[r_min, r_max]` sampled at `k` evenly spaced targets.
    pub fn sweep(&self, r_min: Rate, r_max: Rate, k: usize) -> MarkowitzResult<FrontierCurve> {
        frontier::sweep(self, r_min, r_max, k)
    }
}

fn validate_shapes(mu: &[Rate], cov: &[Vec<Decimal>]) -> MarkowitzResult<()> {
    let n = cov.len();
    for (i, row) in cov.iter().enumerate() {
        if row.len() != n {
            return Err(MarkowitzError::DimensionMismatch {
                field: "covariance_matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }
    }
    if mu.len() != n {
        return Err(MarkowitzError::DimensionMismatch {
            field: "expected_returns".into(),
            reason: format!(
                "Expected {} returns to match a {}x{} covariance matrix but got {}",
                n,
                n,
                n,
                mu.len()
            ),
        });
    }
    if n < 2 {
        return Err(MarkowitzError::DimensionMismatch {
            field: "expected_returns".into(),
            reason: format!("At least 2 assets required, got {}", n),
        });
    }
    Ok(())
}
