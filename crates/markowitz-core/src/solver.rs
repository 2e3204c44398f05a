//! Closed-form minimum-variance solutions.
//!
//! Minimizing `w' Σ w` subject to `1'w = 1` and `mu'w = R` gives, from the
//! first-order conditions of the Lagrangian,
//!
//! ```text
//! λ = (C - B·R) / D
//! γ = (A·R - B) / D
//! w = Σ⁻¹ (λ·1 + γ·mu)
//! ```
//!
//! with `A, B, C, D` cached on the [`MarketModel`]. No iterative search is
//! involved, and no bounds are placed on `R`. Targets large enough to push
//! a weight or the variance past the Decimal range fail with
//! [`MarkowitzError::ArithmeticOverflow`].
//!
//! The weights are computed from the normalized inverse `s·Σ⁻¹` and its
//! aggregates, where `s` is the model's `cov_scale`. `λ` and `γ` shrink by
//! `1/s` and the inverse grows by `s`, so the product is unchanged.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MarkowitzError;
use crate::linalg::{
    checked_add, checked_div, checked_mul, checked_sub, mat_vec_multiply, quadratic_form, vec_dot,
};
use crate::market::{Aggregates, MarketModel};
use crate::types::Rate;
use crate::MarkowitzResult;

/// Negative variance beyond `VARIANCE_TOLERANCE * cov_scale * (Σ|w|)²` is
/// reported as an error; anything smaller is rounding noise and clamps to zero.
pub const VARIANCE_TOLERANCE: Decimal = dec!(0.000000000001);

/// A frontier portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// One weight per asset; negative weights are short positions.
    pub weights: Vec<Rate>,
    /// `w' * mu`
    pub expected_return: Rate,
    /// Standard deviation `sqrt(w' Σ w)`.
    pub risk: Rate,
}

impl Portfolio {
    /// Sum of the weights (1 for every frontier portfolio).
    pub fn total_weight(&self) -> Decimal {
        self.weights.iter().copied().sum()
    }

    /// Sum of absolute weights.
    pub fn gross_exposure(&self) -> Decimal {
        self.weights.iter().map(|w| w.abs()).sum()
    }

    pub fn variance(&self) -> Decimal {
        self.risk * self.risk
    }
}

/// Minimum-variance portfolio whose expected return equals `target`.
pub fn solve(model: &MarketModel, target: Rate) -> MarkowitzResult<Portfolio> {
    model.ensure_solvable()?;
    let Aggregates { a, b, c, d } = model.normalized_aggregates();
    let ctx = "target-return multipliers";

    let lambda = checked_div(checked_sub(c, checked_mul(b, target, ctx)?, ctx)?, d, ctx)?;
    let gamma = checked_div(checked_sub(checked_mul(a, target, ctx)?, b, ctx)?, d, ctx)?;

    let combo = model
        .mu()
        .iter()
        .map(|m| checked_add(lambda, checked_mul(gamma, *m, ctx)?, ctx))
        .collect::<MarkowitzResult<Vec<Decimal>>>()?;
    let weights = mat_vec_multiply(model.normalized_inv_cov(), &combo)?;

    evaluate(model, weights)
}

/// Global minimum-variance portfolio: `w = Σ⁻¹·1 / A`, return `B/A`,
/// variance `1/A`.
///
/// Only `A > 0` is required, so this also answers for degenerate markets
/// where no target-return solve exists.
pub fn minimum_variance(model: &MarketModel) -> MarkowitzResult<Portfolio> {
    let a = model.normalized_aggregates().a;
    if a <= Decimal::ZERO {
        // 1/A is the GMV variance
        let variance = checked_div(model.cov_scale(), a, "minimum-variance weights")
            .unwrap_or(Decimal::ZERO);
        return Err(MarkowitzError::NegativeVariance { variance });
    }
    let ones = vec![Decimal::ONE; model.n()];
    let weights = mat_vec_multiply(model.normalized_inv_cov(), &ones)?
        .into_iter()
        .map(|v| checked_div(v, a, "minimum-variance weights"))
        .collect::<MarkowitzResult<Vec<Decimal>>>()?;
    evaluate(model, weights)
}

/// Frontier risk at `target` from the aggregates alone:
/// `sqrt((A·R² - 2·B·R + C) / D)`.
pub fn frontier_risk(model: &MarketModel, target: Rate) -> MarkowitzResult<Rate> {
    model.ensure_solvable()?;
    let Aggregates { a, b, c, d } = model.normalized_aggregates();
    let ctx = "frontier variance";

    // On normalized aggregates the parabola is the true variance over s
    let quad = checked_mul(checked_mul(a, target, ctx)?, target, ctx)?;
    let linear = checked_mul(checked_mul(dec!(2), b, ctx)?, target, ctx)?;
    let numerator = checked_add(checked_sub(quad, linear, ctx)?, c, ctx)?;
    let variance = checked_mul(checked_div(numerator, d, ctx)?, model.cov_scale(), ctx)?;

    risk_from_variance(variance, variance_tolerance(model, Decimal::ONE)?)
}

fn evaluate(model: &MarketModel, weights: Vec<Rate>) -> MarkowitzResult<Portfolio> {
    let expected_return = vec_dot(&weights, model.mu())?;
    let variance = quadratic_form(model.cov(), &weights)?;
    let gross = weights.iter().try_fold(Decimal::ZERO, |acc, w| {
        checked_add(acc, w.abs(), "gross exposure")
    })?;
    let risk = risk_from_variance(variance, variance_tolerance(model, gross)?)?;

    Ok(Portfolio {
        weights,
        expected_return,
        risk,
    })
}

fn variance_tolerance(model: &MarketModel, gross_exposure: Decimal) -> MarkowitzResult<Decimal> {
    let ctx = "variance tolerance";
    let scale = checked_mul(VARIANCE_TOLERANCE, model.cov_scale(), ctx)?;
    checked_mul(checked_mul(scale, gross_exposure, ctx)?, gross_exposure, ctx)
}

fn risk_from_variance(variance: Decimal, tolerance: Decimal) -> MarkowitzResult<Rate> {
    if variance < -tolerance {
        return Err(MarkowitzError::NegativeVariance { variance });
    }
    if variance <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    variance
        .sqrt()
        .ok_or(MarkowitzError::NegativeVariance { variance })
}
