use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MarkowitzError;
use crate::frontier::FrontierCurve;
use crate::market::MarketModel;
use crate::solver::{self, Portfolio};
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::MarkowitzResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input to a frontier analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierInput {
    /// Asset identifiers (defaults to "Asset 1".."Asset n").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_names: Option<Vec<String>>,
    /// Expected return per asset.
    pub expected_returns: Vec<Rate>,
    /// N x N covariance matrix.
    pub covariance_matrix: Vec<Vec<Decimal>>,
    /// Return the selected portfolio must achieve.
    #[serde(default = "default_target_return")]
    pub target_return: Rate,
    /// Lower end of the frontier sweep.
    #[serde(default = "default_frontier_min_return")]
    pub frontier_min_return: Rate,
    /// Upper end of the frontier sweep.
    #[serde(default = "default_frontier_max_return")]
    pub frontier_max_return: Rate,
    /// Number of frontier samples.
    #[serde(default = "default_frontier_points")]
    pub frontier_points: usize,
}

fn default_target_return() -> Rate {
    dec!(0.12)
}

fn default_frontier_min_return() -> Rate {
    dec!(0.07)
}

fn default_frontier_max_return() -> Rate {
    dec!(0.16)
}

fn default_frontier_points() -> usize {
    100
}

impl FrontierInput {
    /// Three-asset reference market:
    /// A (8% return, 10% vol), B (12%, 15%), C (15%, 20%).
    pub fn sample() -> Self {
        Self {
            asset_names: Some(vec![
                "Asset A".into(),
                "Asset B".into(),
                "Asset C".into(),
            ]),
            expected_returns: vec![dec!(0.08), dec!(0.12), dec!(0.15)],
            covariance_matrix: vec![
                vec![dec!(0.01), dec!(0.003), dec!(0.002)],
                vec![dec!(0.003), dec!(0.0225), dec!(0.009)],
                vec![dec!(0.002), dec!(0.009), dec!(0.04)],
            ],
            target_return: default_target_return(),
            frontier_min_return: default_frontier_min_return(),
            frontier_max_return: default_frontier_max_return(),
            frontier_points: default_frontier_points(),
        }
    }

    /// Parse an input document.
    pub fn from_json(json: &str) -> MarkowitzResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the market model described by this input.
    pub fn market_model(&self) -> MarkowitzResult<MarketModel> {
        MarketModel::new(
            self.expected_returns.clone(),
            self.covariance_matrix.clone(),
        )
    }

    /// Asset names, generated when absent. Fails if the count does not match.
    pub fn resolved_asset_names(&self) -> MarkowitzResult<Vec<String>> {
        let n = self.expected_returns.len();
        match &self.asset_names {
            Some(names) if names.len() != n => Err(MarkowitzError::DimensionMismatch {
                field: "asset_names".into(),
                reason: format!("Expected {} names but got {}", n, names.len()),
            }),
            Some(names) => Ok(names.clone()),
            None => Ok((1..=n).map(|i| format!("Asset {}", i)).collect()),
        }
    }
}

/// A single asset weight with its return contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetWeight {
    pub name: String,
    pub weight: Rate,
    /// Weight times expected return.
    pub contribution_to_return: Rate,
}

/// A portfolio with named weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPortfolio {
    pub weights: Vec<AssetWeight>,
    pub expected_return: Rate,
    pub risk: Rate,
}

/// A single point on the efficient frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub expected_return: Rate,
    pub risk: Rate,
    pub weights: Vec<Rate>,
}

/// Output of a frontier analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierOutput {
    /// Minimum-variance portfolio at the target return.
    pub selected: NamedPortfolio,
    /// Global minimum-variance portfolio.
    pub minimum_variance: NamedPortfolio,
    /// Frontier samples in ascending target order.
    pub efficient_frontier: Vec<FrontierPoint>,
    /// Index of the lowest-risk frontier sample.
    pub min_risk_index: Option<usize>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Solve the selected target, the global minimum-variance portfolio and the
/// efficient frontier for one market.
pub fn analyze_frontier(
    input: &FrontierInput,
) -> MarkowitzResult<ComputationOutput<FrontierOutput>> {
    let start = Instant::now();

    let names = input.resolved_asset_names()?;
    let model = input.market_model()?;

    let selected = model.solve(input.target_return)?;
    let gmv = solver::minimum_variance(&model)?;
    let curve = model.sweep(
        input.frontier_min_return,
        input.frontier_max_return,
        input.frontier_points,
    )?;

    let warnings = target_warnings(&names, &model, &selected, &gmv, input.target_return);
    let min_risk_index = curve.min_risk_index();

    let output = FrontierOutput {
        selected: NamedPortfolio::new(&names, model.mu(), selected),
        minimum_variance: NamedPortfolio::new(&names, model.mu(), gmv),
        efficient_frontier: frontier_points(curve),
        min_risk_index,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Markowitz closed-form (Lagrangian) efficient frontier",
        &assumptions(input, &model),
        warnings,
        elapsed,
        output,
    ))
}

/// Minimum-variance portfolio at `input.target_return`.
pub fn optimize_target(
    input: &FrontierInput,
) -> MarkowitzResult<ComputationOutput<NamedPortfolio>> {
    let start = Instant::now();

    let names = input.resolved_asset_names()?;
    let model = input.market_model()?;
    let selected = model.solve(input.target_return)?;
    let gmv = solver::minimum_variance(&model)?;
    let warnings = target_warnings(&names, &model, &selected, &gmv, input.target_return);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Markowitz closed-form (Lagrangian) target-return portfolio",
        &assumptions(input, &model),
        warnings,
        elapsed,
        NamedPortfolio::new(&names, model.mu(), selected),
    ))
}

/// Efficient frontier over `[frontier_min_return, frontier_max_return]`.
pub fn trace_frontier(
    input: &FrontierInput,
) -> MarkowitzResult<ComputationOutput<Vec<FrontierPoint>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let model = input.market_model()?;
    let curve = model.sweep(
        input.frontier_min_return,
        input.frontier_max_return,
        input.frontier_points,
    )?;

    if let Some(idx) = curve.min_risk_index() {
        if idx > 0 {
            warnings.push(format!(
                "Samples 0..{} lie below the minimum-variance return and are inefficient",
                idx
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Markowitz closed-form (Lagrangian) efficient frontier sweep",
        &assumptions(input, &model),
        warnings,
        elapsed,
        frontier_points(curve),
    ))
}

/// Global minimum-variance portfolio of the market.
pub fn global_minimum_variance(
    input: &FrontierInput,
) -> MarkowitzResult<ComputationOutput<NamedPortfolio>> {
    let start = Instant::now();

    let names = input.resolved_asset_names()?;
    let model = input.market_model()?;
    let gmv = solver::minimum_variance(&model)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Global minimum-variance portfolio (closed form)",
        &assumptions(input, &model),
        Vec::new(),
        elapsed,
        NamedPortfolio::new(&names, model.mu(), gmv),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl NamedPortfolio {
    /// Attach asset names and return contributions to a portfolio.
    pub fn new(names: &[String], mu: &[Rate], p: Portfolio) -> Self {
        let weights = names
            .iter()
            .zip(p.weights.iter().zip(mu.iter()))
            .map(|(name, (w, m))| AssetWeight {
                name: name.clone(),
                weight: *w,
                contribution_to_return: *w * *m,
            })
            .collect();
        Self {
            weights,
            expected_return: p.expected_return,
            risk: p.risk,
        }
    }
}

fn frontier_points(curve: FrontierCurve) -> Vec<FrontierPoint> {
    curve
        .into_points()
        .into_iter()
        .map(|p| FrontierPoint {
            expected_return: p.expected_return,
            risk: p.risk,
            weights: p.weights,
        })
        .collect()
}

fn target_warnings(
    names: &[String],
    model: &MarketModel,
    selected: &Portfolio,
    gmv: &Portfolio,
    target: Rate,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let mu = model.mu();

    let min_mu = mu.iter().copied().fold(Decimal::MAX, Decimal::min);
    let max_mu = mu.iter().copied().fold(Decimal::MIN, Decimal::max);
    if target < min_mu || target > max_mu {
        warnings.push(format!(
            "Target return {:.4} lies outside the asset return range [{:.4}, {:.4}]",
            target, min_mu, max_mu
        ));
    }
    for (name, w) in names.iter().zip(selected.weights.iter()) {
        if *w < Decimal::ZERO {
            warnings.push(format!("Short position: {} has weight {:.4}", name, w));
        }
    }
    let gross = selected.gross_exposure();
    if gross > dec!(1.5) {
        warnings.push(format!("High leverage: gross exposure {:.4}", gross));
    }
    if target < gmv.expected_return {
        warnings.push(format!(
            "Target return {:.4} is below the minimum-variance return {:.4}; the portfolio is inefficient",
            target, gmv.expected_return
        ));
    }
    warnings
}

fn assumptions(input: &FrontierInput, model: &MarketModel) -> serde_json::Value {
    let agg = model.aggregates();
    serde_json::json!({
        "n_assets": model.n(),
        "target_return": input.target_return.to_string(),
        "frontier_min_return": input.frontier_min_return.to_string(),
        "frontier_max_return": input.frontier_max_return.to_string(),
        "frontier_points": input.frontier_points,
        "short_selling": true,
        "aggregates": {
            "a": agg.a.to_string(),
            "b": agg.b.to_string(),
            "c": agg.c.to_string(),
            "d": agg.d.to_string(),
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
