use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use markowitz_core::analysis::{self, FrontierInput};

use crate::input;

/// Where the market description comes from
#[derive(Args)]
pub struct MarketArgs {
    /// Path to a JSON file with expected_returns and covariance_matrix
    #[arg(long)]
    pub input: Option<String>,

    /// Use the built-in three-asset reference market
    #[arg(long, conflicts_with = "input")]
    pub sample: bool,
}

/// Arguments for a single target-return solve
#[derive(Args)]
pub struct SolveArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Target expected return as a decimal (0.12 = 12%)
    #[arg(long, allow_hyphen_values = true)]
    pub target: Option<Decimal>,
}

/// Arguments for an efficient frontier sweep
#[derive(Args)]
pub struct FrontierArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Lowest target return of the sweep
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<Decimal>,

    /// Highest target return of the sweep
    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<Decimal>,

    /// Number of evenly spaced samples (at least 2)
    #[arg(long)]
    pub points: Option<usize>,
}

#[derive(Args)]
pub struct MinVarianceArgs {
    #[command(flatten)]
    pub market: MarketArgs,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Override the input's target return
    #[arg(long, allow_hyphen_values = true)]
    pub target: Option<Decimal>,
}

pub fn run_solve(args: SolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut fi = load_market(&args.market)?;
    if let Some(target) = args.target {
        fi.target_return = target;
    }
    info!(target_return = %fi.target_return, "solving target-return portfolio");
    let result = analysis::optimize_target(&fi)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_frontier(args: FrontierArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut fi = load_market(&args.market)?;
    if let Some(min) = args.min {
        fi.frontier_min_return = min;
    }
    if let Some(max) = args.max {
        fi.frontier_max_return = max;
    }
    if let Some(points) = args.points {
        fi.frontier_points = points;
    }
    info!(
        min = %fi.frontier_min_return,
        max = %fi.frontier_max_return,
        points = fi.frontier_points,
        "tracing efficient frontier"
    );
    let result = analysis::trace_frontier(&fi)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_min_variance(args: MinVarianceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let fi = load_market(&args.market)?;
    let result = analysis::global_minimum_variance(&fi)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut fi = load_market(&args.market)?;
    if let Some(target) = args.target {
        fi.target_return = target;
    }
    let result = analysis::analyze_frontier(&fi)?;
    Ok(serde_json::to_value(result)?)
}

fn load_market(args: &MarketArgs) -> Result<FrontierInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        let (canonical, contents) = input::file::read_text(path)?;
        Ok(FrontierInput::from_json(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?)
    } else if args.sample {
        Ok(FrontierInput::sample())
    } else if let Some(contents) = input::stdin::read_stdin()? {
        Ok(FrontierInput::from_json(&contents)
            .map_err(|e| format!("Failed to parse stdin: {}", e))?)
    } else {
        Err("--input <file.json>, --sample, or JSON on stdin required".into())
    }
}
