mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use tracing::Level;

use commands::frontier::{AnalyzeArgs, FrontierArgs, MinVarianceArgs, SolveArgs};
use output::OutputFormat;

/// Closed-form Markowitz portfolio optimization
#[derive(Parser)]
#[command(
    name = "mvo",
    version,
    about = "Closed-form Markowitz portfolio optimization",
    long_about = "A CLI for mean-variance portfolio optimization with decimal precision. \
                  Solves the minimum-variance portfolio for a target return, the global \
                  minimum-variance portfolio, and efficient frontier sweeps. Short positions \
                  are allowed; no inequality constraints are imposed."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log verbosity (written to stderr)
    #[arg(long, default_value = "warn", global = true)]
    log_level: Level,
}

#[derive(Subcommand)]
enum Commands {
    /// Minimum-variance portfolio for a target return
    Solve(SolveArgs),
    /// Sweep the efficient frontier over a return range
    Frontier(FrontierArgs),
    /// Global minimum-variance portfolio
    MinVariance(MinVarianceArgs),
    /// Selected portfolio, minimum-variance portfolio and frontier in one report
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Solve(args) => commands::frontier::run_solve(args),
        Commands::Frontier(args) => commands::frontier::run_frontier(args),
        Commands::MinVariance(args) => commands::frontier::run_min_variance(args),
        Commands::Analyze(args) => commands::frontier::run_analyze(args),
        Commands::Version => {
            println!("mvo {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
