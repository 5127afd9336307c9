mod api;
mod cli;
mod config;
mod models;
mod services;
mod utils;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{clamp_last_n, AppConfig};
use crate::models::{AnalysisMode, League, SimulationMode};
use crate::services::estimators::Weights;
use crate::services::{build_provider, AnalysisOptions, ProbabilityAggregator, DEFAULT_BANKROLL};

#[derive(Parser)]
#[command(name = "matchday")]
#[command(about = "Football match probabilities from odds, form and head-to-head")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the fixtures of one or more leagues on a date
    Analyze {
        #[command(flatten)]
        analysis: AnalysisArgs,
        /// Also print form strings, head-to-head counts and component distributions
        #[arg(long)]
        details: bool,
        /// Write the fixture table to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Analyze fixtures, then simulate a flat stake on every pick
    Simulate {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long)]
        stake: f64,
        #[arg(long, default_value_t = DEFAULT_BANKROLL)]
        bankroll: f64,
        /// Draw one random outcome per bet instead of reporting expected value
        #[arg(long)]
        stochastic: bool,
    },
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// List supported leagues
    Leagues,
}

#[derive(Args)]
struct AnalysisArgs {
    #[arg(short, long = "league", value_enum, default_values_t = [League::Brasileirao])]
    leagues: Vec<League>,
    /// Match day, YYYY-MM-DD (defaults to today, UTC)
    #[arg(short, long)]
    date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = AnalysisMode::Odds)]
    mode: AnalysisMode,
    /// Leave head-to-head out (its weight then falls on a neutral prior)
    #[arg(long)]
    no_h2h: bool,
    #[arg(long)]
    last_n: Option<usize>,
    /// Blend weights as base,form,h2h (e.g. 0.6,0.3,0.1)
    #[arg(long)]
    weights: Option<String>,
}

impl AnalysisArgs {
    fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn options(&self, config: &AppConfig) -> AnalysisOptions {
        AnalysisOptions {
            mode: self.mode,
            include_h2h: !self.no_h2h,
            last_n: clamp_last_n(self.last_n.unwrap_or(config.last_n)),
        }
    }
}

fn parse_weights(raw: &str) -> Result<Weights> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --weights '{}'", raw))?;
    match parts.as_slice() {
        [base, form, h2h] => Ok(Weights::new(*base, *form, *h2h)?),
        _ => bail!("--weights expects three comma-separated numbers, got '{}'", raw),
    }
}

fn aggregator_for(config: &AppConfig, weights: Option<&str>) -> Result<ProbabilityAggregator> {
    let mut config = config.clone();
    if let Some(raw) = weights {
        config.weights = parse_weights(raw)?;
    }
    let provider = build_provider(&config)?;
    Ok(ProbabilityAggregator::from_config(provider, &config))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Analyze { analysis, details, export }) => {
            let aggregator = aggregator_for(&config, analysis.weights.as_deref())?;
            cli::analyze(
                &aggregator,
                &analysis.leagues,
                analysis.date(),
                &analysis.options(&config),
                details,
                export.as_deref(),
            )
            .await?;
        }
        Some(Commands::Simulate { analysis, stake, bankroll, stochastic }) => {
            let aggregator = aggregator_for(&config, analysis.weights.as_deref())?;
            let mode = if stochastic {
                SimulationMode::Stochastic
            } else {
                SimulationMode::Expected
            };
            cli::simulate(
                &aggregator,
                &analysis.leagues,
                analysis.date(),
                &analysis.options(&config),
                stake,
                bankroll,
                mode,
            )
            .await?;
        }
        Some(Commands::Serve { port }) => {
            serve(&config, port).await?;
        }
        Some(Commands::Leagues) => cli::show_leagues(),
        None => {
            // Default to serving
            serve(&config, 3000).await?;
        }
    }

    Ok(())
}

async fn serve(config: &AppConfig, port: u16) -> Result<()> {
    tracing::info!("Starting Matchday API server on port {}", port);
    let aggregator = aggregator_for(config, None)?;
    let defaults = AnalysisOptions {
        last_n: config.last_n,
        ..AnalysisOptions::default()
    };
    api::serve(port, api::AppState::new(aggregator, defaults)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_weights() {
        let w = parse_weights("6, 3, 1").unwrap();
        assert!((w.base() - 0.6).abs() < 1e-12);
        assert!(parse_weights("0.6,0.3").is_err());
        assert!(parse_weights("a,b,c").is_err());
        assert!(parse_weights("0,0,0").is_err());
    }

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::try_parse_from([
            "matchday", "analyze", "--league", "premier-league", "--league", "la-liga",
            "--date", "2024-05-04", "--mode", "model", "--no-h2h", "--last-n", "40",
        ])
        .unwrap();
        let Some(Commands::Analyze { analysis, .. }) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(analysis.leagues, vec![League::PremierLeague, League::LaLiga]);
        let options = analysis.options(&AppConfig::default());
        assert_eq!(options.mode, AnalysisMode::Model);
        assert!(!options.include_h2h);
        assert_eq!(options.last_n, 12);
    }

    #[test]
    fn test_league_defaults_to_brasileirao() {
        let cli = Cli::try_parse_from(["matchday", "simulate", "--stake", "10"]).unwrap();
        let Some(Commands::Simulate { analysis, bankroll, .. }) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(analysis.leagues, vec![League::Brasileirao]);
        assert_eq!(bankroll, 100.0);
    }
}
