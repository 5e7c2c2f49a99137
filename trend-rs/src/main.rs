//! Command-line driver: estimate the trend of a CSV table with an ONNX model.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use trend_estimator::config::default_config_template;
use trend_estimator::{EstimatorConfig, HistoricalTable, TrendEstimator};

#[derive(Parser)]
#[command(name = "trend-estimator")]
#[command(about = "Estimate trend, confidence and seasonal factor from historical data")]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// ONNX model path (overrides the config)
    #[arg(long)]
    model: Option<PathBuf>,

    /// CSV file with a timestamp column and a `value` column
    #[arg(long)]
    data: Option<PathBuf>,

    /// Name of the timestamp column in the CSV
    #[arg(long, default_value = "timestamp")]
    timestamp_column: String,

    /// Comma-separated feature columns (default: all)
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,

    /// Only compute the seasonal factor; no model is loaded
    #[arg(long)]
    seasonality_only: bool,

    /// Print a default configuration file
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.generate_config {
        println!("{}", default_config_template());
        return;
    }

    if let Err(e) = run(&args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => EstimatorConfig::from_file(path)?,
        None => EstimatorConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model_path = Some(model.clone());
    }

    let data = args
        .data
        .as_ref()
        .context("No data file specified. Use --data <path>")?;
    let table = HistoricalTable::from_csv_path(data, &args.timestamp_column)?;
    log::info!("Loaded {} rows from {}", table.len(), data.display());

    if args.seasonality_only {
        let factor = trend_estimator::seasonality::extract_seasonality(&table, config.std_convention)?;
        println!("{}", serde_json::json!({ "seasonal_factor": factor }));
        return Ok(());
    }

    let estimator = TrendEstimator::from_config(&config)?;
    let result = estimator.predict_trend(&table, &args.features).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
