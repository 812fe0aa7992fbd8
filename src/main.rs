use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use concession_radar::analysis::{
    AnalysisService, AnalysisTransport, ClientError, HttpTransport, InProcessTransport,
};
use concession_radar::config::{self, RadarConfig};
use concession_radar::model::{AnalysisResult, AnalyzeRequest, Filters, RawEvent};

#[derive(Parser)]
#[command(
    name = "concession-radar",
    about = "Delivery-exception pattern and trend detection",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP analysis service
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Analyze a batch of events from a JSON file
    Analyze {
        /// JSON file: an array of events, or an `{events, filters}` body
        #[arg(long)]
        input: PathBuf,

        /// Only consider this depot
        #[arg(long)]
        depot: Option<String>,

        /// Only consider this driver
        #[arg(long)]
        driver: Option<String>,

        /// Send the batch to a running service instead of analyzing locally
        #[arg(long)]
        remote: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Report weekday / hour-of-day concentrations of exceptions
    TimePatterns {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

/// Accepted input file shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    Bare(Vec<RawEvent>),
    Body(AnalyzeRequest),
}

fn read_input(path: &Path) -> Result<(Vec<RawEvent>, Filters)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let input: InputFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(match input {
        InputFile::Bare(events) => (events, Filters::default()),
        InputFile::Body(req) => (
            req.events.unwrap_or_default(),
            req.filters.unwrap_or_default(),
        ),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = tracing::subscriber::with_default(config::bootstrap_subscriber(), || {
        RadarConfig::resolve(cli.config.as_deref())
    })?;
    config.logging.init();

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting concession-radar service");
            concession_radar::serve(config).await?;
        }
        Commands::Analyze {
            input,
            depot,
            driver,
            remote,
            json,
        } => {
            let (events, mut filters) = read_input(&input)?;
            if depot.is_some() {
                filters.depot_id = depot;
            }
            if driver.is_some() {
                filters.driver_id = driver;
            }
            tracing::info!(events = events.len(), ?filters, ?remote, "Running analysis");

            let request = AnalyzeRequest::new(events, filters);
            let outcome = match remote {
                Some(url) => HttpTransport::new(&url)?.analyze(&request).await,
                None => {
                    InProcessTransport::new(AnalysisService::new(config.detection.clone()))
                        .analyze(&request)
                        .await
                }
            };
            let result = match outcome {
                Ok(result) => result,
                Err(ClientError::EmptyBatch) => {
                    eprintln!("No events provided.");
                    AnalysisResult::default()
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_report(&result);
            }
        }
        Commands::TimePatterns { input, json } => {
            let (events, filters) = read_input(&input)?;
            let service = AnalysisService::new(config.detection.clone());
            let patterns = service.time_patterns(&events, &filters);

            if json {
                println!("{}", serde_json::to_string_pretty(&patterns)?);
            } else if patterns.is_empty() {
                println!("No time patterns found.");
            } else {
                for p in &patterns {
                    println!(" - {} ({:.0}% confidence)", p.description, p.confidence * 100.0);
                }
            }
        }
    }

    Ok(())
}

fn print_report(result: &AnalysisResult) {
    println!("\n=== Patterns ===");
    if result.patterns.is_empty() {
        println!("No patterns found.");
    } else {
        println!("{:<24} | {:<8} | {:<10} | Description", "Finding", "Severity", "Confidence");
        println!("{:-<24}-|-{:-<8}-|-{:-<10}-|-{:-<40}", "", "", "", "");
        for p in &result.patterns {
            println!(
                "{:<24} | {:<8} | {:<10.2} | {}",
                p.id, p.severity, p.confidence, p.description
            );
        }
    }

    println!("\n=== Trends ===");
    if result.trends.is_empty() {
        println!("No trends.");
    } else {
        println!("{:<16} | {:<10} | {:>8} | Significance", "Driver", "Direction", "Change");
        println!("{:-<16}-|-{:-<10}-|-{:->8}-|-{:-<12}", "", "", "", "");
        for t in &result.trends {
            println!(
                "{:<16} | {:<10} | {:>7.2}pp | {:.2}",
                t.driver_id, t.direction, t.change, t.significance
            );
        }
    }
    println!();
}
