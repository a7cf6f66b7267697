use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use cma_valuation::api::appraisal::RunAppraisalRequest;
use cma_valuation::api::{self, AppState};
use cma_valuation::config::AppConfig;
use cma_valuation::db::seed;
use cma_valuation::db::store::Store;
use cma_valuation::monitoring::health::HealthState;
use cma_valuation::monitoring::logger;
use cma_valuation::valuation::engine::ValuationEngine;

#[derive(Debug, Parser)]
#[command(name = "cma-valuation", version, about = "Comparative market appraisal service")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Replace database contents with the reference catalog and sample listings.
    Seed,
    /// Appraise one subject property and print the result as JSON.
    Appraise {
        #[arg(long)]
        sector: i64,
        #[arg(long)]
        area: Decimal,
        #[arg(long)]
        bedrooms: Option<i64>,
        #[arg(long)]
        bathrooms: Option<i64>,
        #[arg(long)]
        parking: Option<i64>,
        #[arg(long)]
        year_built: Option<i32>,
        #[arg(long)]
        floor: Option<i64>,
        #[arg(long)]
        kitchen: Option<i64>,
        #[arg(long)]
        bathroom: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    logger::init_logging(&config.monitoring)?;

    let store = Arc::new(open_store(&config).await?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store).await,
        Command::Seed => {
            let summary = seed::seed(&store).await?;
            println!(
                "Seeded {} sector, {} finishes, {} weights, {} properties",
                summary.sectors, summary.finishes, summary.weights, summary.properties
            );
            Ok(())
        }
        Command::Appraise {
            sector,
            area,
            bedrooms,
            bathrooms,
            parking,
            year_built,
            floor,
            kitchen,
            bathroom,
        } => {
            let subject = RunAppraisalRequest {
                sector_id: sector,
                area_m2: area,
                bedrooms,
                bathrooms,
                parking,
                year_built,
                finish_floor_id: floor,
                finish_kitchen_id: kitchen,
                finish_bathroom_id: bathroom,
            }
            .into_subject()?;

            let engine = ValuationEngine::new(store);
            let result = engine.appraise(&subject).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn open_store(config: &AppConfig) -> Result<Store> {
    if let Some(parent) = PathBuf::from(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
    }
    Store::new(&config.database.path).await
}

/// Run the HTTP API until ctrl-c.
async fn serve(config: AppConfig, store: Arc<Store>) -> Result<()> {
    let state = AppState::new(store, HealthState::new());
    let app = api::router(state).layer(api::cors_layer(&config.server.origins())?);

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        database = %config.database.url(),
        "CMA valuation API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}
