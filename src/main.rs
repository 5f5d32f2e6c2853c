//! Base Token Sniper CLI
//!
//! `run` starts the service: control surface, discovery loop and exit monitor.
//! The other subcommands run a single pass or inspect state and exit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use token_sniper::api::{create_app, AppState};
use token_sniper::services::{log_report, EntrySettings};
use token_sniper::strategies::ScreeningPolicy;
use token_sniper::types::now_ms;
use token_sniper::{
    load_signer, Config, Database, Discovery, PositionMonitor, RpcChain, Scanner, TradeRouter,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "token-sniper")]
#[command(about = "Buys fresh Base tokens that pass screening and exits on take-profit / stop-loss")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: HTTP control surface, discovery loop and exit monitor
    Run,

    /// Run a single discovery pass and exit
    Scan,

    /// Run a single exit check over open positions and exit
    Monitor,

    /// Show open positions
    Positions,
}

/// Everything the loops and the control surface share
struct Services {
    db: Arc<Database>,
    discovery: Arc<Discovery>,
    monitor: Arc<PositionMonitor>,
}

impl Services {
    async fn build(config: &Config) -> Result<Self> {
        let db = Arc::new(
            Database::new(&config.database_path)
                .await
                .with_context(|| format!("Failed to open database {}", config.database_path))?,
        );

        let signer = load_signer(&config.private_key)?;
        info!("Trading wallet: {}", signer.address());

        let chain = Arc::new(RpcChain::new(&config.rpc_url, signer)?);
        let router = Arc::new(TradeRouter::new(chain)?);
        let market = Arc::new(Scanner::new(config.market_data.clone())?);

        let discovery = Arc::new(Discovery::new(
            db.clone(),
            market.clone(),
            router.clone(),
            ScreeningPolicy::new(config.screening.clone()),
            EntrySettings::from(config),
        ));
        let monitor = Arc::new(PositionMonitor::new(db.clone(), market, router));

        Ok(Self {
            db,
            discovery,
            monitor,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides the default filter
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,token_sniper={lvl},tower_http={lvl}",
            lvl = default_level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(&config).await?,
        Commands::Scan => scan_once(&config).await?,
        Commands::Monitor => monitor_once(&config).await?,
        Commands::Positions => show_positions(&config).await?,
    }

    Ok(())
}

async fn run_bot(config: &Config) -> Result<()> {
    println!("\n{}", "=".repeat(70));
    println!("  BASE TOKEN SNIPER");
    println!(
        "  Buy: {} USDC | TP: +{}% | SL: -{}% | Poll: {}s",
        config.buy_notional_usdc,
        config.take_profit_pct,
        config.stop_loss_pct,
        config.poll_interval_seconds
    );
    println!("{}\n", "=".repeat(70));

    let services = Services::build(config).await?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Control surface listening on http://{}", listener.local_addr()?);

    let discovery = services.discovery.clone();
    let period = config.poll_interval();
    tokio::spawn(async move {
        discovery.run(period).await;
    });

    let monitor = services.monitor.clone();
    tokio::spawn(async move {
        monitor.run().await;
    });

    let app = create_app(AppState::new(services.db, services.discovery));
    axum::serve(listener, app).await?;

    Ok(())
}

async fn scan_once(config: &Config) -> Result<()> {
    let services = Services::build(config).await?;

    match services.discovery.run_once().await {
        Ok(report) => log_report(&report),
        Err(e) => {
            error!("Discovery pass failed: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}

async fn monitor_once(config: &Config) -> Result<()> {
    let services = Services::build(config).await?;
    let report = services.monitor.check_positions().await?;

    info!(
        "Monitor pass: {} checked, {} held, {} unavailable, {} sold, {} cleared, {} failed",
        report.checked, report.held, report.unavailable, report.sold, report.cleared, report.failed
    );

    Ok(())
}

async fn show_positions(config: &Config) -> Result<()> {
    let db = Database::new(&config.database_path).await?;
    let positions = db.list_positions().await?;

    println!("\n{}", "=".repeat(70));
    println!("  OPEN POSITIONS ({})", positions.len());
    println!("{}\n", "=".repeat(70));

    if positions.is_empty() {
        println!("No open positions.\n");
        return Ok(());
    }

    let now = now_ms();
    for (i, pos) in positions.iter().enumerate() {
        let held_hours = (now - pos.bought_at_ms).max(0) / 3_600_000;
        println!("{}. {} ({})", i + 1, pos.symbol.bold(), pos.token);
        println!(
            "   Qty: {} | Entry: ${} | Held: {}h",
            pos.quantity, pos.entry_price_usd, held_hours
        );
        println!(
            "   {} | {}",
            format!("TP +{}%", pos.take_profit_pct).green(),
            format!("SL -{}%", pos.stop_loss_pct).red()
        );
    }

    println!();
    Ok(())
}
