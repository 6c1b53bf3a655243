//! Command line entry point for the DEX trading engine.

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dex_trader_api::{ApiServer, AppState, ServerConfig};
use dex_trader_execution::engine::Engine;
use dex_trader_execution::ports::{MarketDataPort, ReportingPort};
use dex_trader_protocols::{
    CoinGeckoMarketData, HttpReporter, LogReporter, SimulatedSwapExecutor,
};
use dotenv::dotenv;
use settings::Settings;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dex-trader")]
#[command(about = "Automated DEX trading engine", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine headless until Ctrl+C
    Run,
    /// Serve the REST API; the engine is started and stopped through it
    Serve {
        /// Listen host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Listen port
        #[arg(long, env = "API_PORT", default_value_t = 8000)]
        port: u16,

        /// Start the engine immediately
        #[arg(long)]
        autostart: bool,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_engine(settings: &Settings) -> Result<Engine> {
    let config = settings.engine_config();
    let timeout = settings.http_timeout();

    let mut coingecko = CoinGeckoMarketData::new(settings.coingecko_api_url.as_str(), timeout)
        .context("failed to create market data client")?
        .with_cache_ttl(settings.market_cache_ttl());
    if !settings.tracked_symbols.is_empty() {
        coingecko = coingecko.with_symbols(
            settings
                .tracked_symbols
                .iter()
                .map(|(symbol, id)| (symbol.as_str(), id.as_str())),
        );
    }
    let market: Arc<dyn MarketDataPort> = Arc::new(coingecko);
    let execution = Arc::new(
        SimulatedSwapExecutor::new(market.clone(), config.quote_token.as_str())
            .with_slippage_bps(settings.sim_slippage_min_bps, settings.sim_slippage_max_bps),
    );
    let reporting: Arc<dyn ReportingPort> = match &settings.backend_api_url {
        Some(url) => Arc::new(
            HttpReporter::new(url.as_str(), timeout).context("failed to create backend reporter")?,
        ),
        None => {
            warn!("BACKEND_API_URL not set, reports go to the log only");
            Arc::new(LogReporter)
        }
    };

    let engine = Engine::builder(config)
        .market_data(market)
        .execution(execution)
        .reporting(reporting)
        .build()
        .context("invalid engine configuration")?;

    let config = engine.config();
    info!(
        capital = %config.capital_usdt,
        max_position_percent = %config.max_position_size_percent,
        max_trades = config.max_simultaneous_trades,
        "Settings loaded"
    );
    Ok(engine)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.json);

    let engine = build_engine(&cli.settings)?;

    match cli.command {
        Commands::Run => {
            engine.start().await.context("failed to start engine")?;
            info!("Press Ctrl+C to stop");
            shutdown_signal().await;
        }
        Commands::Serve {
            host,
            port,
            autostart,
        } => {
            if autostart {
                engine.start().await.context("failed to start engine")?;
            }
            let server = ApiServer::new(ServerConfig { host, port }, AppState::new(engine.clone()));
            server
                .run(shutdown_signal())
                .await
                .context("API server failed")?;
        }
    }

    engine.stop().await.context("failed to stop engine")?;
    info!("Trading engine shut down");
    Ok(())
}
