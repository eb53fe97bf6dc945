use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use signalbot::api::{Credentials, RobinhoodClient, RobinhoodVenue};
use signalbot::config::AppConfig;
use signalbot::engine::{LoopSettings, RunReport, StrategyLoop, TradingSession};
use signalbot::execution::{Brokerage, MarketData, PaperBroker, SyntheticFeed};
use std::path::PathBuf;
use tokio::sync::watch;

#[derive(Parser)]
#[command(
    name = "signalbot",
    about = "Single-pair crypto trading bot driven by fused indicator signals"
)]
struct Cli {
    /// Path to a TOML/YAML/JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the strategy loop
    Run {
        /// Trading pair, e.g. XRP-USD
        #[arg(long)]
        symbol: Option<String>,

        /// Seconds between price polls
        #[arg(long)]
        interval: Option<u64>,

        /// Total run time in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Send real orders (disables simulation mode)
        #[arg(long, default_value_t = false)]
        live: bool,

        /// Use a seeded random-walk feed instead of live quotes (no credentials needed)
        #[arg(long, default_value_t = false, conflicts_with = "live")]
        synthetic: bool,

        /// Seed for the synthetic feed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Stop after this many processed ticks
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Show account status and buying power
    Account,
    /// Show the current best bid/ask
    Quote {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List tradable pairs
    Pairs {
        /// Symbols to look up (all pairs when empty)
        symbols: Vec<String>,
    },
    /// Show crypto holdings
    Holdings {
        /// Asset codes to look up, e.g. XRP (all holdings when empty)
        assets: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            symbol,
            interval,
            duration,
            live,
            synthetic,
            seed,
            max_ticks,
        } => {
            // CLI flags win over file and env settings
            if let Some(symbol) = symbol {
                config.run.symbol = symbol;
            }
            if let Some(interval) = interval {
                config.run.poll_interval_seconds = interval;
            }
            if let Some(duration) = duration {
                config.run.run_duration_seconds = duration;
            }
            if live {
                config.run.simulation_mode = false;
            }
            config.validate()?;

            run_strategy(&config, synthetic, seed, max_ticks).await
        }
        Commands::Account => {
            let client = create_client(&config)?;
            let account = client.account().await?;
            println!("Account:       {}", account.account_number);
            println!("Status:        {}", account.status);
            println!(
                "Buying power:  {:.2} {}",
                account.buying_power, account.buying_power_currency
            );
            Ok(())
        }
        Commands::Quote { symbol } => {
            let symbol = symbol.unwrap_or_else(|| config.run.symbol.clone());
            let client = create_client(&config)?;
            let quote = client.best_bid_ask(&symbol).await?;
            println!("{}", quote.symbol);
            println!("  Bid:  {}", fmt_price(quote.bid_inclusive_of_sell_spread));
            println!("  Ask:  {}", fmt_price(quote.ask_inclusive_of_buy_spread));
            println!("  Mid:  {}", fmt_price(quote.mid_price()));
            Ok(())
        }
        Commands::Pairs { symbols } => {
            let client = create_client(&config)?;
            let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
            for pair in client.trading_pairs(&symbols).await? {
                println!(
                    "{:<12} {:<10} min {} step {}",
                    pair.symbol,
                    pair.status,
                    fmt_price(pair.min_order_size),
                    fmt_price(pair.asset_increment)
                );
            }
            Ok(())
        }
        Commands::Holdings { assets } => {
            let client = create_client(&config)?;
            let assets: Vec<&str> = assets.iter().map(String::as_str).collect();
            let holdings = client.holdings(&assets).await?;
            if holdings.is_empty() {
                println!("No holdings");
            }
            for holding in holdings {
                println!(
                    "{:<8} total {:.8}  available {:.8}",
                    holding.asset_code, holding.total_quantity, holding.quantity_available_for_trading
                );
            }
            Ok(())
        }
    }
}

// ============================================================================
// Run Command
// ============================================================================

async fn run_strategy(config: &AppConfig, synthetic: bool, seed: u64, max_ticks: Option<u64>) -> Result<()> {
    let run = &config.run;

    tracing::info!("🚀 SignalBot starting");
    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Symbol: {}", run.symbol);
    tracing::info!("  Poll Interval: {}s", run.poll_interval_seconds);
    tracing::info!("  Duration: {}s", run.run_duration_seconds);
    tracing::info!(
        "  Mode: {}",
        match (synthetic, run.simulation_mode) {
            (true, _) => "synthetic feed + paper broker",
            (false, true) => "live quotes + paper broker",
            (false, false) => "LIVE TRADING",
        }
    );
    tracing::info!(
        "  Stop Loss: {:.2}% | Take Profit: {:.2}% | Max Size: {}",
        config.risk.stop_loss_pct * 100.0,
        config.risk.profit_target_pct * 100.0,
        config.risk.max_position_size
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut settings = LoopSettings::from(run);
    settings.max_ticks = max_ticks;
    let session = TradingSession::new(config);

    let report = if synthetic {
        let feed = SyntheticFeed::new(seed, 100.0, 0.01);
        drive(session, feed, PaperBroker::new(run.paper_funds), settings, shutdown_rx).await
    } else {
        let client = create_client(config)?;
        let venue = RobinhoodVenue::new(client, run.symbol.clone());
        if run.simulation_mode {
            let broker = PaperBroker::new(run.paper_funds);
            drive(session, venue, broker, settings, shutdown_rx).await
        } else {
            tracing::warn!("⚠️  Live trading enabled, orders will be sent to Robinhood");
            drive(session, venue.clone(), venue, settings, shutdown_rx).await
        }
    };

    log_run_report(&report);
    report.summary.print_report();

    tracing::info!("👋 SignalBot stopped");
    Ok(())
}

async fn drive<M: MarketData, B: Brokerage>(
    session: TradingSession,
    market: M,
    broker: B,
    settings: LoopSettings,
    shutdown: watch::Receiver<bool>,
) -> RunReport {
    StrategyLoop::new(session, market, broker, settings, shutdown)
        .run()
        .await
}

// ============================================================================
// Helper Functions
// ============================================================================

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signalbot=info".into()),
        )
        .init();
}

fn create_client(config: &AppConfig) -> Result<RobinhoodClient> {
    let credentials = Credentials::from_env()
        .context("Robinhood credentials required (set API_KEY and BASE64_PRIVATE_KEY)")?;
    if credentials.api_key.trim().is_empty() {
        bail!("API_KEY is empty");
    }
    RobinhoodClient::new(&config.api, &credentials)
}

fn fmt_price(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.6}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn log_run_report(report: &RunReport) {
    tracing::info!("\n📊 Run Summary:");
    tracing::info!("  Stopped: {} after {:.0?}", report.stop_reason, report.elapsed);
    tracing::info!(
        "  Ticks: {} processed, {} rejected, {} feed errors",
        report.ticks_processed,
        report.ticks_rejected,
        report.feed_errors
    );
    tracing::info!(
        "  Orders: {} submitted, {} failed, {} entries skipped by sizing",
        report.orders_submitted,
        report.orders_failed,
        report.sizing_failures
    );
    tracing::info!("  Final Position: {}", report.position.state());
    if let (Some(open), Some(price)) = (report.position.open(), report.last_price) {
        tracing::info!(
            "    Entry: ${:.4} | Current: ${:.4} | P&L: ${:.2}",
            open.entry_price,
            price,
            open.unrealized_pnl(price)
        );
    }
}
