use anyhow::Context;
use clap::{Parser, Subcommand};
use solsniper::api::{DexScreenerClient, MarketDataProvider, PumpPortalClient, SolanaRpcClient, TradeVenue, WalletBalance};
use solsniper::config::Settings;
use solsniper::console::{spawn_stdin_reader, Console};
use solsniper::discovery::MarketScanner;
use solsniper::execution::{PaperBroker, PositionBook, PumpPortalVenue, TradeExecutor};
use solsniper::monitor::MonitorLoop;
use solsniper::sniper::{SnipeOutcome, Sniper};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant};

const DEFAULT_LOG_FILTER: &str = "solsniper=info";

#[derive(Parser)]
#[command(name = "solsniper", about = "Solana launch sniper with take-profit / stop-loss exits")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor loop + operator console (+ auto-snipe when configured)
    Run,
    /// Print current candidates once and exit
    Scan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let settings = Settings::load().context("invalid configuration")?;

    let dexscreener = DexScreenerClient::new()
        .and_then(|client| client.with_request_timeout(settings.request_timeout()))
        .context("failed to build DexScreener client")?
        .with_listing_filter(settings.search_query.clone(), settings.dex_ids.clone());
    let provider: Arc<dyn MarketDataProvider> = Arc::new(dexscreener);
    let scanner = MarketScanner::new(provider.clone(), settings.min_volume);

    match cli.command.unwrap_or(Command::Run) {
        Command::Scan => {
            scan_once(&scanner).await;
            Ok(())
        }
        Command::Run => run(settings, provider, scanner).await,
    }
}

// ============================================================================
// Initialization Functions
// ============================================================================

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_executor(settings: &Settings, provider: Arc<dyn MarketDataProvider>) -> anyhow::Result<TradeExecutor> {
    if settings.dry_run {
        tracing::info!("📝 Dry run: paper broker with {:.4} SOL", settings.paper_balance_sol);
        let broker = Arc::new(PaperBroker::new(provider, settings.paper_balance_sol));
        return Ok(TradeExecutor::new(broker.clone(), broker));
    }

    // Settings::validate already rejected live mode without these
    let wallet = settings
        .wallet_pubkey
        .clone()
        .context("wallet_pubkey is required in live mode")?;
    let api_key = settings
        .pumpportal_api_key
        .clone()
        .context("pumpportal_api_key is required in live mode")?;

    tracing::warn!("💸 LIVE trading enabled for wallet {}", wallet);
    let rpc = SolanaRpcClient::new(settings.rpc_url.clone(), wallet)
        .and_then(|client| client.with_request_timeout(settings.request_timeout()))
        .context("failed to build RPC client")?;
    let portal = PumpPortalClient::new(api_key)
        .and_then(|client| client.with_request_timeout(settings.request_timeout()))
        .context("failed to build PumpPortal client")?
        .with_execution_params(settings.slippage_pct, settings.priority_fee_sol);

    let venue: Arc<dyn TradeVenue> = Arc::new(PumpPortalVenue::new(
        portal,
        rpc.clone(),
        provider,
        settings.confirmation_poller(),
    ));
    let wallet: Arc<dyn WalletBalance> = Arc::new(rpc);

    Ok(TradeExecutor::new(venue, wallet))
}

// ============================================================================
// Commands
// ============================================================================

async fn scan_once(scanner: &MarketScanner) {
    let candidates = scanner.discover_candidates().await;
    if candidates.is_empty() {
        println!("no data available");
        return;
    }
    for token in candidates {
        println!(
            "{:<12} {} | 24h volume ${:.0}",
            token.symbol.as_deref().unwrap_or("?"),
            token.address,
            token.volume
        );
    }
}

async fn run(
    settings: Settings,
    provider: Arc<dyn MarketDataProvider>,
    scanner: MarketScanner,
) -> anyhow::Result<()> {
    tracing::info!("🚀 Solana sniper starting");

    let executor = build_executor(&settings, provider.clone())?;
    let book = PositionBook::new();
    let sniper = Sniper::new(scanner, executor.clone(), book.clone(), settings.buy_amount_sol);

    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Venue: {}", executor.venue_name());
    tracing::info!("  Buy Amount: {} SOL", settings.buy_amount_sol);
    tracing::info!("  Min Volume: ${:.0}", settings.min_volume);
    tracing::info!("  Take Profit: +{}%", settings.take_profit_pct);
    tracing::info!("  Stop Loss: -{}%", settings.stop_loss_pct);
    tracing::info!("  Monitor Interval: {}s", settings.monitor_interval_secs);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Loop 1: Exit monitor
    let monitor_task = {
        let monitor = MonitorLoop::new(book.clone(), executor.clone(), provider.clone(), settings.monitor_config());
        tokio::spawn(monitor.run(shutdown_rx.clone()))
    };

    // Loop 2: Auto-snipe (optional)
    let snipe_task = settings.auto_snipe_interval().map(|every| {
        let sniper = sniper.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(auto_snipe_loop(sniper, every, shutdown))
    });

    // Operator console; stdin is read on its own thread so shutdown never waits on it
    let console_task = {
        let lines = spawn_stdin_reader();
        let console = Console::new(sniper);
        tokio::spawn(async move { console.run(lines).await })
    };

    tracing::info!("✅ All loops spawned successfully");
    tracing::info!("\nType `help` for commands, Ctrl+C to stop...\n");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
        }
        result = wait_for_quit(console_task) => {
            if let Err(e) = result {
                tracing::error!("Console task failed: {}", e);
            }
            tracing::info!("⚠️  Quit requested, shutting down...");
        }
    }

    // Let any in-flight monitor cycle finish its sells
    shutdown_tx.send(true).ok();
    if let Err(e) = monitor_task.await {
        tracing::error!("Monitor loop exited abnormally: {}", e);
    }
    if let Some(task) = snipe_task {
        task.await.ok();
    }

    let open = book.snapshot();
    if !open.is_empty() {
        tracing::warn!("{} positions still open at shutdown:", open.len());
        for position in &open {
            tracing::warn!("    {} @ {:.10} SOL", position.label(), position.entry_price);
        }
    }

    tracing::info!("👋 Solana sniper stopped");
    // The stdin thread may still be parked in a read; don't wait for it
    std::process::exit(0)
}

/// Resolves once the operator types `quit`; end of stdin keeps the bot running
async fn wait_for_quit(console_task: tokio::task::JoinHandle<bool>) -> Result<(), tokio::task::JoinError> {
    if console_task.await? {
        return Ok(());
    }
    tracing::info!("Console input closed; running until Ctrl+C");
    std::future::pending().await
}

/// Loop 2: periodic snipe
async fn auto_snipe_loop(sniper: Sniper, every: Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("🎯 Auto-snipe Loop starting (every {:?})", every);

    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let results = sniper.snipe().await;
        let bought = results
            .iter()
            .filter(|r| matches!(r.outcome, SnipeOutcome::Bought(_)))
            .count();
        if bought > 0 {
            tracing::info!("🎯 [AUTO] Opened {} new positions", bought);
        }
    }

    tracing::info!("🎯 Auto-snipe Loop stopped");
}
