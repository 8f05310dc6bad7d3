use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use taflow_core::*;
use taflow_data::{load_candles_from_csv, load_trades_from_csv, MemoryMarketStore};
use taflow_engine::{DataSources, EngineConfig, InstanceManager};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "taflow")]
#[command(about = "Technical-indicator engine: list indicators and replay them over CSV market data")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Engine configuration (TOML)
    #[arg(short, long, env = "TAFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered indicators and their parameter schemas
    Indicators,

    /// Activate an indicator over candles from a CSV file and print its results
    Replay {
        /// Candle CSV (timestamp, open, high, low, close, volume)
        #[arg(short, long)]
        data: PathBuf,

        /// Trade CSV, required by order-flow indicators
        #[arg(long)]
        trades: Option<PathBuf>,

        /// Indicator id (e.g. "sma", "rsi", "big_trades")
        #[arg(short, long)]
        indicator: String,

        /// Parameter override as name=value; repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,

        #[arg(long, default_value = "csv")]
        provider: String,

        #[arg(short, long, default_value = "UNKNOWN")]
        symbol: String,

        /// Candle interval of the data file (e.g. "1m", "1h")
        #[arg(long, default_value = "1m")]
        interval: String,

        /// Feed the final N candles through the live update path instead of the backfill
        #[arg(long, default_value = "0")]
        live: usize,

        /// Print only the most recent N results
        #[arg(long)]
        last: Option<usize>,
    },
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    Ok((name.trim().to_string(), ParamValue::parse(value)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Indicators => {
            let registry = taflow_studies::default_registry();
            println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
        }
        Commands::Replay {
            data,
            trades,
            indicator,
            params,
            provider,
            symbol,
            interval,
            live,
            last,
        } => {
            let context = ContextKey::new(provider, symbol, interval);
            let params: Params = params.into_iter().collect();
            run_replay(config, &context, &indicator, params, data, trades, live, last).await?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_replay(
    config: EngineConfig,
    context: &ContextKey,
    indicator_id: &str,
    params: Params,
    data: PathBuf,
    trades: Option<PathBuf>,
    live: usize,
    last: Option<usize>,
) -> Result<()> {
    let candles = load_candles_from_csv(&data, &context.interval)?;
    if candles.is_empty() {
        bail!("no candles loaded from {}", data.display());
    }
    let trades = match &trades {
        Some(path) => load_trades_from_csv(path)?,
        None => Vec::new(),
    };
    tracing::info!(
        context = %context,
        candles = candles.len(),
        trades = trades.len(),
        "loaded market data"
    );

    let split = candles.len().saturating_sub(live);
    let (backfill, streamed) = candles.split_at(split);

    let store = Arc::new(MemoryMarketStore::new());
    store
        .add_candles(&context.provider, &context.symbol, &context.interval, backfill.to_vec())
        .await;
    let stored = store
        .candle_count(&context.provider, &context.symbol, &context.interval)
        .await;
    tracing::debug!(stored, "backfill candles stored");
    store.add_trades(&context.provider, &context.symbol, trades.clone()).await?;

    let config = EngineConfig {
        warmup_lookback: config.warmup_lookback.max(backfill.len()),
        history_capacity: config.history_capacity.max(candles.len()),
        ..config
    };
    let sources = DataSources::new(store.clone()).with_trades(store.clone()).with_order_books(store);
    let manager = InstanceManager::new(Arc::new(taflow_studies::default_registry()), sources, config);

    let key = manager.activate(indicator_id, context, &params).await?;
    tracing::info!(key = %key, "indicator activated");

    for candle in streamed {
        for trade in trades.iter().filter(|t| candle.contains(t.timestamp)) {
            manager.dispatch(context, &MarketEvent::Trade(trade.clone()))?;
        }
        manager.dispatch(context, &MarketEvent::from(candle.clone()))?;
    }
    if !streamed.is_empty() {
        tracing::info!(candles = streamed.len(), "streamed live candles");
    }

    let history = manager
        .history(&key, last)
        .with_context(|| format!("instance {} disappeared", key))?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
