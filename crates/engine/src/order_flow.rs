//! Historical order-flow loading for activation.
//!
//! Local history is preferred. When it is missing or starts after the first
//! candle, trades are paged backwards from the live provider in bounded
//! batches, and a single order-book snapshot is fetched if none is stored.
//! The trade window spans the closed candles only. Every collaborator failure
//! is logged and loading continues with what it has.

use crate::config::EngineConfig;
use crate::replay::OrderFlow;
use crate::sources::DataSources;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use taflow_core::*;
use tracing::{debug, info, warn};

pub(crate) async fn load_order_flow(
    sources: &DataSources,
    config: &EngineConfig,
    definition: &IndicatorDefinition,
    context: &ContextKey,
    candles: &[Candle],
) -> OrderFlow {
    let mut closed = candles.iter().filter(|c| c.closed);
    let Some(first) = closed.next() else {
        return OrderFlow::default();
    };
    let last = closed.last().unwrap_or(first);
    if !definition.preload_order_flow {
        return OrderFlow::default();
    }

    let mut trades = if definition.needs_trades() {
        load_trades(sources, config, context, first.open_time).await
    } else {
        Vec::new()
    };
    trades.retain(|t| t.timestamp >= first.open_time && t.timestamp < last.close_time);

    let order_books = if definition.needs_order_books() {
        load_order_books(sources, config, context).await
    } else {
        Vec::new()
    };

    debug!(
        context = %context,
        trades = trades.len(),
        order_books = order_books.len(),
        "order flow loaded"
    );
    OrderFlow::new(trades, order_books)
}

async fn load_trades(
    sources: &DataSources,
    config: &EngineConfig,
    context: &ContextKey,
    since: DateTime<Utc>,
) -> Vec<Trade> {
    let mut local = match &sources.trades {
        Some(history) => match history.trades(&context.provider, &context.symbol).await {
            Ok(trades) => trades,
            Err(e) => {
                warn!(context = %context, error = %e, "trade history unavailable");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    local.sort_by_key(|t| t.timestamp);

    let covered = local.first().is_some_and(|t| t.timestamp <= since);
    if covered {
        return local;
    }
    let Some(live) = sources.live_provider(&context.provider) else {
        return local;
    };

    let end = local.first().map(|t| t.timestamp);
    let fetched = fetch_trades_backwards(live.as_ref(), &context.symbol, since, end, config).await;
    if fetched.is_empty() {
        return local;
    }
    info!(context = %context, fetched = fetched.len(), "backfilled trades from live provider");

    if let Some(history) = &sources.trades {
        if let Err(e) = history.add_trades(&context.provider, &context.symbol, fetched.clone()).await {
            warn!(context = %context, error = %e, "failed to store backfilled trades");
        }
    }
    merge_trades(local, fetched)
}

/// Page backwards from `end` until a batch reaches `since`, comes back short,
/// or `max_trade_batches` is exhausted.
async fn fetch_trades_backwards(
    live: &dyn LiveDataProvider,
    symbol: &str,
    since: DateTime<Utc>,
    mut end: Option<DateTime<Utc>>,
    config: &EngineConfig,
) -> Vec<Trade> {
    let mut out = Vec::new();
    for batch in 0..config.max_trade_batches {
        let mut trades = match live.historical_aggregate_trades(symbol, end, config.trade_batch_limit).await {
            Ok(trades) => trades,
            Err(e) => {
                warn!(provider = live.name(), symbol, batch, error = %e, "trade backfill failed");
                break;
            }
        };
        trades.sort_by_key(|t| t.timestamp);
        let Some(earliest) = trades.first().map(|t| t.timestamp) else {
            break;
        };
        let exhausted = trades.len() < config.trade_batch_limit;
        out.extend(trades);
        if earliest <= since || exhausted {
            break;
        }
        end = Some(earliest);
    }
    out
}

/// Union by trade id, sorted by timestamp.
fn merge_trades(local: Vec<Trade>, fetched: Vec<Trade>) -> Vec<Trade> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Trade> = local
        .into_iter()
        .chain(fetched)
        .filter(|t| seen.insert(t.trade_id))
        .collect();
    merged.sort_by_key(|t| t.timestamp);
    merged
}

async fn load_order_books(sources: &DataSources, config: &EngineConfig, context: &ContextKey) -> Vec<OrderBookSnapshot> {
    let mut books = match &sources.order_books {
        Some(history) => match history.order_books(&context.provider, &context.symbol).await {
            Ok(books) => books,
            Err(e) => {
                warn!(context = %context, error = %e, "order-book history unavailable");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    if !books.is_empty() {
        return books;
    }
    let Some(live) = sources.live_provider(&context.provider) else {
        return books;
    };
    match live.order_book_snapshot(&context.symbol, config.order_book_depth).await {
        Ok(snapshot) => {
            if let Some(history) = &sources.order_books {
                if let Err(e) = history.add_order_book(&context.provider, &context.symbol, snapshot.clone()).await {
                    warn!(context = %context, error = %e, "failed to store order-book snapshot");
                }
            }
            books.push(snapshot);
        }
        Err(e) => warn!(context = %context, error = %e, "order-book snapshot failed"),
    }
    books
}
