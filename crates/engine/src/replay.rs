//! Time alignment of order flow to candles, shared by activation and parameter updates.
//!
//! For every candle after the warm-up prefix the replay dispatches, in order:
//! the trades with `open_time <= ts < close_time`, the order-book snapshot
//! nearest to `open_time`, and finally the candle itself. Live feeds deliver
//! events in the same order, which is what keeps backfilled and streamed
//! results identical.

use crate::instance::IndicatorInstance;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taflow_core::*;
use tracing::{debug, warn};

/// Historical trades and order books for one context, each sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct OrderFlow {
    pub trades: Vec<Trade>,
    pub order_books: Vec<OrderBookSnapshot>,
}

impl OrderFlow {
    pub fn new(mut trades: Vec<Trade>, mut order_books: Vec<OrderBookSnapshot>) -> Self {
        trades.sort_by_key(|t| t.timestamp);
        order_books.sort_by_key(|b| b.timestamp);
        Self { trades, order_books }
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.order_books.is_empty()
    }
}

/// Trades inside the candle's `[open_time, close_time)` window.
pub fn trades_in<'a>(trades: &'a [Trade], candle: &Candle) -> &'a [Trade] {
    let start = trades.partition_point(|t| t.timestamp < candle.open_time);
    let end = trades.partition_point(|t| t.timestamp < candle.close_time);
    &trades[start..end.max(start)]
}

/// Snapshot with the smallest absolute distance to `at`; the earlier one wins ties.
pub fn nearest_order_book(books: &[OrderBookSnapshot], at: DateTime<Utc>) -> Option<&OrderBookSnapshot> {
    let idx = books.partition_point(|b| b.timestamp < at);
    let after = books.get(idx);
    let before = idx.checked_sub(1).and_then(|i| books.get(i));
    match (before, after) {
        (Some(b), Some(a)) => {
            if (a.timestamp - at) < (at - b.timestamp) {
                Some(a)
            } else {
                Some(b)
            }
        }
        (b, a) => b.or(a),
    }
}

/// Feed `candles` through `instance`, interleaving matching order flow before each candle.
///
/// Returns the number of candle results recorded.
pub fn replay(instance: &mut IndicatorInstance, candles: &[Candle], flow: &OrderFlow) -> Result<usize, IndicatorError> {
    let kinds = instance.indicator().required_data_types();
    let wants_trades = kinds.iter().any(DataKind::is_trade);
    let wants_books = kinds.contains(&DataKind::OrderBook);

    let mut recorded = 0;
    for candle in candles {
        if wants_trades {
            for trade in trades_in(&flow.trades, candle) {
                instance.apply_trade(trade)?;
            }
        }
        if wants_books {
            if let Some(book) = nearest_order_book(&flow.order_books, candle.open_time) {
                instance.apply_order_book(book)?;
            }
        }
        if instance.apply_candle(candle)?.is_some() {
            recorded += 1;
        }
    }
    Ok(recorded)
}

/// Warm up on the first `min_required_candles` closed candles and replay the rest.
///
/// Candles that are still forming are left out of both phases; the live feed
/// delivers their final close later. With fewer candles than the warm-up
/// length the instance is initialized on whatever is available and nothing is
/// replayed.
pub fn build_instance(
    key: String,
    indicator: Arc<dyn Indicator>,
    context: ContextKey,
    params: Params,
    candles: &[Candle],
    flow: &OrderFlow,
    history_capacity: usize,
) -> Result<IndicatorInstance, IndicatorError> {
    let closed_only: Vec<Candle>;
    let candles = if candles.iter().all(|c| c.closed) {
        candles
    } else {
        closed_only = candles.iter().filter(|c| c.closed).cloned().collect();
        debug!(
            key = %key,
            forming = candles.len() - closed_only.len(),
            "excluding forming candles from backfill"
        );
        &closed_only
    };

    let min = indicator.min_required_candles(&params);
    if candles.len() < min {
        warn!(
            key = %key,
            required = min,
            available = candles.len(),
            "warming up with partial history"
        );
    }
    let (warmup, rest) = candles.split_at(min.min(candles.len()));
    let mut instance = IndicatorInstance::initialize(key, indicator, context, params, warmup, history_capacity)?;
    replay(&mut instance, rest, flow)?;
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn candle(i: i64) -> Candle {
        Candle {
            open_time: t(i),
            close_time: t(i + 1),
            open: dec!(1),
            high: dec!(1),
            low: dec!(1),
            close: dec!(1),
            volume: Decimal::ZERO,
            closed: true,
        }
    }

    fn trade(id: u64, at: DateTime<Utc>) -> Trade {
        Trade {
            trade_id: id,
            timestamp: at,
            price: dec!(1),
            quantity: dec!(1),
            is_buyer_maker: false,
        }
    }

    fn book(id: u64, at: DateTime<Utc>) -> OrderBookSnapshot {
        OrderBookSnapshot {
            timestamp: at,
            last_update_id: id,
            bids: vec![],
            asks: vec![],
        }
    }

    #[test]
    fn test_trade_window_is_half_open() {
        let trades = vec![
            trade(1, t(0) - Duration::seconds(1)),
            trade(2, t(0)),
            trade(3, t(0) + Duration::seconds(59)),
            trade(4, t(1)),
        ];
        let ids: Vec<u64> = trades_in(&trades, &candle(0)).iter().map(|t| t.trade_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_nearest_book_prefers_earlier_on_tie() {
        let books = vec![book(1, t(0) - Duration::seconds(30)), book(2, t(0) + Duration::seconds(30))];
        assert_eq!(nearest_order_book(&books, t(0)).unwrap().last_update_id, 1);

        let books = vec![book(1, t(0) - Duration::seconds(40)), book(2, t(0) + Duration::seconds(10))];
        assert_eq!(nearest_order_book(&books, t(0)).unwrap().last_update_id, 2);

        assert_eq!(nearest_order_book(&books[..1], t(5)).unwrap().last_update_id, 1);
        assert!(nearest_order_book(&[], t(0)).is_none());
    }
}
