use async_trait::async_trait;
use std::collections::HashMap;
use taflow_core::*;
use tokio::sync::RwLock;

type SymbolKey = (String, String);
type SeriesKey = (String, String, String);

/// In-memory candle, trade and order-book history.
///
/// Sequences are kept sorted by time; candles and trades are de-duplicated
/// by open time and trade id respectively.
#[derive(Debug, Default)]
pub struct MemoryMarketStore {
    candles: RwLock<HashMap<SeriesKey, Vec<Candle>>>,
    trades: RwLock<HashMap<SymbolKey, Vec<Trade>>>,
    order_books: RwLock<HashMap<SymbolKey, Vec<OrderBookSnapshot>>>,
}

fn symbol_key(provider: &str, symbol: &str) -> SymbolKey {
    (provider.to_string(), symbol.to_string())
}

impl MemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge candles into a series. A candle with an existing open time replaces the stored one.
    pub async fn add_candles(&self, provider: &str, symbol: &str, interval: &str, candles: Vec<Candle>) {
        let key = (provider.to_string(), symbol.to_string(), interval.to_string());
        let mut all = self.candles.write().await;
        let series = all.entry(key).or_default();
        for candle in candles {
            match series.binary_search_by_key(&candle.open_time, |c| c.open_time) {
                Ok(idx) => series[idx] = candle,
                Err(idx) => series.insert(idx, candle),
            }
        }
    }

    pub async fn candle_count(&self, provider: &str, symbol: &str, interval: &str) -> usize {
        let key = (provider.to_string(), symbol.to_string(), interval.to_string());
        self.candles.read().await.get(&key).map_or(0, Vec::len)
    }
}

#[async_trait]
impl CandleHistory for MemoryMarketStore {
    async fn last_n_candles(
        &self,
        provider: &str,
        symbol: &str,
        interval: &str,
        n: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let key = (provider.to_string(), symbol.to_string(), interval.to_string());
        let all = self.candles.read().await;
        let Some(series) = all.get(&key) else {
            return Ok(Vec::new());
        };
        let start = series.len().saturating_sub(n);
        Ok(series[start..].to_vec())
    }
}

#[async_trait]
impl TradeHistory for MemoryMarketStore {
    async fn trades(&self, provider: &str, symbol: &str) -> Result<Vec<Trade>, DataError> {
        Ok(self
            .trades
            .read()
            .await
            .get(&symbol_key(provider, symbol))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_trades(&self, provider: &str, symbol: &str, trades: Vec<Trade>) -> Result<(), DataError> {
        let mut all = self.trades.write().await;
        let stored = all.entry(symbol_key(provider, symbol)).or_default();
        stored.extend(trades);
        stored.sort_by_key(|t| (t.timestamp, t.trade_id));
        stored.dedup_by_key(|t| t.trade_id);
        Ok(())
    }
}

#[async_trait]
impl OrderBookHistory for MemoryMarketStore {
    async fn order_books(&self, provider: &str, symbol: &str) -> Result<Vec<OrderBookSnapshot>, DataError> {
        Ok(self
            .order_books
            .read()
            .await
            .get(&symbol_key(provider, symbol))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_order_book(&self, provider: &str, symbol: &str, book: OrderBookSnapshot) -> Result<(), DataError> {
        let mut all = self.order_books.write().await;
        let stored = all.entry(symbol_key(provider, symbol)).or_default();
        let idx = stored.partition_point(|b| b.timestamp <= book.timestamp);
        stored.insert(idx, book);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn candle(i: i64, close: Decimal) -> Candle {
        Candle {
            open_time: t(i),
            close_time: t(i + 1),
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ONE,
            closed: true,
        }
    }

    fn trade(id: u64, minute: i64) -> Trade {
        Trade {
            trade_id: id,
            timestamp: t(minute),
            price: dec!(1),
            quantity: dec!(1),
            is_buyer_maker: false,
        }
    }

    #[tokio::test]
    async fn test_last_n_candles_sorted_and_deduplicated() {
        let store = MemoryMarketStore::new();
        store
            .add_candles("binance", "BTCUSDT", "1m", vec![candle(2, dec!(3)), candle(0, dec!(1)), candle(1, dec!(2))])
            .await;
        store.add_candles("binance", "BTCUSDT", "1m", vec![candle(1, dec!(20))]).await;

        let last = store.last_n_candles("binance", "BTCUSDT", "1m", 2).await.unwrap();
        assert_eq!(last.iter().map(|c| c.close).collect::<Vec<_>>(), vec![dec!(20), dec!(3)]);
        assert_eq!(store.candle_count("binance", "BTCUSDT", "1m").await, 3);
        assert!(store.last_n_candles("binance", "ETHUSDT", "1m", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trades_merge_by_id() {
        let store = MemoryMarketStore::new();
        store.add_trades("binance", "BTCUSDT", vec![trade(2, 2), trade(1, 1)]).await.unwrap();
        store.add_trades("binance", "BTCUSDT", vec![trade(2, 2), trade(3, 0)]).await.unwrap();
        let ids: Vec<u64> = store
            .trades("binance", "BTCUSDT")
            .await
            .unwrap()
            .iter()
            .map(|t| t.trade_id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
