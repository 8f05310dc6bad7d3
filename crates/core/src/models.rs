use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single OHLCV candle (kline).
///
/// `closed` distinguishes a finalized bar from the one still forming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub closed: bool,
}

impl Candle {
    /// Whether `timestamp` falls inside `[open_time, close_time)`.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.open_time && timestamp < self.close_time
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// A single executed trade (raw or aggregated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub quantity: Decimal,
    /// True when the buyer was the resting order, i.e. the aggressor sold.
    pub is_buyer_maker: bool,
}

impl Trade {
    pub fn is_aggressive_buy(&self) -> bool {
        !self.is_buyer_maker
    }
}

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// A full order-book snapshot.
///
/// Bids are ordered best (highest) first, asks best (lowest) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub timestamp: DateTime<Utc>,
    pub last_update_id: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Total bid and ask quantity over the top `depth` levels.
    pub fn depth_volumes(&self, depth: usize) -> (Decimal, Decimal) {
        let bid: Decimal = self.bids.iter().take(depth).map(|l| l.quantity).sum();
        let ask: Decimal = self.asks.iter().take(depth).map(|l| l.quantity).sum();
        (bid, ask)
    }
}

// ---------------------------------------------------------------------------
// Data kinds & context
// ---------------------------------------------------------------------------

/// Kinds of market data an indicator can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Candle,
    Trade,
    AggregateTrade,
    OrderBook,
}

impl DataKind {
    pub fn is_trade(&self) -> bool {
        matches!(self, DataKind::Trade | DataKind::AggregateTrade)
    }
}

/// Identity of one `(provider, symbol, interval)` market-data stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextKey {
    pub provider: String,
    pub symbol: String,
    pub interval: String,
}

impl ContextKey {
    pub fn new(
        provider: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            symbol: symbol.into(),
            interval: interval.into(),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.provider, self.symbol, self.interval)
    }
}

/// Parse an interval label such as `1m`, `15m`, `4h`, `1d`, `1w` into a duration.
pub fn interval_duration(interval: &str) -> Option<Duration> {
    let interval = interval.trim();
    let split = interval.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = interval.split_at(split);
    let count: i64 = count.parse().ok().filter(|c| *c > 0)?;
    match unit {
        "s" => Some(Duration::seconds(count)),
        "m" => Some(Duration::minutes(count)),
        "h" => Some(Duration::hours(count)),
        "d" => Some(Duration::days(count)),
        "w" => Some(Duration::weeks(count)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_interval_duration() {
        assert_eq!(interval_duration("1m"), Some(Duration::minutes(1)));
        assert_eq!(interval_duration("4h"), Some(Duration::hours(4)));
        assert_eq!(interval_duration("1w"), Some(Duration::weeks(1)));
        assert_eq!(interval_duration("0m"), None);
        assert_eq!(interval_duration("m"), None);
        assert_eq!(interval_duration("3x"), None);
    }

    #[test]
    fn test_candle_window_is_half_open() {
        let open = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candle = Candle {
            open_time: open,
            close_time: open + Duration::minutes(1),
            open: dec!(1),
            high: dec!(1),
            low: dec!(1),
            close: dec!(1),
            volume: dec!(1),
            closed: true,
        };
        assert!(candle.contains(open));
        assert!(candle.contains(open + Duration::seconds(59)));
        assert!(!candle.contains(open + Duration::minutes(1)));
    }

    #[test]
    fn test_depth_volumes() {
        let book = OrderBookSnapshot {
            timestamp: Utc::now(),
            last_update_id: 1,
            bids: vec![
                PriceLevel { price: dec!(100), quantity: dec!(2) },
                PriceLevel { price: dec!(99), quantity: dec!(3) },
            ],
            asks: vec![PriceLevel { price: dec!(101), quantity: dec!(1) }],
        };
        assert_eq!(book.depth_volumes(1), (dec!(2), dec!(1)));
        assert_eq!(book.depth_volumes(10), (dec!(5), dec!(1)));
    }
}
