use crate::models::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A market-data event delivered by a feed for one context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    /// A finalized candle.
    CandleClosed(Candle),
    /// The current price of the forming candle.
    Tick {
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
    Trade(Trade),
    OrderBook(OrderBookSnapshot),
}

impl MarketEvent {
    /// The data kind an indicator must declare to receive this event.
    pub fn kind(&self) -> DataKind {
        match self {
            MarketEvent::CandleClosed(_) | MarketEvent::Tick { .. } => DataKind::Candle,
            MarketEvent::Trade(_) => DataKind::Trade,
            MarketEvent::OrderBook(_) => DataKind::OrderBook,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MarketEvent::CandleClosed(candle) => candle.open_time,
            MarketEvent::Tick { timestamp, .. } => *timestamp,
            MarketEvent::Trade(trade) => trade.timestamp,
            MarketEvent::OrderBook(book) => book.timestamp,
        }
    }
}

impl From<Candle> for MarketEvent {
    /// Closed candles become `CandleClosed`, forming ones a `Tick` at their close price.
    fn from(candle: Candle) -> Self {
        if candle.closed {
            MarketEvent::CandleClosed(candle)
        } else {
            MarketEvent::Tick {
                price: candle.close,
                timestamp: candle.open_time,
            }
        }
    }
}
