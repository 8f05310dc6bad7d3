use rust_decimal::Decimal;
use std::collections::VecDeque;
use taflow_core::{Candle, IndicatorValues};

/// Build an [`IndicatorValues`] map from `(name, value)` pairs.
pub(crate) fn values<const N: usize>(pairs: [(&str, Decimal); N]) -> IndicatorValues {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<Decimal> {
    candles.iter().map(|c| c.close).collect()
}

/// Parallel high/low/close columns.
pub(crate) fn hlc(candles: &[Candle]) -> (Vec<Decimal>, Vec<Decimal>, Vec<Decimal>) {
    let highs = candles.iter().map(|c| c.high).collect();
    let lows = candles.iter().map(|c| c.low).collect();
    (highs, lows, closes(candles))
}

/// The most recent `capacity` closes.
#[derive(Debug, Clone, Default)]
pub(crate) struct CloseWindow {
    closes: VecDeque<Decimal>,
    capacity: usize,
}

impl CloseWindow {
    pub fn from_candles(candles: &[Candle], capacity: usize) -> Self {
        let start = candles.len().saturating_sub(capacity);
        Self {
            closes: candles[start..].iter().map(|c| c.close).collect(),
            capacity,
        }
    }

    /// A copy with `close` appended and the oldest value evicted when over capacity.
    pub fn pushed(&self, close: Decimal) -> Self {
        let mut next = self.clone();
        next.closes.push_back(close);
        while next.closes.len() > next.capacity {
            next.closes.pop_front();
        }
        next
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.closes.len() >= self.capacity
    }

    pub fn to_vec(&self) -> Vec<Decimal> {
        self.closes.iter().copied().collect()
    }
}
