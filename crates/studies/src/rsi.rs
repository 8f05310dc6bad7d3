use crate::common::{closes, values};
use rust_decimal::Decimal;
use taflow_core::*;
use taflow_indicators::{rsi, rsi_from_averages, rsi_seed, rsi_step, WilderAverages};

/// Wilder RSI carried between candles. Shared with the engulfing study.
#[derive(Debug, Clone, Default)]
pub(crate) struct RsiTracker {
    /// Closes buffered until `period + 1` are available.
    seed: Vec<Decimal>,
    averages: Option<WilderAverages>,
    prev_close: Option<Decimal>,
}

impl RsiTracker {
    pub fn from_closes(closes: &[Decimal], period: usize) -> Self {
        match rsi_seed(closes, period) {
            Some(averages) => Self {
                seed: Vec::new(),
                averages: Some(averages),
                prev_close: closes.last().copied(),
            },
            None => Self {
                seed: closes.to_vec(),
                averages: None,
                prev_close: closes.last().copied(),
            },
        }
    }

    pub fn advance(&self, close: Decimal, period: usize) -> Self {
        let mut next = self.clone();
        match (self.averages, self.prev_close) {
            (Some(averages), Some(prev)) => {
                next.averages = Some(rsi_step(averages, close - prev, period));
            }
            _ => {
                next.seed.push(close);
                next.averages = rsi_seed(&next.seed, period);
                if next.averages.is_some() {
                    next.seed.clear();
                }
            }
        }
        next.prev_close = Some(close);
        next
    }

    pub fn value(&self) -> Option<Decimal> {
        self.averages.map(rsi_from_averages)
    }
}

/// Relative Strength Index with Wilder smoothing.
pub struct RsiIndicator {
    definition: IndicatorDefinition,
}

impl RsiIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("rsi", "Relative Strength Index", IndicatorCategory::Oscillator)
                .describe("Momentum oscillator bounded to [0, 100]")
                .param(ParamSpec::integer("period", 14, 2, 500, "Wilder smoothing period"))
                .series(SeriesStyle::new("rsi", "RSI", SeriesKind::Line, "#7E57C2")),
        }
    }
}

impl Default for RsiIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for RsiIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("period").unwrap_or(14) + 1
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let period = params.usize("period")?;
        Ok(rsi(&closes(candles), period)
            .map(|v| values([("rsi", v)]))
            .unwrap_or_default())
    }

    fn on_init(&self, warmup: &[Candle], params: &Params) -> Result<OpaqueState, IndicatorError> {
        Ok(Box::new(RsiTracker::from_closes(&closes(warmup), params.usize("period")?)))
    }

    fn on_new_candle(
        &self,
        candle: &Candle,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let next = downcast_state::<RsiTracker>(state)?.advance(candle.close, params.usize("period")?);
        let values = next.value().map(|v| values([("rsi", v)])).unwrap_or_default();
        Ok(CandleUpdate::new(values, Box::new(next)))
    }

    fn on_new_tick(&self, price: Decimal, params: &Params, state: &OpaqueState) -> Result<StreamUpdate, IndicatorError> {
        let preview = downcast_state::<RsiTracker>(state)?.advance(price, params.usize("period")?);
        Ok(preview
            .value()
            .map(|v| StreamUpdate::preview(values([("rsi", v)])))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;
    use rust_decimal_macros::dec;

    fn zigzag(n: i64) -> Vec<Decimal> {
        (0..n).map(|i| Decimal::from(50 + (i * 7) % 9) + dec!(0.25) * Decimal::from(i % 4)).collect()
    }

    #[test]
    fn test_progressive_matches_bulk() {
        assert_progressive_matches_bulk(&RsiIndicator::new(), Params::new().with("period", 5i64), &candles(&zigzag(40)));
    }

    #[test]
    fn test_absent_until_computable() {
        let rsi = RsiIndicator::new();
        let p = Params::new().with("period", 14i64);
        let data = candles(&zigzag(15));
        assert!(rsi.calculate(&data[..14], &p).unwrap().is_empty());
        assert!(rsi.calculate(&data, &p).unwrap().contains_key("rsi"));
    }

    #[test]
    fn test_tracker_seeds_incrementally() {
        let closes = zigzag(20);
        let mut tracker = RsiTracker::from_closes(&closes[..2], 5);
        for c in &closes[2..] {
            tracker = tracker.advance(*c, 5);
        }
        assert_eq!(tracker.value(), rsi(&closes, 5));
    }
}
