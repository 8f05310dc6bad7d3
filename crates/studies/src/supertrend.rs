use crate::common::{hlc, values};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::VecDeque;
use taflow_core::*;
use taflow_indicators::{supertrend, SuperTrendPoint};

/// ATR-based trailing stop that flips between up- and downtrend.
pub struct SuperTrendIndicator {
    definition: IndicatorDefinition,
}

#[derive(Debug, Clone, Default)]
struct SuperTrendState {
    /// The last `period + 1` candles.
    recent: VecDeque<Candle>,
    last: Option<SuperTrendPoint>,
}

/// Point for the last candle of `candles`, chaining from `prev`.
fn step(candles: &[Candle], period: usize, multiplier: Decimal, prev: Option<SuperTrendPoint>) -> Option<SuperTrendPoint> {
    let (highs, lows, closes) = hlc(candles);
    supertrend(&highs, &lows, &closes, period, multiplier, prev)
}

/// Walk the whole series and return the final point.
fn chain(candles: &[Candle], period: usize, multiplier: Decimal) -> Option<SuperTrendPoint> {
    (period + 1..=candles.len()).fold(None, |prev, end| {
        step(&candles[end - period - 1..end], period, multiplier, prev).or(prev)
    })
}

fn point_values(point: SuperTrendPoint) -> IndicatorValues {
    values([("supertrend", point.value), ("direction", Decimal::from(point.direction))])
}

impl SuperTrendIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("supertrend", "SuperTrend", IndicatorCategory::Trend)
                .describe("Trend-following stop line from ATR bands around the median price")
                .param(ParamSpec::integer("period", 10, 1, 500, "ATR period"))
                .param(ParamSpec::decimal("multiplier", dec!(3), dec!(0.1), dec!(20), "ATR multiplier"))
                .overlay()
                .series(SeriesStyle::new("supertrend", "SuperTrend", SeriesKind::Line, "#26A69A"))
                .series(SeriesStyle::new("trend_flip", "Trend flip", SeriesKind::Markers, "#EF5350")),
        }
    }
}

impl Default for SuperTrendIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for SuperTrendIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("period").unwrap_or(10) + 1
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let point = chain(candles, params.usize("period")?, params.decimal("multiplier")?);
        Ok(point.map(point_values).unwrap_or_default())
    }

    fn on_init(&self, warmup: &[Candle], params: &Params) -> Result<OpaqueState, IndicatorError> {
        let period = params.usize("period")?;
        let start = warmup.len().saturating_sub(period + 1);
        Ok(Box::new(SuperTrendState {
            recent: warmup[start..].iter().cloned().collect(),
            last: chain(warmup, period, params.decimal("multiplier")?),
        }))
    }

    fn on_new_candle(
        &self,
        candle: &Candle,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let period = params.usize("period")?;
        let prev = downcast_state::<SuperTrendState>(state)?;

        let mut next = prev.clone();
        next.recent.push_back(candle.clone());
        while next.recent.len() > period + 1 {
            next.recent.pop_front();
        }
        let window: Vec<Candle> = next.recent.iter().cloned().collect();
        let Some(point) = step(&window, period, params.decimal("multiplier")?, prev.last) else {
            return Ok(CandleUpdate::new(IndicatorValues::new(), Box::new(next)));
        };
        next.last = Some(point);

        let mut auxiliary = Auxiliary::new();
        if let Some(before) = prev.last {
            if before.direction != point.direction {
                let direction = if point.is_uptrend() { "up" } else { "down" };
                auxiliary.insert(
                    "trend_flip".to_string(),
                    json!({ "time": candle.open_time, "direction": direction, "price": candle.close }),
                );
            }
        }
        Ok(CandleUpdate::new(point_values(point), Box::new(next)).with_auxiliary(auxiliary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;

    fn swing() -> Vec<Decimal> {
        let up = (0..15).map(|i| Decimal::from(100 + i * 2));
        let down = (0..15).map(|i| Decimal::from(128 - i * 3));
        let recovery = (0..10).map(|i| Decimal::from(86 + i * 4));
        up.chain(down).chain(recovery).collect()
    }

    fn params() -> Params {
        Params::new().with("period", 3i64).with("multiplier", dec!(1))
    }

    #[test]
    fn test_progressive_matches_bulk() {
        assert_progressive_matches_bulk(&SuperTrendIndicator::new(), params(), &candles(&swing()));
    }

    #[test]
    fn test_flip_emits_marker() {
        let ind = SuperTrendIndicator::new();
        let p = params().resolve(&ind.definition().params).unwrap();
        let data = candles(&swing());
        let mut state = ind.on_init(&data[..4], &p).unwrap();
        let mut flips = 0;
        let mut prev_direction = ind.calculate(&data[..4], &p).unwrap().get("direction").copied();
        for c in &data[4..] {
            let update = ind.on_new_candle(c, &p, &state).unwrap();
            let direction = update.values["direction"];
            if prev_direction.is_some_and(|d| d != direction) {
                assert!(update.auxiliary.contains_key("trend_flip"));
                flips += 1;
            } else {
                assert!(!update.auxiliary.contains_key("trend_flip"));
            }
            prev_direction = Some(direction);
            state = update.state;
        }
        assert!(flips >= 2);
    }

    #[test]
    fn test_insufficient_history_is_empty() {
        let ind = SuperTrendIndicator::new();
        let values = ind.calculate(&candles(&[dec!(1), dec!(2)]), &params()).unwrap();
        assert!(values.is_empty());
    }
}
