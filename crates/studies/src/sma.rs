use crate::common::{closes, values, CloseWindow};
use rust_decimal::Decimal;
use taflow_core::*;
use taflow_indicators::sma;

/// Simple moving average of closes.
pub struct SmaIndicator {
    definition: IndicatorDefinition,
}

impl SmaIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("sma", "Simple Moving Average", IndicatorCategory::MovingAverage)
                .describe("Arithmetic mean of the last `period` closes")
                .param(ParamSpec::integer("period", 20, 1, 1000, "Number of closes averaged"))
                .overlay()
                .series(SeriesStyle::new("sma", "SMA", SeriesKind::Line, "#2962FF")),
        }
    }
}

impl Default for SmaIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for SmaIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("period").unwrap_or(20)
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let period = params.usize("period")?;
        Ok(values([("sma", sma(&closes(candles), period))]))
    }

    fn on_init(&self, warmup: &[Candle], params: &Params) -> Result<OpaqueState, IndicatorError> {
        Ok(Box::new(CloseWindow::from_candles(warmup, params.usize("period")?)))
    }

    fn on_new_candle(
        &self,
        candle: &Candle,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let period = params.usize("period")?;
        let window = downcast_state::<CloseWindow>(state)?.pushed(candle.close);
        let values = if window.is_full() {
            values([("sma", sma(&window.to_vec(), period))])
        } else {
            IndicatorValues::new()
        };
        Ok(CandleUpdate::new(values, Box::new(window)))
    }

    fn on_new_tick(
        &self,
        price: Decimal,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<StreamUpdate, IndicatorError> {
        let period = params.usize("period")?;
        let preview = downcast_state::<CloseWindow>(state)?.pushed(price);
        if !preview.is_full() {
            return Ok(StreamUpdate::empty());
        }
        Ok(StreamUpdate::preview(values([("sma", sma(&preview.to_vec(), period))])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;
    use rust_decimal_macros::dec;

    fn params(period: i64) -> Params {
        Params::new().with("period", period)
    }

    #[test]
    fn test_progressive_matches_bulk() {
        let closes: Vec<Decimal> = (1..=30).map(|i| Decimal::from(i * 7 % 11)).collect();
        assert_progressive_matches_bulk(&SmaIndicator::new(), params(5), &candles(&closes));
    }

    #[test]
    fn test_incremental_value() {
        let sma = SmaIndicator::new();
        let p = params(3);
        let data = candles(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
        let state = sma.on_init(&data[..3], &p).unwrap();
        let first = sma.on_new_candle(&data[3], &p, &state).unwrap();
        assert_eq!(first.values["sma"], dec!(3));
        let second = sma.on_new_candle(&data[4], &p, &first.state).unwrap();
        assert_eq!(second.values["sma"], dec!(4));
    }

    #[test]
    fn test_tick_previews_without_state() {
        let sma = SmaIndicator::new();
        let p = params(2);
        let data = candles(&[dec!(10), dec!(20)]);
        let state = sma.on_init(&data, &p).unwrap();
        let tick = sma.on_new_tick(dec!(40), &p, &state).unwrap();
        assert_eq!(tick.values["sma"], dec!(30));
        assert!(tick.state.is_none());
    }

    #[test]
    fn test_wrong_state_type_is_an_error() {
        let sma = SmaIndicator::new();
        let bogus: OpaqueState = Box::new(42u32);
        let err = sma.on_new_candle(&candle(0, dec!(1)), &params(3), &bogus);
        assert!(matches!(err, Err(IndicatorError::StateMismatch(_))));
    }
}
