use crate::common::{closes, values};
use taflow_core::*;
use taflow_indicators::hma;

/// Hull moving average. Relies on the default window-recalculation path.
pub struct HmaIndicator {
    definition: IndicatorDefinition,
}

impl HmaIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("hma", "Hull Moving Average", IndicatorCategory::MovingAverage)
                .describe("Low-lag average 2*WMA(n/2) - WMA(n)")
                .param(ParamSpec::integer("period", 16, 2, 1000, "Full WMA period"))
                .overlay()
                .series(SeriesStyle::new("hma", "HMA", SeriesKind::Line, "#AB47BC")),
        }
    }
}

impl Default for HmaIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for HmaIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("period").unwrap_or(16)
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        Ok(values([("hma", hma(&closes(candles), params.usize("period")?))]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_fallback_path_matches_bulk() {
        let closes: Vec<Decimal> = (0..25).map(|i| Decimal::from(30 + (i * 11) % 6)).collect();
        assert_progressive_matches_bulk(&HmaIndicator::new(), Params::new().with("period", 6i64), &candles(&closes));
    }

    #[test]
    fn test_fallback_state_is_a_candle_window() {
        let ind = HmaIndicator::new();
        let p = Params::new().with("period", 4i64);
        let data = candles(&(1..=5).map(Decimal::from).collect::<Vec<_>>());
        let state = ind.on_init(&data[..4], &p).unwrap();
        let update = ind.on_new_candle(&data[4], &p, &state).unwrap();
        let window = downcast_state::<CandleWindow>(&update.state).unwrap();
        assert_eq!(window.len(), 5);
    }
}
