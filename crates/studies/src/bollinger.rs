use crate::common::{closes, values, CloseWindow};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use taflow_core::*;
use taflow_indicators::{bollinger, BollingerBands};

/// Bollinger Bands: SMA middle band with `std_dev` population deviations either side.
pub struct BollingerIndicator {
    definition: IndicatorDefinition,
}

impl BollingerIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("bollinger", "Bollinger Bands", IndicatorCategory::Volatility)
                .describe("Volatility envelope around a simple moving average")
                .param(ParamSpec::integer("period", 20, 2, 1000, "Lookback for mean and deviation"))
                .param(ParamSpec::decimal("std_dev", dec!(2), dec!(0.1), dec!(10), "Band width in standard deviations"))
                .overlay()
                .series(SeriesStyle::new("upper", "Upper", SeriesKind::Band, "#2196F3"))
                .series(SeriesStyle::new("middle", "Basis", SeriesKind::Line, "#FF9800"))
                .series(SeriesStyle::new("lower", "Lower", SeriesKind::Band, "#2196F3")),
        }
    }
}

impl Default for BollingerIndicator {
    fn default() -> Self {
        Self::new()
    }
}

fn band_values(bands: BollingerBands) -> IndicatorValues {
    values([("upper", bands.upper), ("middle", bands.middle), ("lower", bands.lower)])
}

impl Indicator for BollingerIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("period").unwrap_or(20)
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let bands = bollinger(&closes(candles), params.usize("period")?, params.decimal("std_dev")?);
        Ok(band_values(bands))
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
            band_values(bollinger(&window.to_vec(), period, params.decimal("std_dev")?))
        } else {
            IndicatorValues::new()
        };
        Ok(CandleUpdate::new(values, Box::new(window)))
    }

    fn on_new_tick(&self, price: Decimal, params: &Params, state: &OpaqueState) -> Result<StreamUpdate, IndicatorError> {
        let preview = downcast_state::<CloseWindow>(state)?.pushed(price);
        if !preview.is_full() {
            return Ok(StreamUpdate::empty());
        }
        let bands = bollinger(&preview.to_vec(), params.usize("period")?, params.decimal("std_dev")?);
        Ok(StreamUpdate::preview(band_values(bands)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;

    #[test]
    fn test_progressive_matches_bulk() {
        let closes: Vec<Decimal> = (0..30).map(|i| Decimal::from(20 + (i * 5) % 7)).collect();
        let params = Params::new().with("period", 5i64).with("std_dev", dec!(2));
        assert_progressive_matches_bulk(&BollingerIndicator::new(), params, &candles(&closes));
    }

    #[test]
    fn test_flat_series_collapses_bands() {
        let ind = BollingerIndicator::new();
        let p = Params::new().with("period", 4i64).with("std_dev", dec!(2));
        let values = ind.calculate(&candles(&[dec!(5); 4]), &p).unwrap();
        assert_eq!(values["upper"], dec!(5));
        assert_eq!(values["middle"], dec!(5));
        assert_eq!(values["lower"], dec!(5));
    }

    #[test]
    fn test_bands_are_ordered() {
        let ind = BollingerIndicator::new();
        let p = Params::new().with("period", 4i64).with("std_dev", dec!(2));
        let values = ind.calculate(&candles(&[dec!(1), dec!(4), dec!(2), dec!(8)]), &p).unwrap();
        assert!(values["lower"] < values["middle"]);
        assert!(values["middle"] < values["upper"]);
    }
}
