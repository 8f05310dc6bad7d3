use crate::common::values;
use rust_decimal::Decimal;
use taflow_core::*;
use taflow_indicators::{obv, obv_step};

/// On-Balance Volume.
pub struct ObvIndicator {
    definition: IndicatorDefinition,
}

#[derive(Debug, Clone, Default)]
struct ObvState {
    obv: Decimal,
    prev_close: Option<Decimal>,
}

impl ObvIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("obv", "On-Balance Volume", IndicatorCategory::Volume)
                .describe("Cumulative volume signed by close-to-close direction")
                .series(SeriesStyle::new("obv", "OBV", SeriesKind::Line, "#5C6BC0")),
        }
    }
}

impl Default for ObvIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for ObvIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, _params: &Params) -> usize {
        1
    }

    fn calculate(&self, candles: &[Candle], _params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let closes: Vec<_> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<_> = candles.iter().map(|c| c.volume).collect();
        Ok(values([("obv", obv(&closes, &volumes))]))
    }

    fn on_init(&self, warmup: &[Candle], params: &Params) -> Result<OpaqueState, IndicatorError> {
        let obv = self.calculate(warmup, params)?.get("obv").copied().unwrap_or_default();
        Ok(Box::new(ObvState {
            obv,
            prev_close: warmup.last().map(|c| c.close),
        }))
    }

    fn on_new_candle(
        &self,
        candle: &Candle,
        _params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let prev = downcast_state::<ObvState>(state)?;
        let obv = match prev.prev_close {
            Some(prev_close) => obv_step(prev.obv, prev_close, candle.close, candle.volume),
            None => prev.obv,
        };
        let next = ObvState {
            obv,
            prev_close: Some(candle.close),
        };
        Ok(CandleUpdate::new(values([("obv", obv)]), Box::new(next)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_progressive_matches_bulk() {
        let mut data = candles(&(0..20).map(|i| Decimal::from(10 + (i * 3) % 5)).collect::<Vec<_>>());
        for (i, c) in data.iter_mut().enumerate() {
            c.volume = Decimal::from(i as i64 + 1);
        }
        assert_progressive_matches_bulk(&ObvIndicator::new(), Params::new(), &data);
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let ind = ObvIndicator::new();
        let err = Params::new().with("period", 3i64).resolve(&ind.definition().params).unwrap_err();
        assert_eq!(err, ParamError::Unknown("period".to_string()));
    }

    #[test]
    fn test_signed_accumulation() {
        let ind = ObvIndicator::new();
        let data = candles(&[dec!(10), dec!(11), dec!(9)]);
        let state = ind.on_init(&data[..1], &Params::new()).unwrap();
        let up = ind.on_new_candle(&data[1], &Params::new(), &state).unwrap();
        assert_eq!(up.values["obv"], dec!(10));
        let down = ind.on_new_candle(&data[2], &Params::new(), &up.state).unwrap();
        assert_eq!(down.values["obv"], Decimal::ZERO);
    }
}
