use crate::common::{closes, values, CloseWindow};
use rust_decimal::Decimal;
use serde_json::json;
use taflow_core::*;
use taflow_indicators::{crossover, crossunder, sma};

/// Fast/slow SMA pair with crossover detection.
///
/// `cross` is 1 on the candle where the fast average crosses above the slow
/// one, -1 where it crosses below, 0 otherwise. Crossings also emit a marker.
pub struct MaCrossIndicator {
    definition: IndicatorDefinition,
}

#[derive(Debug, Clone)]
struct MaCrossState {
    window: CloseWindow,
    prev: Option<(Decimal, Decimal)>,
}

fn pair(closes: &[Decimal], fast: usize, slow: usize) -> Option<(Decimal, Decimal)> {
    (closes.len() >= slow).then(|| (sma(closes, fast), sma(closes, slow)))
}

fn cross_direction(prev: Option<(Decimal, Decimal)>, (fast, slow): (Decimal, Decimal)) -> i64 {
    match prev {
        Some((pf, ps)) if crossover(pf, ps, fast, slow) => 1,
        Some((pf, ps)) if crossunder(pf, ps, fast, slow) => -1,
        _ => 0,
    }
}

fn pair_values((fast, slow): (Decimal, Decimal), cross: i64) -> IndicatorValues {
    values([("fast", fast), ("slow", slow), ("cross", Decimal::from(cross))])
}

impl MaCrossIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("ma_cross", "Moving Average Cross", IndicatorCategory::Trend)
                .describe("Fast and slow simple moving averages with crossover signals")
                .param(ParamSpec::integer("fast_period", 9, 1, 500, "Fast average period"))
                .param(ParamSpec::integer("slow_period", 21, 2, 1000, "Slow average period"))
                .overlay()
                .series(SeriesStyle::new("fast", "Fast MA", SeriesKind::Line, "#00BCD4"))
                .series(SeriesStyle::new("slow", "Slow MA", SeriesKind::Line, "#E91E63"))
                .series(SeriesStyle::new("cross", "Cross", SeriesKind::Markers, "#FFEB3B")),
        }
    }

    fn periods(params: &Params) -> Result<(usize, usize), IndicatorError> {
        Ok((params.usize("fast_period")?, params.usize("slow_period")?))
    }
}

impl Default for MaCrossIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for MaCrossIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn validate(&self, params: &Params) -> Result<(), IndicatorError> {
        let (fast, slow) = Self::periods(params)?;
        if fast >= slow {
            return Err(ParamError::Invalid {
                name: "fast_period".to_string(),
                reason: format!("must be below slow_period ({} >= {})", fast, slow),
            }
            .into());
        }
        Ok(())
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("slow_period").unwrap_or(21)
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let (fast, slow) = Self::periods(params)?;
        let closes = closes(candles);
        let Some(current) = pair(&closes, fast, slow) else {
            return Ok(IndicatorValues::new());
        };
        let prev = closes.split_last().and_then(|(_, before)| pair(before, fast, slow));
        Ok(pair_values(current, cross_direction(prev, current)))
    }

    fn on_init(&self, warmup: &[Candle], params: &Params) -> Result<OpaqueState, IndicatorError> {
        let (fast, slow) = Self::periods(params)?;
        Ok(Box::new(MaCrossState {
            window: CloseWindow::from_candles(warmup, slow),
            prev: pair(&closes(warmup), fast, slow),
        }))
    }

    fn on_new_candle(
        &self,
        candle: &Candle,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let (fast, slow) = Self::periods(params)?;
        let prev = downcast_state::<MaCrossState>(state)?;
        let window = prev.window.pushed(candle.close);
        let current = pair(&window.to_vec(), fast, slow);
        let next = MaCrossState { window, prev: current };

        let Some(current) = current else {
            return Ok(CandleUpdate::new(IndicatorValues::new(), Box::new(next)));
        };
        let cross = cross_direction(prev.prev, current);
        let mut auxiliary = Auxiliary::new();
        if cross != 0 {
            auxiliary.insert(
                "cross".to_string(),
                json!({
                    "time": candle.open_time,
                    "price": candle.close,
                    "side": if cross > 0 { "bullish" } else { "bearish" },
                }),
            );
        }
        Ok(CandleUpdate::new(pair_values(current, cross), Box::new(next)).with_auxiliary(auxiliary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;
    use rust_decimal_macros::dec;

    fn params() -> Params {
        Params::new().with("fast_period", 2i64).with("slow_period", 4i64)
    }

    fn v_shape() -> Vec<Decimal> {
        [10, 9, 8, 7, 6, 5, 6, 7, 8, 9, 10, 9, 8, 7, 6].iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_progressive_matches_bulk() {
        assert_progressive_matches_bulk(&MaCrossIndicator::new(), params(), &candles(&v_shape()));
    }

    #[test]
    fn test_crossings_emit_markers() {
        let ind = MaCrossIndicator::new();
        let p = params();
        let data = candles(&v_shape());
        let mut state = ind.on_init(&data[..4], &p).unwrap();
        let mut crosses = Vec::new();
        for c in &data[4..] {
            let update = ind.on_new_candle(c, &p, &state).unwrap();
            let cross = update.values["cross"];
            if cross != Decimal::ZERO {
                assert!(update.auxiliary.contains_key("cross"));
                crosses.push(cross);
            }
            state = update.state;
        }
        assert_eq!(crosses, vec![dec!(1), dec!(-1)]);
    }

    #[test]
    fn test_fast_must_be_below_slow() {
        let ind = MaCrossIndicator::new();
        let p = Params::new().with("fast_period", 10i64).with("slow_period", 5i64);
        let p = p.resolve(&ind.definition().params).unwrap();
        assert!(matches!(ind.validate(&p), Err(IndicatorError::InvalidParameter(_))));
    }
}
