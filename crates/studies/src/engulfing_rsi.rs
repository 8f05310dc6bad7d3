use crate::common::{closes, values};
use crate::rsi::RsiTracker;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use taflow_core::*;

/// Engulfing candle patterns confirmed by an RSI extreme.
///
/// `signal` is 1 for a bullish engulfing while RSI is below `oversold`, -1
/// for a bearish engulfing while RSI is above `overbought`, 0 otherwise.
pub struct EngulfingRsiIndicator {
    definition: IndicatorDefinition,
}

#[derive(Debug, Clone)]
struct EngulfingState {
    rsi: RsiTracker,
    prev: Option<Candle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Engulfing {
    Bullish,
    Bearish,
}

fn engulfing(prev: &Candle, current: &Candle) -> Option<Engulfing> {
    if prev.is_bearish() && current.is_bullish() && current.open <= prev.close && current.close >= prev.open {
        Some(Engulfing::Bullish)
    } else if prev.is_bullish() && current.is_bearish() && current.open >= prev.close && current.close <= prev.open {
        Some(Engulfing::Bearish)
    } else {
        None
    }
}

struct Thresholds {
    period: usize,
    oversold: Decimal,
    overbought: Decimal,
}

impl Thresholds {
    fn from_params(params: &Params) -> Result<Self, IndicatorError> {
        Ok(Self {
            period: params.usize("rsi_period")?,
            oversold: params.decimal("oversold")?,
            overbought: params.decimal("overbought")?,
        })
    }

    fn signal(&self, pattern: Option<Engulfing>, rsi: Option<Decimal>) -> i64 {
        match (pattern, rsi) {
            (Some(Engulfing::Bullish), Some(r)) if r < self.oversold => 1,
            (Some(Engulfing::Bearish), Some(r)) if r > self.overbought => -1,
            _ => 0,
        }
    }
}

fn signal_values(rsi: Option<Decimal>, signal: i64) -> IndicatorValues {
    let mut out = values([("signal", Decimal::from(signal))]);
    if let Some(rsi) = rsi {
        out.insert("rsi".to_string(), rsi);
    }
    out
}

impl EngulfingRsiIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("engulfing_rsi", "Engulfing + RSI", IndicatorCategory::Pattern)
                .describe("Bullish/bearish engulfing candles at RSI extremes")
                .param(ParamSpec::integer("rsi_period", 14, 2, 500, "RSI period"))
                .param(ParamSpec::decimal("oversold", dec!(30), dec!(0), dec!(100), "Oversold level"))
                .param(ParamSpec::decimal("overbought", dec!(70), dec!(0), dec!(100), "Overbought level"))
                .overlay()
                .series(SeriesStyle::new("pattern", "Pattern", SeriesKind::Markers, "#FFD54F")),
        }
    }
}

impl Default for EngulfingRsiIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for EngulfingRsiIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn validate(&self, params: &Params) -> Result<(), IndicatorError> {
        let t = Thresholds::from_params(params)?;
        if t.oversold >= t.overbought {
            return Err(ParamError::Invalid {
                name: "oversold".to_string(),
                reason: format!("must be below overbought ({} >= {})", t.oversold, t.overbought),
            }
            .into());
        }
        Ok(())
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("rsi_period").unwrap_or(14) + 1
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let t = Thresholds::from_params(params)?;
        let Some((current, before)) = candles.split_last() else {
            return Ok(IndicatorValues::new());
        };
        let rsi = taflow_indicators::rsi(&closes(candles), t.period);
        let pattern = before.last().and_then(|prev| engulfing(prev, current));
        Ok(signal_values(rsi, t.signal(pattern, rsi)))
    }

    fn on_init(&self, warmup: &[Candle], params: &Params) -> Result<OpaqueState, IndicatorError> {
        let t = Thresholds::from_params(params)?;
        Ok(Box::new(EngulfingState {
            rsi: RsiTracker::from_closes(&closes(warmup), t.period),
            prev: warmup.last().cloned(),
        }))
    }

    fn on_new_candle(
        &self,
        candle: &Candle,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let t = Thresholds::from_params(params)?;
        let prev = downcast_state::<EngulfingState>(state)?;
        let tracker = prev.rsi.advance(candle.close, t.period);
        let rsi = tracker.value();
        let pattern = prev.prev.as_ref().and_then(|p| engulfing(p, candle));
        let signal = t.signal(pattern, rsi);

        let mut auxiliary = Auxiliary::new();
        if signal != 0 {
            let (kind, price) = if signal > 0 {
                ("bullish_engulfing", candle.low)
            } else {
                ("bearish_engulfing", candle.high)
            };
            auxiliary.insert(
                "pattern".to_string(),
                json!({ "time": candle.open_time, "type": kind, "price": price, "rsi": rsi }),
            );
        }
        let next = EngulfingState {
            rsi: tracker,
            prev: Some(candle.clone()),
        };
        Ok(CandleUpdate::new(signal_values(rsi, signal), Box::new(next)).with_auxiliary(auxiliary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;

    fn bar(i: i64, open: Decimal, close: Decimal) -> Candle {
        let mut c = candle(i, close);
        c.open = open;
        c.high = open.max(close) + Decimal::ONE;
        c.low = open.min(close) - Decimal::ONE;
        c
    }

    /// A steady decline followed by a bullish engulfing bar.
    fn selloff_then_engulfing() -> Vec<Candle> {
        let mut data: Vec<Candle> = (0..8)
            .map(|i| {
                let open = Decimal::from(100 - i * 3);
                bar(i, open, open - dec!(2))
            })
            .collect();
        // previous bar: open 79, close 77; engulfing bar opens below and closes above
        data.push(bar(8, dec!(76), dec!(80)));
        data
    }

    fn params() -> Params {
        Params::new().with("rsi_period", 5i64)
    }

    #[test]
    fn test_progressive_matches_bulk() {
        assert_progressive_matches_bulk(&EngulfingRsiIndicator::new(), params(), &selloff_then_engulfing());
    }

    #[test]
    fn test_bullish_engulfing_when_oversold() {
        let ind = EngulfingRsiIndicator::new();
        let p = params().resolve(&ind.definition().params).unwrap();
        let data = selloff_then_engulfing();
        let mut state = ind.on_init(&data[..6], &p).unwrap();
        let mut last = None;
        for c in &data[6..] {
            let update = ind.on_new_candle(c, &p, &state).unwrap();
            state = update.state;
            last = Some((update.values, update.auxiliary));
        }
        let (values, auxiliary) = last.unwrap();
        assert!(values["rsi"] < dec!(30));
        assert_eq!(values["signal"], Decimal::ONE);
        assert_eq!(auxiliary["pattern"]["type"], "bullish_engulfing");
    }

    #[test]
    fn test_pattern_detection() {
        assert_eq!(engulfing(&bar(0, dec!(10), dec!(8)), &bar(1, dec!(7), dec!(11))), Some(Engulfing::Bullish));
        assert_eq!(engulfing(&bar(0, dec!(8), dec!(10)), &bar(1, dec!(11), dec!(7))), Some(Engulfing::Bearish));
        assert_eq!(engulfing(&bar(0, dec!(10), dec!(8)), &bar(1, dec!(9), dec!(9.5))), None);
    }
}
