use crate::common::{closes, values};
use taflow_core::*;
use taflow_indicators::macd;

/// MACD line over the default window-recalculation path.
///
/// The signal line mirrors the MACD line and the histogram stays at zero.
pub struct MacdIndicator {
    definition: IndicatorDefinition,
}

impl MacdIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("macd", "MACD", IndicatorCategory::Oscillator)
                .describe("Difference between fast and slow exponential moving averages")
                .param(ParamSpec::integer("fast", 12, 1, 500, "Fast EMA period"))
                .param(ParamSpec::integer("slow", 26, 2, 1000, "Slow EMA period"))
                .param(ParamSpec::integer("signal", 9, 1, 500, "Signal period"))
                .series(SeriesStyle::new("macd", "MACD", SeriesKind::Line, "#2962FF"))
                .series(SeriesStyle::new("signal", "Signal", SeriesKind::Line, "#FF6D00"))
                .series(SeriesStyle::new("histogram", "Histogram", SeriesKind::Histogram, "#26A69A")),
        }
    }
}

impl Default for MacdIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for MacdIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn validate(&self, params: &Params) -> Result<(), IndicatorError> {
        let (fast, slow) = (params.usize("fast")?, params.usize("slow")?);
        if fast >= slow {
            return Err(ParamError::Invalid {
                name: "fast".to_string(),
                reason: format!("must be below slow ({} >= {})", fast, slow),
            }
            .into());
        }
        Ok(())
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("slow").unwrap_or(26)
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let out = macd(
            &closes(candles),
            params.usize("fast")?,
            params.usize("slow")?,
            params.usize("signal")?,
        );
        Ok(values([("macd", out.macd), ("signal", out.signal), ("histogram", out.histogram)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;
    use rust_decimal::Decimal;

    fn params() -> Params {
        Params::new().with("fast", 3i64).with("slow", 6i64).with("signal", 3i64)
    }

    #[test]
    fn test_fallback_path_matches_bulk() {
        let closes: Vec<Decimal> = (0..30).map(|i| Decimal::from(50 + (i * 7) % 10)).collect();
        assert_progressive_matches_bulk(&MacdIndicator::new(), params(), &candles(&closes));
    }

    #[test]
    fn test_signal_mirrors_line() {
        let ind = MacdIndicator::new();
        let closes: Vec<Decimal> = (1..=10).map(Decimal::from).collect();
        let values = ind.calculate(&candles(&closes), &params()).unwrap();
        assert_eq!(values["signal"], values["macd"]);
        assert_eq!(values["histogram"], Decimal::ZERO);
    }
}
