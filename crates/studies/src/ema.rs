use crate::common::{closes, values, CloseWindow};
use rust_decimal::Decimal;
use taflow_core::*;
use taflow_indicators::{ema, ema_multiplier, ema_step, sma};

/// Exponential moving average of closes, seeded with the SMA of the first `period` closes.
pub struct EmaIndicator {
    definition: IndicatorDefinition,
}

#[derive(Debug, Clone)]
enum EmaState {
    /// Fewer than `period` closes seen so far.
    Seeding(CloseWindow),
    Running(Decimal),
}

impl EmaState {
    fn advance(&self, close: Decimal, period: usize) -> EmaState {
        match self {
            EmaState::Running(prev) => EmaState::Running(ema_step(*prev, close, ema_multiplier(period))),
            EmaState::Seeding(window) => {
                let window = window.pushed(close);
                if window.is_full() {
                    EmaState::Running(sma(&window.to_vec(), period))
                } else {
                    EmaState::Seeding(window)
                }
            }
        }
    }

    fn value(&self) -> Option<Decimal> {
        match self {
            EmaState::Running(v) => Some(*v),
            EmaState::Seeding(_) => None,
        }
    }
}

impl EmaIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("ema", "Exponential Moving Average", IndicatorCategory::MovingAverage)
                .describe("Exponentially weighted mean of closes")
                .param(ParamSpec::integer("period", 20, 1, 1000, "Smoothing period"))
                .overlay()
                .series(SeriesStyle::new("ema", "EMA", SeriesKind::Line, "#FF6D00")),
        }
    }
}

impl Default for EmaIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for EmaIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, params: &Params) -> usize {
        params.usize("period").unwrap_or(20)
    }

    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        let period = params.usize("period")?;
        Ok(values([("ema", ema(&closes(candles), period))]))
    }

    fn on_init(&self, warmup: &[Candle], params: &Params) -> Result<OpaqueState, IndicatorError> {
        let period = params.usize("period")?;
        let state = if warmup.len() >= period {
            EmaState::Running(ema(&closes(warmup), period))
        } else {
            EmaState::Seeding(CloseWindow::from_candles(warmup, period))
        };
        Ok(Box::new(state))
    }

    fn on_new_candle(
        &self,
        candle: &Candle,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let period = params.usize("period")?;
        let next = downcast_state::<EmaState>(state)?.advance(candle.close, period);
        let values = next
            .value()
            .map(|v| values([("ema", v)]))
            .unwrap_or_default();
        Ok(CandleUpdate::new(values, Box::new(next)))
    }

    fn on_new_tick(&self, price: Decimal, params: &Params, state: &OpaqueState) -> Result<StreamUpdate, IndicatorError> {
        let period = params.usize("period")?;
        let preview = downcast_state::<EmaState>(state)?.advance(price, period);
        Ok(preview
            .value()
            .map(|v| StreamUpdate::preview(values([("ema", v)])))
            .unwrap_or_default())
    }
}
