use crate::definition::IndicatorDefinition;
use crate::models::*;
use crate::params::{ParamError, Params};
use crate::result::{Auxiliary, IndicatorValues};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::any::Any;
use std::collections::{BTreeSet, VecDeque};

// ---------------------------------------------------------------------------
// Indicator contract
// ---------------------------------------------------------------------------

/// Indicator-specific carried state. Owned by exactly one instance and only
/// ever replaced, never mutated in place by the engine.
pub type OpaqueState = Box<dyn Any + Send + Sync>;

/// Errors raised by indicator implementations.
#[derive(Debug, thiserror::Error)]
pub enum IndicatorError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ParamError),
    #[error("indicator state has unexpected type, expected {0}")]
    StateMismatch(&'static str),
    #[error("calculation failed: {0}")]
    Calculation(String),
}

/// Borrow the concrete state behind an [`OpaqueState`].
pub fn downcast_state<T: Any>(state: &OpaqueState) -> Result<&T, IndicatorError> {
    (**state)
        .downcast_ref::<T>()
        .ok_or(IndicatorError::StateMismatch(std::any::type_name::<T>()))
}

/// Output of a closed-candle step. The new state is mandatory.
pub struct CandleUpdate {
    pub values: IndicatorValues,
    pub state: OpaqueState,
    pub auxiliary: Auxiliary,
}

impl CandleUpdate {
    pub fn new(values: IndicatorValues, state: OpaqueState) -> Self {
        Self {
            values,
            state,
            auxiliary: Auxiliary::new(),
        }
    }

    pub fn with_auxiliary(mut self, auxiliary: Auxiliary) -> Self {
        self.auxiliary = auxiliary;
        self
    }
}

/// Output of a tick, trade or order-book step. State is only committed when present.
#[derive(Default)]
pub struct StreamUpdate {
    pub values: IndicatorValues,
    pub state: Option<OpaqueState>,
    pub auxiliary: Auxiliary,
}

impl StreamUpdate {
    /// Nothing to report and nothing to commit.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Values for display only; carried state is untouched.
    pub fn preview(values: IndicatorValues) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Accumulate into a new state without emitting anything.
    pub fn silent(state: OpaqueState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }
}

/// Output of [`Indicator::calculate_progressive`].
pub struct Progressive {
    pub values: IndicatorValues,
    pub state: Option<OpaqueState>,
}

/// Carried state of the bulk-recalculation fallback: the candles seen so far.
#[derive(Debug, Clone, Default)]
pub struct CandleWindow {
    candles: VecDeque<Candle>,
}

impl CandleWindow {
    /// Candles retained by the fallback path.
    pub const MAX_LEN: usize = 5000;

    pub fn new(candles: &[Candle]) -> Self {
        let start = candles.len().saturating_sub(Self::MAX_LEN);
        Self {
            candles: candles[start..].iter().cloned().collect(),
        }
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        if self.candles.len() > Self::MAX_LEN {
            self.candles.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The window as one oldest-first slice.
    pub fn candles(&mut self) -> &[Candle] {
        self.candles.make_contiguous()
    }
}

/// The unit of computation implemented by every concrete indicator.
///
/// The engine calls `on_init` once with the warm-up prefix, then
/// `on_new_candle` for every closed candle in chronological order. Ticks,
/// trades and order books arrive in between through their own handlers.
///
/// Only `definition`, `min_required_candles` and `calculate` are mandatory.
/// Without overrides, `on_init`/`on_new_candle` keep a [`CandleWindow`] and
/// re-run `calculate_progressive` (and therefore `calculate`) over the whole
/// window on every candle. That is correct but O(n) per step; indicators
/// that can update in O(1) should override `on_init` and `on_new_candle`
/// together.
pub trait Indicator: Send + Sync {
    fn definition(&self) -> &IndicatorDefinition;

    /// Cross-parameter checks run after schema resolution, before any computation.
    fn validate(&self, _params: &Params) -> Result<(), IndicatorError> {
        Ok(())
    }

    /// Warm-up length: candles consumed by `on_init` before incremental updates.
    fn min_required_candles(&self, params: &Params) -> usize;

    /// Stateless bulk calculation; values for the last candle of `candles`.
    fn calculate(&self, candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError>;

    /// Incremental calculation over `candles` given the previously carried state.
    /// The default ignores `previous` and recomputes from scratch.
    fn calculate_progressive(
        &self,
        candles: &[Candle],
        params: &Params,
        _previous: Option<&OpaqueState>,
    ) -> Result<Progressive, IndicatorError> {
        Ok(Progressive {
            values: self.calculate(candles, params)?,
            state: None,
        })
    }

    /// Produce the first carried state from the warm-up prefix.
    fn on_init(&self, warmup: &[Candle], _params: &Params) -> Result<OpaqueState, IndicatorError> {
        Ok(Box::new(CandleWindow::new(warmup)))
    }

    /// Advance on one closed candle. Must be deterministic in `(candle, params, state)`.
    fn on_new_candle(
        &self,
        candle: &Candle,
        params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let mut window = downcast_state::<CandleWindow>(state)?.clone();
        window.push(candle.clone());
        let values = if window.len() < self.min_required_candles(params) {
            IndicatorValues::new()
        } else {
            self.calculate_progressive(window.candles(), params, Some(state))?.values
        };
        Ok(CandleUpdate::new(values, Box::new(window)))
    }

    /// Preview for the forming candle. Must not advance state in a way that
    /// changes the next `on_new_candle` result.
    fn on_new_tick(
        &self,
        _price: Decimal,
        _params: &Params,
        _state: &OpaqueState,
    ) -> Result<StreamUpdate, IndicatorError> {
        Ok(StreamUpdate::empty())
    }

    fn on_trade_update(
        &self,
        _trade: &Trade,
        _params: &Params,
        _state: &OpaqueState,
    ) -> Result<StreamUpdate, IndicatorError> {
        Ok(StreamUpdate::empty())
    }

    fn on_order_book_update(
        &self,
        _book: &OrderBookSnapshot,
        _params: &Params,
        _state: &OpaqueState,
    ) -> Result<StreamUpdate, IndicatorError> {
        Ok(StreamUpdate::empty())
    }

    /// Data kinds this indicator consumes; used to skip irrelevant events.
    fn required_data_types(&self) -> BTreeSet<DataKind> {
        self.definition().data_kinds.clone()
    }

    fn id(&self) -> &str {
        &self.definition().id
    }
}

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// Errors that can occur in history or live-data collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Supplies stored candles.
#[async_trait]
pub trait CandleHistory: Send + Sync {
    /// The `n` most recent candles, oldest first.
    async fn last_n_candles(
        &self,
        provider: &str,
        symbol: &str,
        interval: &str,
        n: usize,
    ) -> Result<Vec<Candle>, DataError>;
}

/// Stores and supplies trades per `(provider, symbol)`.
#[async_trait]
pub trait TradeHistory: Send + Sync {
    /// All stored trades, oldest first.
    async fn trades(&self, provider: &str, symbol: &str) -> Result<Vec<Trade>, DataError>;

    async fn add_trades(&self, provider: &str, symbol: &str, trades: Vec<Trade>) -> Result<(), DataError>;
}

/// Stores and supplies order-book snapshots per `(provider, symbol)`.
#[async_trait]
pub trait OrderBookHistory: Send + Sync {
    /// All stored snapshots, oldest first.
    async fn order_books(&self, provider: &str, symbol: &str) -> Result<Vec<OrderBookSnapshot>, DataError>;

    async fn add_order_book(
        &self,
        provider: &str,
        symbol: &str,
        book: OrderBookSnapshot,
    ) -> Result<(), DataError>;
}

/// A live exchange connection, used only to fill gaps in stored order flow.
#[async_trait]
pub trait LiveDataProvider: Send + Sync {
    /// Provider name, matching `ContextKey::provider`.
    fn name(&self) -> &str;

    /// Up to `limit` aggregate trades strictly before `end_time` (latest if `None`), oldest first.
    async fn historical_aggregate_trades(
        &self,
        symbol: &str,
        end_time: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Trade>, DataError>;

    async fn order_book_snapshot(&self, symbol: &str, depth: usize) -> Result<OrderBookSnapshot, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn candle(i: i64) -> Candle {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(i);
        Candle {
            open_time,
            close_time: open_time + Duration::minutes(1),
            open: dec!(1),
            high: dec!(1),
            low: dec!(1),
            close: Decimal::from(i),
            volume: dec!(1),
            closed: true,
        }
    }

    #[test]
    fn test_candle_window_evicts_oldest() {
        let seed: Vec<Candle> = (0..CandleWindow::MAX_LEN as i64 + 3).map(candle).collect();
        let mut window = CandleWindow::new(&seed);
        assert_eq!(window.len(), CandleWindow::MAX_LEN);
        assert_eq!(window.candles()[0].close, dec!(3));

        for i in 0..10 {
            window.push(candle(CandleWindow::MAX_LEN as i64 + 3 + i));
        }
        let candles = window.candles();
        assert_eq!(candles.len(), CandleWindow::MAX_LEN);
        assert_eq!(candles[0].close, dec!(13));
        assert!(candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
    }
}
