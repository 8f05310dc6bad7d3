use crate::history::ResultHistory;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taflow_core::*;

/// Carried state of one instance. The opaque part is only ever replaced.
pub struct IndicatorState {
    opaque: OpaqueState,
    pub context: ContextKey,
    pub indicator_id: String,
    pub params: Params,
    pub processed_candles: u64,
    /// Open time of the last candle consumed, warm-up included.
    pub last_candle_open: Option<DateTime<Utc>>,
}

impl IndicatorState {
    pub fn new(opaque: OpaqueState, context: ContextKey, indicator_id: &str, params: Params) -> Self {
        Self {
            opaque,
            context,
            indicator_id: indicator_id.to_string(),
            params,
            processed_candles: 0,
            last_candle_open: None,
        }
    }

    pub fn opaque(&self) -> &OpaqueState {
        &self.opaque
    }

    fn replace(&mut self, opaque: OpaqueState) {
        self.opaque = opaque;
    }

    fn record_candle(&mut self, candle: &Candle) {
        self.processed_candles += 1;
        self.last_candle_open = Some(candle.open_time);
    }

    /// Whether `candle` is not strictly after the last one consumed.
    pub fn is_stale(&self, candle: &Candle) -> bool {
        self.last_candle_open.is_some_and(|last| candle.open_time <= last)
    }
}

impl std::fmt::Debug for IndicatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorState")
            .field("context", &self.context)
            .field("indicator_id", &self.indicator_id)
            .field("params", &self.params)
            .field("processed_candles", &self.processed_candles)
            .field("last_candle_open", &self.last_candle_open)
            .finish()
    }
}

/// One activated (indicator, context, parameters) computation.
pub struct IndicatorInstance {
    pub key: String,
    indicator: Arc<dyn Indicator>,
    pub state: IndicatorState,
    history: ResultHistory,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub update_count: u64,
}

impl IndicatorInstance {
    /// Run `on_init` over `warmup` and wrap the resulting state.
    pub fn initialize(
        key: String,
        indicator: Arc<dyn Indicator>,
        context: ContextKey,
        params: Params,
        warmup: &[Candle],
        history_capacity: usize,
    ) -> Result<Self, IndicatorError> {
        let opaque = indicator.on_init(warmup, &params)?;
        let mut state = IndicatorState::new(opaque, context, indicator.id(), params);
        state.processed_candles = warmup.len() as u64;
        state.last_candle_open = warmup.last().map(|c| c.open_time);
        let now = Utc::now();
        Ok(Self {
            key,
            indicator,
            state,
            history: ResultHistory::new(history_capacity),
            created_at: now,
            last_update: now,
            update_count: 0,
        })
    }

    pub fn indicator(&self) -> &Arc<dyn Indicator> {
        &self.indicator
    }

    pub fn indicator_id(&self) -> &str {
        &self.state.indicator_id
    }

    pub fn context(&self) -> &ContextKey {
        &self.state.context
    }

    pub fn params(&self) -> &Params {
        &self.state.params
    }

    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    pub fn latest(&self) -> Option<&IndicatorResult> {
        self.history.latest()
    }

    /// Advance on a closed candle and record the result.
    ///
    /// Returns `None` without touching state when the candle is not strictly
    /// newer than the last one consumed.
    pub fn apply_candle(&mut self, candle: &Candle) -> Result<Option<IndicatorResult>, IndicatorError> {
        if self.state.is_stale(candle) {
            tracing::debug!(key = %self.key, open_time = %candle.open_time, "skipping stale candle");
            return Ok(None);
        }
        let update = self.indicator.on_new_candle(candle, &self.state.params, self.state.opaque())?;
        self.state.replace(update.state);
        self.state.record_candle(candle);
        let result = IndicatorResult::for_candle(candle, update.values, update.auxiliary);
        self.history.push(result.clone());
        Ok(Some(result))
    }

    pub fn apply_tick(&mut self, price: Decimal, timestamp: DateTime<Utc>) -> Result<IndicatorResult, IndicatorError> {
        let update = self.indicator.on_new_tick(price, &self.state.params, self.state.opaque())?;
        Ok(self.commit_stream(update, timestamp))
    }

    pub fn apply_trade(&mut self, trade: &Trade) -> Result<IndicatorResult, IndicatorError> {
        let update = self.indicator.on_trade_update(trade, &self.state.params, self.state.opaque())?;
        Ok(self.commit_stream(update, trade.timestamp))
    }

    pub fn apply_order_book(&mut self, book: &OrderBookSnapshot) -> Result<IndicatorResult, IndicatorError> {
        let update = self.indicator.on_order_book_update(book, &self.state.params, self.state.opaque())?;
        Ok(self.commit_stream(update, book.timestamp))
    }

    fn commit_stream(&mut self, update: StreamUpdate, timestamp: DateTime<Utc>) -> IndicatorResult {
        if let Some(state) = update.state {
            self.state.replace(state);
        }
        IndicatorResult::at(timestamp, update.values, update.auxiliary)
    }

    /// Record a live update.
    pub fn touch(&mut self) {
        self.last_update = Utc::now();
        self.update_count += 1;
    }

    /// Take over identity and bookkeeping from the instance being replaced.
    pub(crate) fn inherit(&mut self, previous: &IndicatorInstance) {
        self.key = previous.key.clone();
        self.created_at = previous.created_at;
        self.update_count = previous.update_count;
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            key: self.key.clone(),
            indicator_id: self.state.indicator_id.clone(),
            context: self.state.context.clone(),
            params: self.state.params.clone(),
            processed_candles: self.state.processed_candles,
            created_at: self.created_at,
            last_update: self.last_update,
            update_count: self.update_count,
            history_len: self.history.len(),
            latest: self.history.latest().cloned(),
        }
    }
}

impl std::fmt::Debug for IndicatorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorInstance")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("history_len", &self.history.len())
            .field("update_count", &self.update_count)
            .finish()
    }
}

/// Read-only, serializable view of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub key: String,
    pub indicator_id: String,
    pub context: ContextKey,
    pub params: Params,
    pub processed_candles: u64,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub update_count: u64,
    pub history_len: usize,
    pub latest: Option<IndicatorResult>,
}
