use super::{InstanceManager, InstanceSlot};
use crate::error::EngineError;
use crate::instance::IndicatorInstance;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use taflow_core::*;
use tracing::{debug, trace, warn};

/// Results keyed by instance, holding only instances that produced output.
pub type UpdateBatch = HashMap<String, IndicatorResult>;

fn candle_step(instance: &mut IndicatorInstance, candle: &Candle) -> Result<Option<IndicatorResult>, IndicatorError> {
    if !candle.closed {
        return tick_step(instance, candle.close, candle.open_time);
    }
    let result = instance.apply_candle(candle)?;
    if result.is_some() {
        instance.touch();
    }
    Ok(result)
}

fn tick_step(
    instance: &mut IndicatorInstance,
    price: Decimal,
    timestamp: DateTime<Utc>,
) -> Result<Option<IndicatorResult>, IndicatorError> {
    let result = instance.apply_tick(price, timestamp)?;
    instance.touch();
    Ok(Some(result))
}

fn trade_step(instance: &mut IndicatorInstance, trade: &Trade) -> Result<Option<IndicatorResult>, IndicatorError> {
    let result = instance.apply_trade(trade)?;
    instance.touch();
    Ok(Some(result))
}

fn book_step(instance: &mut IndicatorInstance, book: &OrderBookSnapshot) -> Result<Option<IndicatorResult>, IndicatorError> {
    let result = instance.apply_order_book(book)?;
    instance.touch();
    Ok(Some(result))
}

impl InstanceManager {
    /// Apply a candle to one instance. A candle that is not closed is treated
    /// as a tick at its close price. Unknown keys and stale candles yield `None`.
    pub fn update_with_candle(&self, key: &str, candle: &Candle) -> Result<Option<IndicatorResult>, EngineError> {
        self.with_instance(key, |instance| candle_step(instance, candle))
    }

    /// Preview for the forming candle; never recorded in history.
    pub fn update_with_tick(
        &self,
        key: &str,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<IndicatorResult>, EngineError> {
        self.with_instance(key, |instance| tick_step(instance, price, timestamp))
    }

    pub fn update_with_trade(&self, key: &str, trade: &Trade) -> Result<Option<IndicatorResult>, EngineError> {
        self.with_instance(key, |instance| trade_step(instance, trade))
    }

    pub fn update_with_order_book(
        &self,
        key: &str,
        book: &OrderBookSnapshot,
    ) -> Result<Option<IndicatorResult>, EngineError> {
        self.with_instance(key, |instance| book_step(instance, book))
    }

    /// Fan a candle out to every instance on `context`.
    pub fn update_all_for_context(&self, context: &ContextKey, candle: &Candle) -> Result<UpdateBatch, EngineError> {
        let mut batch = UpdateBatch::new();
        for (key, slot) in self.slots_in_context(context) {
            let result = self.with_slot(&key, &slot, |instance| candle_step(instance, candle));
            collect(&mut batch, key, result)?;
        }
        Ok(batch)
    }

    /// Fan a trade out to every trade-consuming instance on `provider`/`symbol`, across intervals.
    pub fn update_all_with_trade(&self, provider: &str, symbol: &str, trade: &Trade) -> Result<UpdateBatch, EngineError> {
        let mut batch = UpdateBatch::new();
        for (key, slot) in self.slots_for_symbol(provider, symbol) {
            if !slot.wants_trades() {
                continue;
            }
            let result = self.with_slot(&key, &slot, |instance| trade_step(instance, trade));
            collect(&mut batch, key, result)?;
        }
        Ok(batch)
    }

    /// Fan an order book out to every book-consuming instance on `provider`/`symbol`, across intervals.
    pub fn update_all_with_order_book(
        &self,
        provider: &str,
        symbol: &str,
        book: &OrderBookSnapshot,
    ) -> Result<UpdateBatch, EngineError> {
        let mut batch = UpdateBatch::new();
        for (key, slot) in self.slots_for_symbol(provider, symbol) {
            if !slot.wants_order_books() {
                continue;
            }
            let result = self.with_slot(&key, &slot, |instance| book_step(instance, book));
            collect(&mut batch, key, result)?;
        }
        Ok(batch)
    }

    /// Route a market event received on `context` to the matching fan-out.
    pub fn dispatch(&self, context: &ContextKey, event: &MarketEvent) -> Result<UpdateBatch, EngineError> {
        trace!(context = %context, kind = ?event.kind(), at = %event.timestamp(), "dispatching event");
        match event {
            MarketEvent::CandleClosed(candle) => self.update_all_for_context(context, candle),
            MarketEvent::Tick { price, timestamp } => {
                let mut batch = UpdateBatch::new();
                for (key, slot) in self.slots_in_context(context) {
                    let result = self.with_slot(&key, &slot, |instance| tick_step(instance, *price, *timestamp));
                    collect(&mut batch, key, result)?;
                }
                Ok(batch)
            }
            MarketEvent::Trade(trade) => self.update_all_with_trade(&context.provider, &context.symbol, trade),
            MarketEvent::OrderBook(book) => self.update_all_with_order_book(&context.provider, &context.symbol, book),
        }
    }

    fn with_instance<F>(&self, key: &str, step: F) -> Result<Option<IndicatorResult>, EngineError>
    where
        F: FnOnce(&mut IndicatorInstance) -> Result<Option<IndicatorResult>, IndicatorError>,
    {
        let Some(slot) = self.slot(key) else {
            debug!(key, "update for unknown instance");
            return Ok(None);
        };
        self.with_slot(key, &slot, step)
    }

    fn with_slot<F>(&self, key: &str, slot: &InstanceSlot, step: F) -> Result<Option<IndicatorResult>, EngineError>
    where
        F: FnOnce(&mut IndicatorInstance) -> Result<Option<IndicatorResult>, IndicatorError>,
    {
        let _busy = slot.enter(key, self.config.detect_reentrancy)?;
        let mut instance = slot.instance.lock();
        Ok(step(&mut instance)?)
    }
}

/// Keep non-empty results. A failing indicator is logged and skipped so the
/// rest of the fan-out still runs; ordering violations abort it.
fn collect(
    batch: &mut UpdateBatch,
    key: String,
    result: Result<Option<IndicatorResult>, EngineError>,
) -> Result<(), EngineError> {
    match result {
        Ok(Some(result)) if !result.is_empty() => {
            batch.insert(key, result);
        }
        Ok(_) => {}
        Err(EngineError::ReentrantUpdate(key)) => return Err(EngineError::ReentrantUpdate(key)),
        Err(e) => warn!(key = %key, error = %e, "indicator update failed"),
    }
    Ok(())
}
