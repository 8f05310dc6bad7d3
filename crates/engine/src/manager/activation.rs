use super::{InstanceManager, InstanceSlot};
use crate::error::EngineError;
use crate::key::instance_key;
use crate::order_flow::load_order_flow;
use crate::replay::{build_instance, OrderFlow};
use std::sync::Arc;
use taflow_core::*;
use tracing::{debug, info, warn};

impl InstanceManager {
    /// Activate `indicator_id` on `context`, backfilling from candle history.
    ///
    /// Idempotent: an identical `(indicator, context, params)` returns the
    /// existing key without recomputing anything. A history fetch failure
    /// degrades to warming up on whatever was obtained.
    pub async fn activate(&self, indicator_id: &str, context: &ContextKey, params: &Params) -> Result<String, EngineError> {
        let (indicator, params) = self.prepare(indicator_id, params)?;
        let key = instance_key(context, indicator_id, &params);
        if self.is_active(&key) {
            debug!(key = %key, "already active");
            return Ok(key);
        }
        let candles = self.fetch_candles(context).await;
        self.install(key, indicator, context, params, candles).await
    }

    /// Activate on caller-supplied candles instead of the history collaborator.
    pub async fn activate_with_candles(
        &self,
        indicator_id: &str,
        context: &ContextKey,
        params: &Params,
        mut candles: Vec<Candle>,
    ) -> Result<String, EngineError> {
        let (indicator, params) = self.prepare(indicator_id, params)?;
        let key = instance_key(context, indicator_id, &params);
        if self.is_active(&key) {
            debug!(key = %key, "already active");
            return Ok(key);
        }
        candles.sort_by_key(|c| c.open_time);
        self.install(key, indicator, context, params, candles).await
    }

    async fn install(
        &self,
        key: String,
        indicator: Arc<dyn Indicator>,
        context: &ContextKey,
        params: Params,
        candles: Vec<Candle>,
    ) -> Result<String, EngineError> {
        let flow = load_order_flow(&self.sources, &self.config, indicator.definition(), context, &candles).await;
        let instance = build_instance(
            key.clone(),
            indicator,
            context.clone(),
            params,
            &candles,
            &flow,
            self.config.history_capacity,
        )?;
        let results = instance.history().len();

        let mut tables = self.tables.write();
        if tables.instances.contains_key(&key) {
            debug!(key = %key, "concurrent activation finished first, keeping it");
            return Ok(key);
        }
        tables.insert(key.clone(), Arc::new(InstanceSlot::new(instance)));
        drop(tables);

        info!(key = %key, candles = candles.len(), results, "indicator activated");
        Ok(key)
    }

    /// Re-initialize an instance under new parameters, keeping its key.
    ///
    /// History is fetched without any lock held; the rebuild and swap happen
    /// under the instance's own lock so live updates wait rather than race.
    /// Returns `false` if the key is not active.
    pub async fn update_params(&self, key: &str, params: &Params) -> Result<bool, EngineError> {
        let Some(slot) = self.slot(key) else {
            debug!(key, "update_params on unknown instance");
            return Ok(false);
        };
        let (indicator, params) = self.prepare(&slot.indicator_id, params)?;
        let candles = self.fetch_candles(&slot.context).await;
        let flow = load_order_flow(&self.sources, &self.config, indicator.definition(), &slot.context, &candles).await;

        let mut current = slot.instance.lock();
        let mut rebuilt = build_instance(
            key.to_string(),
            indicator,
            slot.context.clone(),
            params,
            &candles,
            &flow,
            self.config.history_capacity,
        )?;
        rebuilt.inherit(&current);
        *current = rebuilt;
        info!(key, params = %current.params().canonical(), "parameters updated");
        Ok(true)
    }

    /// Remove one instance. Returns whether it existed.
    pub fn deactivate(&self, key: &str) -> bool {
        let removed = self.tables.write().remove(key).is_some();
        if removed {
            info!(key, "indicator deactivated");
        }
        removed
    }

    /// Remove every instance on `context`. Returns how many were removed.
    pub fn clear_context(&self, context: &ContextKey) -> usize {
        let mut tables = self.tables.write();
        let keys = tables.by_context.get(context).cloned().unwrap_or_default();
        for key in &keys {
            tables.remove(key);
        }
        drop(tables);
        info!(context = %context, removed = keys.len(), "context cleared");
        keys.len()
    }

    /// Stateless bulk calculation over `candles`.
    pub fn calculate(&self, indicator_id: &str, candles: &[Candle], params: &Params) -> Result<IndicatorValues, EngineError> {
        let (indicator, params) = self.prepare(indicator_id, params)?;
        let required = indicator.min_required_candles(&params);
        if candles.len() < required {
            return Err(EngineError::InsufficientData {
                required,
                available: candles.len(),
            });
        }
        Ok(indicator.calculate(candles, &params)?)
    }

    /// Per-candle results for `candles` using the same warm-up and replay as activation.
    ///
    /// No instance is registered and no order flow is loaded.
    pub fn calculate_historical(
        &self,
        indicator_id: &str,
        candles: &[Candle],
        params: &Params,
    ) -> Result<Vec<IndicatorResult>, EngineError> {
        let (indicator, params) = self.prepare(indicator_id, params)?;
        let required = indicator.min_required_candles(&params);
        if candles.len() < required {
            return Err(EngineError::InsufficientData {
                required,
                available: candles.len(),
            });
        }
        let instance = build_instance(
            String::new(),
            indicator,
            ContextKey::new("", "", ""),
            params,
            candles,
            &OrderFlow::default(),
            candles.len().max(1),
        )?;
        Ok(instance.history().to_vec())
    }

    async fn fetch_candles(&self, context: &ContextKey) -> Vec<Candle> {
        let fetched = self
            .sources
            .candles
            .last_n_candles(&context.provider, &context.symbol, &context.interval, self.config.warmup_lookback)
            .await;
        match fetched {
            Ok(mut candles) => {
                candles.sort_by_key(|c| c.open_time);
                candles
            }
            Err(e) => {
                warn!(context = %context, error = %e, "candle history unavailable, activating without backfill");
                Vec::new()
            }
        }
    }
}
