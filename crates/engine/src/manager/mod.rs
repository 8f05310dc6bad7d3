//! The instance manager: activation with historical backfill, live updates,
//! deactivation and lookup across every active indicator instance.
//!
//! Locking: one `RwLock` guards the instance table and both indexes (by
//! context and by provider/symbol) together, so they change atomically. Each instance sits behind its own
//! `Mutex`. The table lock is only held for lookups and inserts, never while
//! an instance is locked or while history is being fetched.

mod activation;
mod live;
mod query;

pub use live::UpdateBatch;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::instance::IndicatorInstance;
use crate::sources::DataSources;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use taflow_core::*;

/// Owns every active indicator instance.
pub struct InstanceManager {
    registry: Arc<IndicatorRegistry>,
    sources: DataSources,
    config: EngineConfig,
    tables: RwLock<InstanceTables>,
}

/// Instance keys per provider, then per symbol, across intervals.
type SymbolIndex = HashMap<String, HashMap<String, BTreeSet<String>>>;

#[derive(Default)]
struct InstanceTables {
    instances: HashMap<String, Arc<InstanceSlot>>,
    by_context: HashMap<ContextKey, BTreeSet<String>>,
    by_symbol: SymbolIndex,
}

impl InstanceTables {
    fn insert(&mut self, key: String, slot: Arc<InstanceSlot>) {
        let context = &slot.context;
        self.by_context
            .entry(context.clone())
            .or_default()
            .insert(key.clone());
        self.by_symbol
            .entry(context.provider.clone())
            .or_default()
            .entry(context.symbol.clone())
            .or_default()
            .insert(key.clone());
        self.instances.insert(key, slot);
    }

    fn remove(&mut self, key: &str) -> Option<Arc<InstanceSlot>> {
        let slot = self.instances.remove(key)?;
        let context = &slot.context;
        if let Some(keys) = self.by_context.get_mut(context) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_context.remove(context);
            }
        }
        if let Some(symbols) = self.by_symbol.get_mut(&context.provider) {
            if let Some(keys) = symbols.get_mut(&context.symbol) {
                keys.remove(key);
                if keys.is_empty() {
                    symbols.remove(&context.symbol);
                }
            }
            if symbols.is_empty() {
                self.by_symbol.remove(&context.provider);
            }
        }
        Some(slot)
    }

    fn resolve<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> Vec<(String, Arc<InstanceSlot>)> {
        keys.into_iter()
            .filter_map(|key| self.instances.get(key).map(|slot| (key.clone(), slot.clone())))
            .collect()
    }

    fn slots_in_context(&self, context: &ContextKey) -> Vec<(String, Arc<InstanceSlot>)> {
        self.resolve(self.by_context.get(context).into_iter().flatten())
    }

    fn slots_for_symbol(&self, provider: &str, symbol: &str) -> Vec<(String, Arc<InstanceSlot>)> {
        let keys = self.by_symbol.get(provider).and_then(|symbols| symbols.get(symbol));
        self.resolve(keys.into_iter().flatten())
    }
}

/// An instance plus the immutable facts needed to route events to it without locking.
struct InstanceSlot {
    context: ContextKey,
    indicator_id: String,
    kinds: BTreeSet<DataKind>,
    busy: AtomicBool,
    instance: Mutex<IndicatorInstance>,
}

impl InstanceSlot {
    fn new(instance: IndicatorInstance) -> Self {
        Self {
            context: instance.context().clone(),
            indicator_id: instance.indicator_id().to_string(),
            kinds: instance.indicator().required_data_types(),
            busy: AtomicBool::new(false),
            instance: Mutex::new(instance),
        }
    }

    fn wants_trades(&self) -> bool {
        self.kinds.iter().any(DataKind::is_trade)
    }

    fn wants_order_books(&self) -> bool {
        self.kinds.contains(&DataKind::OrderBook)
    }

    /// Mark the slot busy for the duration of a live update.
    fn enter(&self, key: &str, detect: bool) -> Result<Option<BusyGuard<'_>>, EngineError> {
        if !detect {
            return Ok(None);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::error!(key, "re-entrant update detected");
            return Err(EngineError::ReentrantUpdate(key.to_string()));
        }
        Ok(Some(BusyGuard(&self.busy)))
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl InstanceManager {
    pub fn new(registry: Arc<IndicatorRegistry>, sources: DataSources, config: EngineConfig) -> Self {
        Self {
            registry,
            sources,
            config,
            tables: RwLock::new(InstanceTables::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IndicatorRegistry> {
        &self.registry
    }

    /// Look up the indicator and resolve `params` against its schema.
    fn prepare(&self, indicator_id: &str, params: &Params) -> Result<(Arc<dyn Indicator>, Params), EngineError> {
        let indicator = self
            .registry
            .get(indicator_id)
            .ok_or_else(|| EngineError::UnknownIndicator(indicator_id.to_string()))?;
        let params = params.resolve(&indicator.definition().params)?;
        indicator.validate(&params)?;
        Ok((indicator, params))
    }

    fn slot(&self, key: &str) -> Option<Arc<InstanceSlot>> {
        self.tables.read().instances.get(key).cloned()
    }

    fn slots_in_context(&self, context: &ContextKey) -> Vec<(String, Arc<InstanceSlot>)> {
        self.tables.read().slots_in_context(context)
    }

    /// Instances on `provider`/`symbol` across intervals, in key order.
    fn slots_for_symbol(&self, provider: &str, symbol: &str) -> Vec<(String, Arc<InstanceSlot>)> {
        self.tables.read().slots_for_symbol(provider, symbol)
    }

    fn slots_where(&self, pred: impl Fn(&InstanceSlot) -> bool) -> Vec<(String, Arc<InstanceSlot>)> {
        let tables = self.tables.read();
        let mut slots: Vec<_> = tables
            .instances
            .iter()
            .filter(|(_, slot)| pred(slot))
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        slots
    }
}

impl std::fmt::Debug for InstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceManager")
            .field("registry", &self.registry)
            .field("sources", &self.sources)
            .field("config", &self.config)
            .field("instances", &self.tables.read().instances.len())
            .finish()
    }
}
