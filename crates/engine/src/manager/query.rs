use super::InstanceManager;
use crate::instance::InstanceSnapshot;
use crate::stats::ManagerStats;
use taflow_core::*;

impl InstanceManager {
    pub fn instance(&self, key: &str) -> Option<InstanceSnapshot> {
        self.slot(key).map(|slot| slot.instance.lock().snapshot())
    }

    /// Closed-candle results, oldest first; the most recent `limit` when given.
    pub fn history(&self, key: &str, limit: Option<usize>) -> Option<Vec<IndicatorResult>> {
        let slot = self.slot(key)?;
        let instance = slot.instance.lock();
        Some(match limit {
            Some(n) => instance.history().last_n(n),
            None => instance.history().to_vec(),
        })
    }

    pub fn latest_result(&self, key: &str) -> Option<IndicatorResult> {
        let slot = self.slot(key)?;
        let latest = slot.instance.lock().latest().cloned();
        latest
    }

    pub fn instances_for_context(&self, context: &ContextKey) -> Vec<InstanceSnapshot> {
        self.slots_in_context(context)
            .into_iter()
            .map(|(_, slot)| slot.instance.lock().snapshot())
            .collect()
    }

    pub fn instances_for_indicator(&self, indicator_id: &str) -> Vec<InstanceSnapshot> {
        self.slots_where(|s| s.indicator_id == indicator_id)
            .into_iter()
            .map(|(_, slot)| slot.instance.lock().snapshot())
            .collect()
    }

    /// Instances on `provider`/`symbol` across every interval.
    pub fn instances_for_symbol(&self, provider: &str, symbol: &str) -> Vec<InstanceSnapshot> {
        self.slots_for_symbol(provider, symbol)
            .into_iter()
            .map(|(_, slot)| slot.instance.lock().snapshot())
            .collect()
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.tables.read().instances.contains_key(key)
    }

    pub fn has_context(&self, context: &ContextKey) -> bool {
        self.tables.read().by_context.contains_key(context)
    }

    pub fn stats(&self) -> ManagerStats {
        let tables = self.tables.read();
        let mut stats = ManagerStats {
            total_contexts: tables.by_context.len(),
            ..ManagerStats::default()
        };
        for slot in tables.instances.values() {
            stats.record(&slot.indicator_id, &slot.context.symbol, &slot.context.interval);
        }
        stats
    }

    pub fn definitions(&self) -> Vec<IndicatorDefinition> {
        self.registry.definitions()
    }
}
