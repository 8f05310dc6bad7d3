use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate counts over the live instance table, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStats {
    pub total_instances: usize,
    pub total_contexts: usize,
    pub by_indicator: BTreeMap<String, usize>,
    pub by_symbol: BTreeMap<String, usize>,
    pub by_interval: BTreeMap<String, usize>,
}

impl ManagerStats {
    pub(crate) fn record(&mut self, indicator_id: &str, symbol: &str, interval: &str) {
        self.total_instances += 1;
        *self.by_indicator.entry(indicator_id.to_string()).or_default() += 1;
        *self.by_symbol.entry(symbol.to_string()).or_default() += 1;
        *self.by_interval.entry(interval.to_string()).or_default() += 1;
    }
}
