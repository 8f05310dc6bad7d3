use crate::definition::IndicatorDefinition;
use crate::traits::Indicator;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only catalogue of indicator implementations, keyed by id.
///
/// Populated once at construction and shared behind an `Arc`; there is no
/// way to add or remove entries afterwards.
#[derive(Clone, Default)]
pub struct IndicatorRegistry {
    indicators: BTreeMap<String, Arc<dyn Indicator>>,
}

impl IndicatorRegistry {
    /// Build a registry. A later indicator with an already-registered id replaces the earlier one.
    pub fn new(indicators: impl IntoIterator<Item = Arc<dyn Indicator>>) -> Self {
        let mut map = BTreeMap::new();
        for indicator in indicators {
            let id = indicator.id().to_string();
            if map.insert(id.clone(), indicator).is_some() {
                tracing::warn!(indicator = %id, "duplicate indicator id, keeping the last registration");
            }
        }
        Self { indicators: map }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Indicator>> {
        self.indicators.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.indicators.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.indicators.keys().map(String::as_str)
    }

    /// Definitions in id order.
    pub fn definitions(&self) -> Vec<IndicatorDefinition> {
        self.indicators.values().map(|i| i.definition().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

impl std::fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorRegistry")
            .field("indicators", &self.indicators.keys().collect::<Vec<_>>())
            .finish()
    }
}
