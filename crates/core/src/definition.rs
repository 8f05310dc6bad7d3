use crate::models::DataKind;
use crate::params::ParamSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Broad grouping used by pickers and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    MovingAverage,
    Oscillator,
    Volatility,
    Trend,
    Volume,
    OrderFlow,
    Pattern,
}

/// How a series should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Line,
    Histogram,
    Band,
    Markers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesStyle {
    /// Key into `IndicatorResult::values` (or `auxiliary` for markers).
    pub key: String,
    pub label: String,
    pub kind: SeriesKind,
    pub color: String,
}

impl SeriesStyle {
    pub fn new(key: &str, label: &str, kind: SeriesKind, color: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            color: color.to_string(),
        }
    }
}

/// Visualization metadata: whether the indicator draws over price and its series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visualization {
    pub overlay: bool,
    pub series: Vec<SeriesStyle>,
}

/// Immutable description of an indicator, registered once and shared by all instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: IndicatorCategory,
    pub params: Vec<ParamSpec>,
    pub data_kinds: BTreeSet<DataKind>,
    /// Load historical trades/order books on activation.
    pub preload_order_flow: bool,
    pub visualization: Visualization,
}

impl IndicatorDefinition {
    /// A candle-only definition with no parameters; refine with the builder methods.
    pub fn new(id: &str, name: &str, category: IndicatorCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category,
            params: Vec::new(),
            data_kinds: BTreeSet::from([DataKind::Candle]),
            preload_order_flow: false,
            visualization: Visualization::default(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn consumes(mut self, kind: DataKind) -> Self {
        self.data_kinds.insert(kind);
        self
    }

    pub fn preload_order_flow(mut self) -> Self {
        self.preload_order_flow = true;
        self
    }

    pub fn overlay(mut self) -> Self {
        self.visualization.overlay = true;
        self
    }

    pub fn series(mut self, style: SeriesStyle) -> Self {
        self.visualization.series.push(style);
        self
    }

    pub fn needs_trades(&self) -> bool {
        self.data_kinds.iter().any(DataKind::is_trade)
    }

    pub fn needs_order_books(&self) -> bool {
        self.data_kinds.contains(&DataKind::OrderBook)
    }
}
