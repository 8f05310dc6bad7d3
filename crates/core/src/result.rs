use crate::models::Candle;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named numeric outputs of one calculation step, e.g. `{"sma": 50000}`.
pub type IndicatorValues = BTreeMap<String, Decimal>;

/// Indicator-specific visualization data (markers, shapes, counts).
pub type Auxiliary = BTreeMap<String, serde_json::Value>;

/// The output emitted for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub timestamp: DateTime<Utc>,
    pub values: IndicatorValues,
    /// The originating candle, present only for closed-candle results.
    pub candle: Option<Candle>,
    pub auxiliary: Auxiliary,
}

impl IndicatorResult {
    /// Result of a closed candle; timestamped with the candle's open time.
    pub fn for_candle(candle: &Candle, values: IndicatorValues, auxiliary: Auxiliary) -> Self {
        Self {
            timestamp: candle.open_time,
            values,
            candle: Some(candle.clone()),
            auxiliary,
        }
    }

    /// Result of a tick, trade or order-book event.
    pub fn at(timestamp: DateTime<Utc>, values: IndicatorValues, auxiliary: Auxiliary) -> Self {
        Self {
            timestamp,
            values,
            candle: None,
            auxiliary,
        }
    }

    /// True when neither values nor auxiliary data were produced.
    /// Transport layers suppress broadcasting such results.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.auxiliary.is_empty()
    }

    pub fn value(&self, name: &str) -> Option<Decimal> {
        self.values.get(name).copied()
    }
}
