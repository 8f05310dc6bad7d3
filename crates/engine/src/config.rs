use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine tuning knobs. Every field has a default, so partial TOML files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Results retained per instance; oldest evicted first.
    pub history_capacity: usize,
    /// Candles requested from history on activation.
    pub warmup_lookback: usize,
    /// Trades requested per live-provider batch.
    pub trade_batch_limit: usize,
    /// Upper bound on live-provider trade batches per activation.
    pub max_trade_batches: usize,
    /// Levels requested when fetching a live order-book snapshot.
    pub order_book_depth: usize,
    /// Fail concurrent updates of one instance instead of serializing them.
    pub detect_reentrancy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 5000,
            warmup_lookback: 5000,
            trade_batch_limit: 1000,
            max_trade_batches: 10,
            order_book_depth: 20,
            detect_reentrancy: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = toml::from_str(raw).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.history_capacity == 0 {
            return Err(EngineError::Config("history_capacity must be positive".into()));
        }
        if self.trade_batch_limit == 0 {
            return Err(EngineError::Config("trade_batch_limit must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("history_capacity = 100\ndetect_reentrancy = false\n").unwrap();
        assert_eq!(config.history_capacity, 100);
        assert!(!config.detect_reentrancy);
        assert_eq!(config.warmup_lookback, 5000);
        assert_eq!(config.order_book_depth, 20);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EngineConfig::from_toml_str("history_capacity = 0").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
