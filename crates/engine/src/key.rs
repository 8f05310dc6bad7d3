use sha2::{Digest, Sha256};
use taflow_core::{ContextKey, Params};

/// Hex digits of the parameter hash embedded in instance keys.
const HASH_BYTES: usize = 8;

/// Stable hash of a parameter map: SHA-256 over its canonical rendering, truncated.
pub fn params_hash(params: &Params) -> String {
    let digest = Sha256::digest(params.canonical().as_bytes());
    hex::encode(&digest[..HASH_BYTES])
}

/// Deterministic instance identity: `provider_symbol_interval_indicator_hash`.
///
/// `params` should already be resolved against the indicator's schema so that
/// omitted defaults and explicit defaults map to the same key.
pub fn instance_key(context: &ContextKey, indicator_id: &str, params: &Params) -> String {
    format!("{}_{}_{}", context, indicator_id, params_hash(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ContextKey {
        ContextKey::new("binance", "BTCUSDT", "1m")
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = Params::new().with("period", 14i64).with("k", 2i64);
        let b = Params::new().with("k", 2i64).with("period", 14i64);
        assert_eq!(instance_key(&ctx(), "rsi", &a), instance_key(&ctx(), "rsi", &b));
        assert!(instance_key(&ctx(), "rsi", &a).starts_with("binance_BTCUSDT_1m_rsi_"));
    }

    #[test]
    fn test_distinct_params_distinct_keys() {
        let a = Params::new().with("period", 14i64);
        let b = Params::new().with("period", 21i64);
        assert_ne!(instance_key(&ctx(), "rsi", &a), instance_key(&ctx(), "rsi", &b));
        assert_ne!(instance_key(&ctx(), "rsi", &a), instance_key(&ctx(), "sma", &a));
    }

    #[test]
    fn test_hash_is_stable_across_runs() {
        // pinned so that keys survive restarts
        assert_eq!(params_hash(&Params::new()), "e3b0c44298fc1c14");
        assert_eq!(
            instance_key(&ctx(), "sma", &Params::new().with("period", 3i64)),
            "binance_BTCUSDT_1m_sma_4e4e0da1154e0242"
        );
    }
}
