//! Concrete indicators implementing the [`taflow_core::Indicator`] contract.
//!
//! Most studies override `on_init`/`on_new_candle` with O(1) carried state;
//! `hma` and `macd` rely on the default window-recalculation path.

mod common;

pub mod big_trades;
pub mod bollinger;
pub mod book_imbalance;
pub mod ema;
pub mod engulfing_rsi;
pub mod hma;
pub mod ma_cross;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod supertrend;

pub use big_trades::BigTradesIndicator;
pub use bollinger::BollingerIndicator;
pub use book_imbalance::BookImbalanceIndicator;
pub use ema::EmaIndicator;
pub use engulfing_rsi::EngulfingRsiIndicator;
pub use hma::HmaIndicator;
pub use ma_cross::MaCrossIndicator;
pub use macd::MacdIndicator;
pub use obv::ObvIndicator;
pub use rsi::RsiIndicator;
pub use sma::SmaIndicator;
pub use supertrend::SuperTrendIndicator;

use std::sync::Arc;
use taflow_core::{Indicator, IndicatorRegistry};

/// Every built-in indicator.
pub fn builtin() -> Vec<Arc<dyn Indicator>> {
    vec![
        Arc::new(SmaIndicator::new()),
        Arc::new(EmaIndicator::new()),
        Arc::new(RsiIndicator::new()),
        Arc::new(BollingerIndicator::new()),
        Arc::new(SuperTrendIndicator::new()),
        Arc::new(ObvIndicator::new()),
        Arc::new(MaCrossIndicator::new()),
        Arc::new(HmaIndicator::new()),
        Arc::new(MacdIndicator::new()),
        Arc::new(BigTradesIndicator::new()),
        Arc::new(EngulfingRsiIndicator::new()),
        Arc::new(BookImbalanceIndicator::new()),
    ]
}

/// A registry holding [`builtin`].
pub fn default_registry() -> IndicatorRegistry {
    IndicatorRegistry::new(builtin())
}
