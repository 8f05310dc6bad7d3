use crate::ema::ema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// MACD output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

/// MACD line `EMA(fast) - EMA(slow)`.
///
/// No EMA-of-MACD history is kept, so the signal line equals the MACD line
/// and the histogram is always zero. `_signal_period` is accepted for
/// interface compatibility only.
pub fn macd(values: &[Decimal], fast: usize, slow: usize, _signal_period: usize) -> MacdOutput {
    if fast == 0 || slow == 0 || values.len() < slow.max(fast) {
        return MacdOutput::default();
    }
    let line = ema(values, fast) - ema(values, slow);
    MacdOutput {
        macd: line,
        signal: line,
        histogram: Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_needs_slow_period_data() {
        let values: Vec<Decimal> = (1..=4).map(Decimal::from).collect();
        assert_eq!(macd(&values, 3, 5, 3), MacdOutput::default());
    }

    #[test]
    fn test_macd_signal_mirrors_line() {
        let values: Vec<Decimal> = (1..=40).map(Decimal::from).collect();
        let out = macd(&values, 12, 26, 9);
        assert!(out.macd > Decimal::ZERO);
        assert_eq!(out.signal, out.macd);
        assert_eq!(out.histogram, Decimal::ZERO);
    }
}
