use crate::div;
use rust_decimal::Decimal;

/// True Range: `max(high - low, |high - prev_close|, |low - prev_close|)`.
pub fn true_range(high: Decimal, low: Decimal, prev_close: Decimal) -> Decimal {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// Average True Range: plain mean of the last `period` true ranges.
///
/// Each true range needs the previous close, so `period + 1` samples are
/// required. Slices must have equal lengths; anything else yields zero.
pub fn atr(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal], period: usize) -> Decimal {
    let n = closes.len();
    if period == 0 || highs.len() != n || lows.len() != n || n < period + 1 {
        return Decimal::ZERO;
    }
    let sum: Decimal = (n - period..n)
        .map(|i| true_range(highs[i], lows[i], closes[i - 1]))
        .sum();
    div(sum, Decimal::from(period))
}
