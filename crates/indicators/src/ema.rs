use crate::sma::sma;
use crate::{div, round};
use rust_decimal::Decimal;

/// EMA smoothing factor `2 / (period + 1)`.
pub fn ema_multiplier(period: usize) -> Decimal {
    div(Decimal::TWO, Decimal::from(period) + Decimal::ONE)
}

/// One EMA step from the previous average.
pub fn ema_step(prev: Decimal, value: Decimal, multiplier: Decimal) -> Decimal {
    round((value - prev) * multiplier + prev)
}

/// Exponential Moving Average.
///
/// Seeded with the SMA of the first `period` values, then smoothed forward
/// over the remainder. With exactly `period` values it equals the SMA.
pub fn ema(values: &[Decimal], period: usize) -> Decimal {
    if period == 0 || values.len() < period {
        return Decimal::ZERO;
    }
    let multiplier = ema_multiplier(period);
    let seed = sma(&values[..period], period);
    values[period..]
        .iter()
        .fold(seed, |prev, v| ema_step(prev, *v, multiplier))
}

/// One Wilder step: `value / period + prev * (period - 1) / period`.
pub fn rma_step(prev: Decimal, value: Decimal, period: usize) -> Decimal {
    let p = Decimal::from(period);
    div(value, p) + div(prev * (p - Decimal::ONE), p)
}

/// Wilder's moving average (RMA), seeded with the SMA of the first `period` values.
pub fn rma(values: &[Decimal], period: usize) -> Decimal {
    if period == 0 || values.len() < period {
        return Decimal::ZERO;
    }
    let seed = sma(&values[..period], period);
    values[period..]
        .iter()
        .fold(seed, |prev, v| rma_step(prev, *v, period))
}
