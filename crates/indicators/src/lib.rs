//! Fixed-point technical indicator functions.
//!
//! Every function is pure and total: malformed input (empty or mismatched
//! slices, zero periods) yields a neutral zero rather than a panic. RSI and
//! SuperTrend are the exceptions and return `None` while not yet computable,
//! so callers can tell "no value yet" from "computed to zero".
//!
//! All divisions go through [`div`], which rounds half-up to [`SCALE`]
//! fractional digits.

pub mod atr;
pub mod bollinger;
pub mod cross;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod supertrend;
pub mod wma;

pub use atr::{atr, true_range};
pub use bollinger::{bollinger, decimal_sqrt, std_dev, BollingerBands};
pub use cross::{crossover, crossunder};
pub use ema::{ema, ema_multiplier, ema_step, rma, rma_step};
pub use macd::{macd, MacdOutput};
pub use obv::{obv, obv_step};
pub use rsi::{rsi, rsi_from_averages, rsi_seed, rsi_step, WilderAverages};
pub use sma::sma;
pub use supertrend::{supertrend, SuperTrendPoint, DOWNTREND, UPTREND};
pub use wma::{hma, wma};

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept by every division.
pub const SCALE: u32 = 8;

/// Round half-up to [`SCALE`] digits.
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator` rounded half-up to [`SCALE`] digits; zero when dividing by zero.
pub fn div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    round(numerator / denominator)
}

/// The last `period` elements of `values`, or `None` if there are fewer.
pub(crate) fn tail(values: &[Decimal], period: usize) -> Option<&[Decimal]> {
    if period == 0 || values.len() < period {
        None
    } else {
        Some(&values[values.len() - period..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_div_rounds_half_up() {
        assert_eq!(div(dec!(2), dec!(3)), dec!(0.66666667));
        assert_eq!(div(dec!(1), dec!(3)), dec!(0.33333333));
        assert_eq!(div(dec!(0.000000005), dec!(1)), dec!(0.00000001));
        assert_eq!(div(dec!(-0.000000005), dec!(1)), dec!(-0.00000001));
    }

    #[test]
    fn test_div_by_zero_is_neutral() {
        assert_eq!(div(dec!(5), Decimal::ZERO), Decimal::ZERO);
    }
}
