use crate::{div, tail};
use rust_decimal::Decimal;

/// Weighted Moving Average with linear weights `1..=period`, newest heaviest.
pub fn wma(values: &[Decimal], period: usize) -> Decimal {
    let Some(window) = tail(values, period) else {
        return Decimal::ZERO;
    };
    let weighted: Decimal = window
        .iter()
        .enumerate()
        .map(|(i, v)| *v * Decimal::from(i + 1))
        .sum();
    let weights = Decimal::from(period * (period + 1) / 2);
    div(weighted, weights)
}

/// Hull Moving Average (approximation).
///
/// Returns the de-lagged value `2 * WMA(period / 2) - WMA(period)` without the
/// final `sqrt(period)` smoothing pass of the textbook HMA.
pub fn hma(values: &[Decimal], period: usize) -> Decimal {
    let half = period / 2;
    if half == 0 || values.len() < period {
        return Decimal::ZERO;
    }
    Decimal::TWO * wma(values, half) - wma(values, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wma_weights_recent_highest() {
        // (1*1 + 2*2 + 3*3) / 6
        assert_eq!(wma(&[dec!(1), dec!(2), dec!(3)], 3), dec!(2.33333333));
        assert_eq!(wma(&[dec!(5), dec!(1), dec!(2), dec!(3)], 3), dec!(2.33333333));
    }

    #[test]
    fn test_wma_insufficient() {
        assert_eq!(wma(&[dec!(1)], 2), Decimal::ZERO);
    }

    #[test]
    fn test_hma_uses_integer_half() {
        let values = [dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        // period 5 -> half 2: wma2 = (4 + 10)/3 = 4.66666667, wma5 = 55/15 = 3.66666667
        assert_eq!(hma(&values, 5), dec!(5.66666667));
        assert_eq!(hma(&values, 1), Decimal::ZERO);
    }
}
