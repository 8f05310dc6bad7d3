use crate::{div, tail};
use rust_decimal::Decimal;

/// Simple Moving Average: arithmetic mean of the last `period` values.
pub fn sma(values: &[Decimal], period: usize) -> Decimal {
    match tail(values, period) {
        Some(window) => div(window.iter().sum(), Decimal::from(period)),
        None => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sma_basic() {
        assert_eq!(sma(&[dec!(10), dec!(20), dec!(30)], 3), dec!(20));
        assert_eq!(sma(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)], 3), dec!(4));
    }

    #[test]
    fn test_sma_insufficient() {
        assert_eq!(sma(&[dec!(1), dec!(2)], 3), Decimal::ZERO);
        assert_eq!(sma(&[dec!(1), dec!(2)], 0), Decimal::ZERO);
    }

    #[test]
    fn test_sma_rounds_to_scale() {
        assert_eq!(sma(&[dec!(1), dec!(1), dec!(2)], 3), dec!(1.33333333));
    }
}
