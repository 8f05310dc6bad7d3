use rust_decimal::Decimal;

/// `fast` crossed above `slow`: previously at or below, now strictly above.
pub fn crossover(prev_fast: Decimal, prev_slow: Decimal, fast: Decimal, slow: Decimal) -> bool {
    prev_fast <= prev_slow && fast > slow
}

/// `fast` crossed below `slow`: previously at or above, now strictly below.
pub fn crossunder(prev_fast: Decimal, prev_slow: Decimal, fast: Decimal, slow: Decimal) -> bool {
    prev_fast >= prev_slow && fast < slow
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_crossover_is_strict() {
        assert!(crossover(dec!(1), dec!(2), dec!(3), dec!(2)));
        assert!(crossover(dec!(2), dec!(2), dec!(3), dec!(2)));
        assert!(!crossover(dec!(1), dec!(2), dec!(2), dec!(2)));
        assert!(!crossover(dec!(3), dec!(2), dec!(4), dec!(2)));
    }

    #[test]
    fn test_crossunder_is_strict() {
        assert!(crossunder(dec!(3), dec!(2), dec!(1), dec!(2)));
        assert!(crossunder(dec!(2), dec!(2), dec!(1), dec!(2)));
        assert!(!crossunder(dec!(3), dec!(2), dec!(2), dec!(2)));
    }
}
