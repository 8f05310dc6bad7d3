use rust_decimal::Decimal;
use std::cmp::Ordering;

/// One On-Balance Volume step.
pub fn obv_step(prev_obv: Decimal, prev_close: Decimal, close: Decimal, volume: Decimal) -> Decimal {
    match close.cmp(&prev_close) {
        Ordering::Greater => prev_obv + volume,
        Ordering::Less => prev_obv - volume,
        Ordering::Equal => prev_obv,
    }
}

/// On-Balance Volume: volume added on up-closes, subtracted on down-closes.
pub fn obv(closes: &[Decimal], volumes: &[Decimal]) -> Decimal {
    if closes.len() != volumes.len() {
        return Decimal::ZERO;
    }
    closes
        .windows(2)
        .zip(volumes.iter().skip(1))
        .fold(Decimal::ZERO, |acc, (w, v)| obv_step(acc, w[0], w[1], *v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_obv_signed_volume() {
        let closes = [dec!(10), dec!(11), dec!(11), dec!(9), dec!(12)];
        let volumes = [dec!(100), dec!(5), dec!(7), dec!(3), dec!(2)];
        // +5, flat, -3, +2
        assert_eq!(obv(&closes, &volumes), dec!(4));
    }

    #[test]
    fn test_obv_degenerate() {
        assert_eq!(obv(&[], &[]), Decimal::ZERO);
        assert_eq!(obv(&[dec!(1)], &[dec!(1)]), Decimal::ZERO);
        assert_eq!(obv(&[dec!(1), dec!(2)], &[dec!(1)]), Decimal::ZERO);
    }
}
