use crate::div;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Wilder-smoothed average gain and loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WilderAverages {
    pub avg_gain: Decimal,
    pub avg_loss: Decimal,
}

/// Average gain/loss after consuming every value.
///
/// The first `period` changes are averaged plainly, later changes use the
/// Wilder recurrence. Needs at least `period + 1` values.
pub fn rsi_seed(values: &[Decimal], period: usize) -> Option<WilderAverages> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let changes: Vec<Decimal> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = changes.split_at(period);

    let p = Decimal::from(period);
    let gains: Decimal = seed.iter().filter(|c| c.is_sign_positive()).sum();
    let losses: Decimal = seed.iter().filter(|c| c.is_sign_negative()).map(|c| c.abs()).sum();
    let initial = WilderAverages {
        avg_gain: div(gains, p),
        avg_loss: div(losses, p),
    };
    Some(rest.iter().fold(initial, |avg, change| rsi_step(avg, *change, period)))
}

/// Apply one price change to the Wilder averages.
pub fn rsi_step(prev: WilderAverages, change: Decimal, period: usize) -> WilderAverages {
    let p = Decimal::from(period);
    let gain = change.max(Decimal::ZERO);
    let loss = (-change).max(Decimal::ZERO);
    WilderAverages {
        avg_gain: div(prev.avg_gain * (p - Decimal::ONE) + gain, p),
        avg_loss: div(prev.avg_loss * (p - Decimal::ONE) + loss, p),
    }
}

/// RSI from smoothed averages; 100 when the average loss is exactly zero.
pub fn rsi_from_averages(averages: WilderAverages) -> Decimal {
    if averages.avg_loss.is_zero() {
        return dec!(100);
    }
    let rs = div(averages.avg_gain, averages.avg_loss);
    dec!(100) - div(dec!(100), Decimal::ONE + rs)
}

/// Relative Strength Index; `None` until `period + 1` values are available.
pub fn rsi(values: &[Decimal], period: usize) -> Option<Decimal> {
    rsi_seed(values, period).map(rsi_from_averages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Decimal> {
        vec![
            dec!(44), dec!(44.34), dec!(44.09), dec!(43.61), dec!(44.33),
            dec!(44.83), dec!(45.10), dec!(45.42), dec!(45.84), dec!(46.08),
            dec!(45.89), dec!(46.03), dec!(45.61), dec!(46.28), dec!(46.28),
            dec!(46.00), dec!(46.03), dec!(46.41), dec!(46.22), dec!(45.64),
        ]
    }

    #[test]
    fn test_rsi_basic() {
        let value = rsi(&sample()[..15], 14).unwrap();
        assert!(value > Decimal::ZERO && value < dec!(100));
    }

    #[test]
    fn test_rsi_strictly_increasing_is_100() {
        let prices: Vec<Decimal> = (1..=15).map(Decimal::from).collect();
        assert_eq!(rsi(&prices, 14), Some(dec!(100)));
    }

    #[test]
    fn test_rsi_undefined_when_insufficient() {
        let prices: Vec<Decimal> = (1..=14).map(Decimal::from).collect();
        assert_eq!(rsi(&prices, 14), None);
        assert_eq!(rsi(&prices, 0), None);
    }

    #[test]
    fn test_rsi_never_exceeds_100() {
        let mut prices: Vec<Decimal> = (1..=15).map(Decimal::from).collect();
        prices.push(dec!(14));
        prices.extend((15..40).map(Decimal::from));
        for end in 15..=prices.len() {
            let v = rsi(&prices[..end], 14).unwrap();
            assert!(v <= dec!(100));
            assert!(v >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_step_matches_bulk() {
        let prices = sample();
        let mut avg = rsi_seed(&prices[..15], 14).unwrap();
        for w in prices[14..].windows(2) {
            avg = rsi_step(avg, w[1] - w[0], 14);
        }
        assert_eq!(rsi_from_averages(avg), rsi(&prices, 14).unwrap());
    }
}
