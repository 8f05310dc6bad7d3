use crate::sma::sma;
use crate::{div, tail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Newton iterations used by [`decimal_sqrt`].
pub const SQRT_ITERATIONS: usize = 10;

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
}

/// Newton's method square root, seeded with `value / 2`.
///
/// Runs exactly [`SQRT_ITERATIONS`] iterations with no convergence check, so
/// results are reproducible bit for bit. Non-positive input yields zero.
pub fn decimal_sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut guess = div(value, Decimal::TWO);
    for _ in 0..SQRT_ITERATIONS {
        if guess.is_zero() {
            break;
        }
        guess = div(guess + div(value, guess), Decimal::TWO);
    }
    guess
}

/// Population standard deviation of the last `period` values.
pub fn std_dev(values: &[Decimal], period: usize) -> Decimal {
    let Some(window) = tail(values, period) else {
        return Decimal::ZERO;
    };
    let mean = sma(window, period);
    let squares: Decimal = window
        .iter()
        .map(|v| {
            let diff = *v - mean;
            diff * diff
        })
        .sum();
    decimal_sqrt(div(squares, Decimal::from(period)))
}

/// Bollinger Bands: SMA middle band, `k` standard deviations either side.
pub fn bollinger(values: &[Decimal], period: usize, k: Decimal) -> BollingerBands {
    if tail(values, period).is_none() {
        return BollingerBands::default();
    }
    let middle = sma(values, period);
    let offset = k * std_dev(values, period);
    BollingerBands {
        upper: middle + offset,
        middle,
        lower: middle - offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bollinger_basic() {
        let out = bollinger(&[dec!(10), dec!(11), dec!(12)], 3, Decimal::TWO);
        assert_eq!(out.middle, dec!(11));
        assert!(out.upper > out.middle);
        assert!(out.lower < out.middle);
        assert_eq!(out.upper - out.middle, out.middle - out.lower);
    }

    #[test]
    fn test_bollinger_flat_series_collapses() {
        let out = bollinger(&[dec!(5); 4], 4, Decimal::TWO);
        assert_eq!(out, BollingerBands { upper: dec!(5), middle: dec!(5), lower: dec!(5) });
    }

    #[test]
    fn test_bollinger_insufficient_is_neutral() {
        assert_eq!(bollinger(&[dec!(1)], 3, Decimal::TWO), BollingerBands::default());
    }

    #[test]
    fn test_decimal_sqrt() {
        assert_eq!(decimal_sqrt(dec!(4)), dec!(2));
        assert!((decimal_sqrt(dec!(9)) - dec!(3)).abs() < dec!(0.0001));
        assert!((decimal_sqrt(dec!(2)) - dec!(1.41421356)).abs() < dec!(0.00000002));
        assert_eq!(decimal_sqrt(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(decimal_sqrt(dec!(-4)), Decimal::ZERO);
    }

    #[test]
    fn test_decimal_sqrt_runs_fixed_iterations() {
        // Ten halvings from 5e5 stop far short of 1000: the iteration count is part of the contract.
        let root = decimal_sqrt(dec!(1000000));
        assert!(root > dec!(1000));
        assert_eq!(root, decimal_sqrt(dec!(1000000)));
    }

    #[test]
    fn test_std_dev_population() {
        // mean 5, squared diffs 9+1+1+9 = 20, /4 = 5
        let sd = std_dev(&[dec!(2), dec!(4), dec!(6), dec!(8)], 4);
        assert!((sd - dec!(2.23606798)).abs() < dec!(0.00000002));
    }
}
