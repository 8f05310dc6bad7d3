use crate::atr::atr;
use crate::{div, round};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction value for an uptrend (line below price).
pub const UPTREND: i8 = -1;
/// Direction value for a downtrend (line above price).
pub const DOWNTREND: i8 = 1;

/// One SuperTrend step. `direction < 0` is an uptrend, `direction > 0` a downtrend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperTrendPoint {
    pub value: Decimal,
    pub direction: i8,
}

impl SuperTrendPoint {
    pub fn is_uptrend(&self) -> bool {
        self.direction < 0
    }
}

/// SuperTrend for the last sample, continuing from `prev`.
///
/// Basic bands are `hl2 ± multiplier * ATR(period)`. The active (final) band
/// is sticky: in an uptrend the lower band only moves when the basic lower
/// band rises above it or the previous close fell through it; the upper band
/// mirrors this in a downtrend. Direction flips in exactly two cases: an
/// uptrend whose close drops below the final lower band, and a downtrend
/// whose close rises above the final upper band. Without `prev`, the
/// direction is up if the close is above the basic upper band.
///
/// Returns `None` until `period + 1` samples are available.
pub fn supertrend(
    highs: &[Decimal],
    lows: &[Decimal],
    closes: &[Decimal],
    period: usize,
    multiplier: Decimal,
    prev: Option<SuperTrendPoint>,
) -> Option<SuperTrendPoint> {
    let n = closes.len();
    if period == 0 || highs.len() != n || lows.len() != n || n < period + 1 {
        return None;
    }
    let last = n - 1;
    let close = closes[last];
    let prev_close = closes[last - 1];

    let hl2 = div(highs[last] + lows[last], Decimal::TWO);
    let range = multiplier * atr(highs, lows, closes, period);
    let basic_upper = round(hl2 + range);
    let basic_lower = round(hl2 - range);

    let point = match prev {
        None => {
            if close > basic_upper {
                SuperTrendPoint { value: basic_lower, direction: UPTREND }
            } else {
                SuperTrendPoint { value: basic_upper, direction: DOWNTREND }
            }
        }
        Some(p) if p.is_uptrend() => {
            let final_lower = if basic_lower > p.value || prev_close < p.value {
                basic_lower
            } else {
                p.value
            };
            if close < final_lower {
                SuperTrendPoint { value: basic_upper, direction: DOWNTREND }
            } else {
                SuperTrendPoint { value: final_lower, direction: UPTREND }
            }
        }
        Some(p) => {
            let final_upper = if basic_upper < p.value || prev_close > p.value {
                basic_upper
            } else {
                p.value
            };
            if close > final_upper {
                SuperTrendPoint { value: basic_lower, direction: UPTREND }
            } else {
                SuperTrendPoint { value: final_upper, direction: DOWNTREND }
            }
        }
    };
    Some(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Candles with a fixed 2-point range around each close.
    fn series(closes: &[i64]) -> (Vec<Decimal>, Vec<Decimal>, Vec<Decimal>) {
        let closes: Vec<Decimal> = closes.iter().map(|c| Decimal::from(*c)).collect();
        let highs = closes.iter().map(|c| *c + Decimal::ONE).collect();
        let lows = closes.iter().map(|c| *c - Decimal::ONE).collect();
        (highs, lows, closes)
    }

    fn run(closes: &[i64], period: usize, mult: Decimal) -> Vec<SuperTrendPoint> {
        let (h, l, c) = series(closes);
        let mut prev = None;
        let mut out = Vec::new();
        for end in period + 1..=c.len() {
            let p = supertrend(&h[..end], &l[..end], &c[..end], period, mult, prev).unwrap();
            out.push(p);
            prev = Some(p);
        }
        out
    }

    #[test]
    fn test_insufficient_history_is_undefined() {
        let (h, l, c) = series(&[1, 2, 3]);
        assert_eq!(supertrend(&h, &l, &c, 3, dec!(3), None), None);
    }

    #[test]
    fn test_first_call_compares_close_to_upper_band() {
        // flat series: close sits below hl2 + 3 * ATR, so the trend starts down
        let (h, l, c) = series(&[10, 10, 10, 10]);
        let p = supertrend(&h, &l, &c, 3, dec!(3), None).unwrap();
        assert_eq!(p.direction, DOWNTREND);
        assert_eq!(p.value, dec!(16));
    }

    #[test]
    fn test_bands_are_sticky_within_a_trend() {
        let closes = [10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12];
        let points = run(&closes, 3, dec!(1));
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.direction == b.direction {
                if a.is_uptrend() {
                    assert!(b.value >= a.value, "lower band loosened in uptrend");
                } else {
                    assert!(b.value <= a.value, "upper band loosened in downtrend");
                }
            }
        }
        assert!(points.iter().any(|p| p.direction == UPTREND));
        assert_eq!(points.last().unwrap().direction, DOWNTREND);
    }

    #[test]
    fn test_direction_flips_only_on_band_breach() {
        let closes = [10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12];
        let (_, _, c) = series(&closes);
        let points = run(&closes, 3, dec!(1));
        // points[j] belongs to close index j + 3
        for (i, pair) in points.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let close = c[i + 4];
            let breached = if a.is_uptrend() { close < a.value } else { close > a.value };
            assert_eq!(a.direction != b.direction, breached, "step {}", i);
        }
    }
}
