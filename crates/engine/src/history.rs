use std::collections::VecDeque;
use taflow_core::IndicatorResult;

/// Bounded FIFO of closed-candle results.
#[derive(Debug, Clone)]
pub struct ResultHistory {
    results: VecDeque<IndicatorResult>,
    capacity: usize,
}

impl ResultHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            results: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append, evicting the oldest entry once full.
    pub fn push(&mut self, result: IndicatorResult) {
        if self.results.len() == self.capacity {
            self.results.pop_front();
        }
        self.results.push_back(result);
    }

    pub fn latest(&self) -> Option<&IndicatorResult> {
        self.results.back()
    }

    /// The most recent `n` results, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<IndicatorResult> {
        let skip = self.results.len().saturating_sub(n);
        self.results.iter().skip(skip).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<IndicatorResult> {
        self.results.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use taflow_core::IndicatorValues;

    fn result(i: i64) -> IndicatorResult {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(i);
        IndicatorResult::at(ts, IndicatorValues::new(), Default::default())
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut history = ResultHistory::new(3);
        for i in 0..5 {
            history.push(result(i));
        }
        assert_eq!(history.len(), 3);
        let stamps: Vec<_> = history.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![result(2).timestamp, result(3).timestamp, result(4).timestamp]);
        assert_eq!(history.latest(), Some(&result(4)));
    }

    #[test]
    fn test_last_n() {
        let mut history = ResultHistory::new(10);
        for i in 0..4 {
            history.push(result(i));
        }
        assert_eq!(history.last_n(2), vec![result(2), result(3)]);
        assert_eq!(history.last_n(99).len(), 4);
    }
}
