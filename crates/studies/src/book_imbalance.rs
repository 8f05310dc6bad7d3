use crate::common::values;
use rust_decimal::Decimal;
use taflow_core::*;
use taflow_indicators::div;

/// Resting-liquidity imbalance `(bids - asks) / (bids + asks)` over the top `depth` levels.
///
/// Snapshots update the carried imbalance silently; each candle close reports
/// the most recent one.
pub struct BookImbalanceIndicator {
    definition: IndicatorDefinition,
}

#[derive(Debug, Clone, Default)]
struct ImbalanceState {
    latest: Option<Decimal>,
}

impl BookImbalanceIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("book_imbalance", "Order Book Imbalance", IndicatorCategory::OrderFlow)
                .describe("Bid/ask volume imbalance in [-1, 1]")
                .param(ParamSpec::integer("depth", 10, 1, 1000, "Price levels per side"))
                .consumes(DataKind::OrderBook)
                .preload_order_flow()
                .series(SeriesStyle::new("imbalance", "Imbalance", SeriesKind::Histogram, "#42A5F5")),
        }
    }
}

impl Default for BookImbalanceIndicator {
    fn default() -> Self {
        Self::new()
    }
}

fn imbalance(book: &OrderBookSnapshot, depth: usize) -> Decimal {
    let (bids, asks) = book.depth_volumes(depth);
    div(bids - asks, bids + asks)
}

impl Indicator for BookImbalanceIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, _params: &Params) -> usize {
        1
    }

    /// Candles carry no book data; nothing to report.
    fn calculate(&self, _candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        params.usize("depth")?;
        Ok(IndicatorValues::new())
    }

    fn on_init(&self, _warmup: &[Candle], _params: &Params) -> Result<OpaqueState, IndicatorError> {
        Ok(Box::new(ImbalanceState::default()))
    }

    fn on_new_candle(
        &self,
        _candle: &Candle,
        _params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let state = downcast_state::<ImbalanceState>(state)?.clone();
        let values = state
            .latest
            .map(|v| values([("imbalance", v)]))
            .unwrap_or_default();
        Ok(CandleUpdate::new(values, Box::new(state)))
    }

    fn on_order_book_update(
        &self,
        book: &OrderBookSnapshot,
        params: &Params,
        _state: &OpaqueState,
    ) -> Result<StreamUpdate, IndicatorError> {
        let latest = imbalance(book, params.usize("depth")?);
        Ok(StreamUpdate::silent(Box::new(ImbalanceState { latest: Some(latest) })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;
    use rust_decimal_macros::dec;

    fn book(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> OrderBookSnapshot {
        let level = |(price, quantity): &(Decimal, Decimal)| PriceLevel {
            price: *price,
            quantity: *quantity,
        };
        OrderBookSnapshot {
            timestamp: t0(),
            last_update_id: 1,
            bids: bids.iter().map(level).collect(),
            asks: asks.iter().map(level).collect(),
        }
    }

    #[test]
    fn test_imbalance_over_depth() {
        let b = book(
            &[(dec!(99), dec!(3)), (dec!(98), dec!(1)), (dec!(97), dec!(100))],
            &[(dec!(101), dec!(1)), (dec!(102), dec!(1))],
        );
        // top 2 levels: bids 4, asks 2
        assert_eq!(imbalance(&b, 2), dec!(0.33333333));
        assert_eq!(imbalance(&book(&[], &[]), 5), Decimal::ZERO);
    }

    #[test]
    fn test_book_updates_are_silent_until_close() {
        let ind = BookImbalanceIndicator::new();
        let p = Params::new().with("depth", 5i64);
        let state = ind.on_init(&[], &p).unwrap();

        let empty = ind.on_new_candle(&candle(0, dec!(100)), &p, &state).unwrap();
        assert!(empty.values.is_empty());

        let update = ind
            .on_order_book_update(&book(&[(dec!(99), dec!(3))], &[(dec!(101), dec!(1))]), &p, &state)
            .unwrap();
        assert!(update.values.is_empty());
        let close = ind.on_new_candle(&candle(1, dec!(100)), &p, &update.state.unwrap()).unwrap();
        assert_eq!(close.values["imbalance"], dec!(0.5));
    }
}
