use crate::common::values;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use taflow_core::*;

/// Markers kept per candle.
const MAX_MARKERS: usize = 200;

/// Aggressor volume from trades at or above a size threshold, tallied per candle.
///
/// Trades accumulate silently; the candle close emits the tally and resets it.
pub struct BigTradesIndicator {
    definition: IndicatorDefinition,
}

#[derive(Debug, Clone, Default)]
struct BigTradeTally {
    buy_volume: Decimal,
    sell_volume: Decimal,
    count: u64,
    markers: Vec<Value>,
}

impl BigTradeTally {
    fn values(&self) -> IndicatorValues {
        values([
            ("big_buy_volume", self.buy_volume),
            ("big_sell_volume", self.sell_volume),
            ("big_trade_count", Decimal::from(self.count)),
            ("delta", self.buy_volume - self.sell_volume),
        ])
    }
}

impl BigTradesIndicator {
    pub fn new() -> Self {
        Self {
            definition: IndicatorDefinition::new("big_trades", "Big Trades", IndicatorCategory::OrderFlow)
                .describe("Buy and sell volume from trades at or above `threshold` in base units")
                .param(
                    ParamSpec::decimal("threshold", dec!(1), dec!(0.00000001), dec!(1000000000), "Minimum trade size")
                        .required(),
                )
                .consumes(DataKind::Trade)
                .consumes(DataKind::AggregateTrade)
                .preload_order_flow()
                .series(SeriesStyle::new("delta", "Big delta", SeriesKind::Histogram, "#26A69A"))
                .series(SeriesStyle::new("big_trades", "Big trades", SeriesKind::Markers, "#FFA726")),
        }
    }
}

impl Default for BigTradesIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for BigTradesIndicator {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn min_required_candles(&self, _params: &Params) -> usize {
        1
    }

    /// Candles carry no trades, so the bulk result is an empty tally.
    fn calculate(&self, _candles: &[Candle], params: &Params) -> Result<IndicatorValues, IndicatorError> {
        params.decimal("threshold")?;
        Ok(BigTradeTally::default().values())
    }

    fn on_init(&self, _warmup: &[Candle], _params: &Params) -> Result<OpaqueState, IndicatorError> {
        Ok(Box::new(BigTradeTally::default()))
    }

    fn on_new_candle(
        &self,
        _candle: &Candle,
        _params: &Params,
        state: &OpaqueState,
    ) -> Result<CandleUpdate, IndicatorError> {
        let tally = downcast_state::<BigTradeTally>(state)?;
        let mut auxiliary = Auxiliary::new();
        if !tally.markers.is_empty() {
            auxiliary.insert("big_trades".to_string(), Value::Array(tally.markers.clone()));
        }
        Ok(CandleUpdate::new(tally.values(), Box::new(BigTradeTally::default())).with_auxiliary(auxiliary))
    }

    fn on_trade_update(&self, trade: &Trade, params: &Params, state: &OpaqueState) -> Result<StreamUpdate, IndicatorError> {
        if trade.quantity < params.decimal("threshold")? {
            return Ok(StreamUpdate::empty());
        }
        let mut tally = downcast_state::<BigTradeTally>(state)?.clone();
        let side = if trade.is_aggressive_buy() {
            tally.buy_volume += trade.quantity;
            "buy"
        } else {
            tally.sell_volume += trade.quantity;
            "sell"
        };
        tally.count += 1;
        if tally.markers.len() < MAX_MARKERS {
            tally.markers.push(json!({
                "time": trade.timestamp,
                "price": trade.price,
                "quantity": trade.quantity,
                "side": side,
            }));
        }
        Ok(StreamUpdate::silent(Box::new(tally)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::*;

    fn trade(id: u64, quantity: Decimal, is_buyer_maker: bool) -> Trade {
        Trade {
            trade_id: id,
            timestamp: t0(),
            price: dec!(100),
            quantity,
            is_buyer_maker,
        }
    }

    fn params() -> Params {
        Params::new().with("threshold", dec!(5))
    }

    #[test]
    fn test_threshold_is_required() {
        let ind = BigTradesIndicator::new();
        let err = Params::new().resolve(&ind.definition().params).unwrap_err();
        assert_eq!(err, ParamError::Missing("threshold".to_string()));
    }

    #[test]
    fn test_trades_accumulate_silently_and_reset_on_close() {
        let ind = BigTradesIndicator::new();
        let p = params();
        let mut state = ind.on_init(&[], &p).unwrap();

        let small = ind.on_trade_update(&trade(1, dec!(1), false), &p, &state).unwrap();
        assert!(small.values.is_empty());
        assert!(small.state.is_none());

        for t in [trade(2, dec!(6), false), trade(3, dec!(10), true), trade(4, dec!(5), false)] {
            let update = ind.on_trade_update(&t, &p, &state).unwrap();
            assert!(update.values.is_empty());
            state = update.state.unwrap();
        }

        let close = ind.on_new_candle(&candle(0, dec!(100)), &p, &state).unwrap();
        assert_eq!(close.values["big_buy_volume"], dec!(11));
        assert_eq!(close.values["big_sell_volume"], dec!(10));
        assert_eq!(close.values["big_trade_count"], dec!(3));
        assert_eq!(close.values["delta"], dec!(1));
        assert_eq!(close.auxiliary["big_trades"].as_array().unwrap().len(), 3);

        let next = ind.on_new_candle(&candle(1, dec!(100)), &p, &close.state).unwrap();
        assert_eq!(next.values["big_trade_count"], Decimal::ZERO);
        assert!(next.auxiliary.is_empty());
    }

    #[test]
    fn test_consumes_trades() {
        let kinds = BigTradesIndicator::new().required_data_types();
        assert!(kinds.contains(&DataKind::Trade));
        assert!(kinds.contains(&DataKind::AggregateTrade));
        assert!(!kinds.contains(&DataKind::OrderBook));
    }
}
