// In crates/strategies/src/random.rs

use crate::types::RandomSettings;
use crate::{Error, Result, Strategy};
use core_types::{
    Candle, Direction, InstrumentInfo, RobotTradeOrder, StrategyDecision, TradeStrategyParams,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Places a random market order on every candle.
///
/// A signed lot count is drawn from `[low, high]`, narrowed so that a sell
/// never exceeds the lots held and a buy never exceeds what the currency
/// balance covers. Positive draws buy, negative draws sell, zero does nothing.
pub struct RandomStrategy {
    settings: RandomSettings,
    instrument: Option<Arc<InstrumentInfo>>,
    rng: StdRng,
}

impl RandomStrategy {
    pub fn new(settings: RandomSettings) -> Result<Self> {
        if settings.low > settings.high {
            return Err(Error::InvalidParameters(format!(
                "low ({}) must not exceed high ({})",
                settings.low, settings.high
            )));
        }
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            settings,
            instrument: None,
            rng,
        })
    }

    /// Signed lot range allowed by the current balances, `None` if empty.
    fn bounds(&self, candle: &Candle, params: &TradeStrategyParams) -> Option<(i64, i64)> {
        let lots_affordable = match &self.instrument {
            Some(instrument) => {
                let lot_price = candle.close * instrument.lot;
                if lot_price.is_positive() {
                    let lots = params.currency_balance.total_nanos() / lot_price.total_nanos();
                    i64::try_from(lots.max(0)).unwrap_or(i64::MAX)
                } else {
                    0
                }
            }
            None => 0,
        };
        let lower = self.settings.low.max(-params.instrument_balance.max(0));
        let upper = self.settings.high.min(lots_affordable);
        (lower <= upper).then_some((lower, upper))
    }
}

impl Strategy for RandomStrategy {
    fn strategy_id(&self) -> &'static str {
        "random"
    }

    fn load_instrument_info(&mut self, instrument: Arc<InstrumentInfo>) {
        self.instrument = Some(instrument);
    }

    fn decide_by_candle(&mut self, candle: &Candle, params: &TradeStrategyParams) -> StrategyDecision {
        let Some((lower, upper)) = self.bounds(candle, params) else {
            tracing::debug!(
                instrument_balance = params.instrument_balance,
                currency_balance = %params.currency_balance,
                "No admissible random order."
            );
            return StrategyDecision::none();
        };

        let quantity = self.rng.gen_range(lower..=upper);
        match quantity {
            q if q > 0 => StrategyDecision::order(RobotTradeOrder::market(q, Direction::Buy)),
            q if q < 0 => StrategyDecision::order(RobotTradeOrder::market(-q, Direction::Sell)),
            _ => StrategyDecision::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use core_types::Money;

    fn instrument(lot: i64) -> Arc<InstrumentInfo> {
        Arc::new(InstrumentInfo {
            figi: "BBG000000001".into(),
            ticker: "TEST".into(),
            class_code: "TQBR".into(),
            lot,
            currency: "rub".into(),
            name: "Test".into(),
        })
    }

    fn strategy(low: i64, high: i64, lot: i64) -> RandomStrategy {
        let mut strategy = RandomStrategy::new(RandomSettings {
            low,
            high,
            seed: Some(7),
        })
        .unwrap();
        strategy.load_instrument_info(instrument(lot));
        strategy
    }

    fn candle(i: i64, close: i64) -> Candle {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        Candle::flat(start + Duration::minutes(i), Money::from(close))
    }

    /// Converts a decision back to the signed lot count it represents.
    fn signed(decision: &StrategyDecision) -> i64 {
        match &decision.robot_trade_order {
            Some(order) if order.direction == Direction::Buy => order.quantity,
            Some(order) => -order.quantity,
            None => 0,
        }
    }

    #[test]
    fn rejects_inverted_range() {
        let result = RandomStrategy::new(RandomSettings {
            low: 3,
            high: -3,
            seed: None,
        });
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn draws_stay_within_balances() {
        let mut strategy = strategy(-5, 5, 1);
        // 2 lots held, 30 money at price 10 covers 3 lots.
        let params = TradeStrategyParams::new(2, Money::from(30));

        for i in 0..500 {
            let q = signed(&strategy.decide_by_candle(&candle(i, 10), &params));
            assert!((-2..=3).contains(&q), "drew {q}");
        }
    }

    #[test]
    fn quantities_are_always_positive() {
        let mut strategy = strategy(-5, 5, 1);
        let params = TradeStrategyParams::new(5, Money::from(1_000));

        for i in 0..200 {
            if let Some(order) = strategy.decide_by_candle(&candle(i, 10), &params).robot_trade_order {
                assert!(order.quantity > 0);
            }
        }
    }

    #[test]
    fn nothing_to_sell_and_nothing_affordable_means_no_order() {
        let mut strategy = strategy(-5, 5, 10);
        // One lot costs 100.
        let params = TradeStrategyParams::new(0, Money::from(99));

        for i in 0..50 {
            assert!(strategy.decide_by_candle(&candle(i, 10), &params).is_empty());
        }
    }

    #[test]
    fn empty_range_means_no_order() {
        // Only buys of 3..5 lots are allowed but just 1 is affordable.
        let mut strategy = strategy(3, 5, 1);
        let params = TradeStrategyParams::new(0, Money::from(10));

        assert!(strategy.decide_by_candle(&candle(0, 10), &params).is_empty());
    }

    #[test]
    fn same_seed_same_orders() {
        let params = TradeStrategyParams::new(10, Money::from(1_000));
        let mut a = strategy(-3, 3, 1);
        let mut b = strategy(-3, 3, 1);

        for i in 0..20 {
            let c = candle(i, 10);
            assert_eq!(a.decide_by_candle(&c, &params), b.decide_by_candle(&c, &params));
        }
    }
}
