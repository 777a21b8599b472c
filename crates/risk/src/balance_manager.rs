// In crates/risk/src/balance_manager.rs

use crate::{Error, Result, RiskManager};
use core_types::{Direction, InstrumentInfo, Money, RobotTradeOrder, TradeStrategyParams};

/// Keeps orders within the balances the robot actually holds.
///
/// 1. A BUY may not cost more than the available currency. The cost is
///    `price * lot * quantity`, where the price is the order's own limit
///    price or else the latest market price.
/// 2. A SELL may not exceed the lots held. Short selling is never allowed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BalanceRiskManager;

impl BalanceRiskManager {
    pub fn new() -> Self {
        Self
    }

    /// Total money needed to buy `quantity` lots at `price` per unit.
    pub fn buy_cost(price: Money, lot: i64, quantity: i64) -> Option<Money> {
        price.checked_mul_int(lot)?.checked_mul_int(quantity)
    }
}

impl RiskManager for BalanceRiskManager {
    fn name(&self) -> &'static str {
        "BalanceRiskManager"
    }

    fn evaluate(
        &self,
        order: &RobotTradeOrder,
        market_price: Option<Money>,
        instrument: &InstrumentInfo,
        params: &TradeStrategyParams,
    ) -> Result<()> {
        if order.quantity <= 0 {
            return Err(Error::Vetoed {
                reason: format!("Order quantity must be positive, got {}", order.quantity),
            });
        }

        match order.direction {
            Direction::Buy => {
                let Some(price) = order.price.or(market_price) else {
                    return Err(Error::Vetoed {
                        reason: "No price is known for a market buy".to_string(),
                    });
                };
                let cost = Self::buy_cost(price, instrument.lot, order.quantity).ok_or_else(|| {
                    Error::Vetoed {
                        reason: format!("Buy cost of {} lots at {price} overflows", order.quantity),
                    }
                })?;
                if cost > params.currency_balance {
                    return Err(Error::Vetoed {
                        reason: format!(
                            "Requested buy cost: {cost}, balance: {}",
                            params.currency_balance
                        ),
                    });
                }
            }
            Direction::Sell => {
                if order.quantity > params.instrument_balance {
                    return Err(Error::Vetoed {
                        reason: format!(
                            "Requested sell quantity: {}, balance: {}",
                            order.quantity, params.instrument_balance
                        ),
                    });
                }
            }
        }

        tracing::debug!(
            direction = %order.direction,
            quantity = order.quantity,
            "Order passed balance checks."
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(lot: i64) -> InstrumentInfo {
        InstrumentInfo {
            figi: "FIGI".into(),
            ticker: "TCKR".into(),
            class_code: "TQBR".into(),
            lot,
            currency: "rub".into(),
            name: String::new(),
        }
    }

    fn check(order: RobotTradeOrder, market: Option<i64>, lot: i64, lots: i64, money: i64) -> Result<()> {
        BalanceRiskManager::new().evaluate(
            &order,
            market.map(Money::from),
            &instrument(lot),
            &TradeStrategyParams::new(lots, Money::from(money)),
        )
    }

    #[test]
    fn buy_up_to_the_exact_balance() {
        assert!(check(RobotTradeOrder::market(2, Direction::Buy), Some(10), 5, 0, 100).is_ok());
        assert!(matches!(
            check(RobotTradeOrder::market(3, Direction::Buy), Some(10), 5, 0, 100),
            Err(Error::Vetoed { .. })
        ));
    }

    #[test]
    fn limit_price_overrides_market_price() {
        let order = RobotTradeOrder::limit(1, Direction::Buy, Money::from(50));
        assert!(check(order.clone(), Some(500), 1, 0, 60).is_ok());
        assert!(check(order, None, 1, 0, 40).is_err());
    }

    #[test]
    fn market_buy_without_price_is_vetoed() {
        assert!(check(RobotTradeOrder::market(1, Direction::Buy), None, 1, 0, 1_000).is_err());
    }

    #[test]
    fn cannot_sell_more_than_held() {
        assert!(check(RobotTradeOrder::market(3, Direction::Sell), None, 1, 3, 0).is_ok());
        assert!(check(RobotTradeOrder::market(4, Direction::Sell), None, 1, 3, 0).is_err());
        assert!(check(RobotTradeOrder::market(1, Direction::Sell), None, 1, 0, 0).is_err());
    }

    #[test]
    fn non_positive_quantity_is_vetoed() {
        assert!(check(RobotTradeOrder::market(0, Direction::Sell), None, 1, 3, 0).is_err());
    }
}
