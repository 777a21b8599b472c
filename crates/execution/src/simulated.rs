// In crates/execution/src/simulated.rs

use crate::{Error, Result};
use core_types::{Direction, Money, RobotTradeOrder, TradeStrategyParams};

/// The local balance model of a backtest.
///
/// Orders fill in full at the candle close. An order the balances cannot
/// cover is a [`Error::SimulationViolation`]: a strategy must never produce
/// one, so it is never clamped or skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedAccount {
    instrument_balance: i64,
    currency_balance: Money,
    /// Instrument units per lot.
    lot: i64,
}

impl SimulatedAccount {
    pub fn new(instrument_balance: i64, currency_balance: Money, lot: i64) -> Self {
        Self {
            instrument_balance,
            currency_balance,
            lot,
        }
    }

    pub fn instrument_balance(&self) -> i64 {
        self.instrument_balance
    }

    pub fn currency_balance(&self) -> Money {
        self.currency_balance
    }

    /// Snapshot handed to the strategy. A backtest never has pending orders.
    pub fn params(&self) -> TradeStrategyParams {
        TradeStrategyParams::new(self.instrument_balance, self.currency_balance)
    }

    /// Applies `order` at `close` and returns the money moved.
    pub fn execute(&mut self, order: &RobotTradeOrder, close: Money) -> Result<Money> {
        if order.quantity <= 0 {
            return Err(Error::SimulationViolation {
                reason: format!("Order quantity must be positive, got {}", order.quantity),
            });
        }
        let amount = close
            .checked_mul_int(self.lot)
            .and_then(|lot_price| lot_price.checked_mul_int(order.quantity))
            .ok_or_else(|| Error::SimulationViolation {
                reason: format!("Amount of {} lots at {close} overflows", order.quantity),
            })?;

        match order.direction {
            Direction::Sell => {
                if order.quantity > self.instrument_balance {
                    return Err(Error::SimulationViolation {
                        reason: format!(
                            "Cannot sell {} lots, balance is {}",
                            order.quantity, self.instrument_balance
                        ),
                    });
                }
                self.instrument_balance -= order.quantity;
                self.currency_balance += amount;
            }
            Direction::Buy => {
                if amount > self.currency_balance {
                    return Err(Error::SimulationViolation {
                        reason: format!(
                            "Cannot buy {} lots for {amount}, balance is {}",
                            order.quantity, self.currency_balance
                        ),
                    });
                }
                self.instrument_balance += order.quantity;
                self.currency_balance -= amount;
            }
        }
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_moves_money_into_lots() {
        let mut account = SimulatedAccount::new(0, Money::from(100), 1);

        let amount = account
            .execute(&RobotTradeOrder::market(1, Direction::Buy), Money::from(10))
            .unwrap();

        assert_eq!(amount, Money::from(10));
        assert_eq!(account.currency_balance(), Money::from(90));
        assert_eq!(account.instrument_balance(), 1);
    }

    #[test]
    fn selling_more_than_held_is_a_violation() {
        let mut account = SimulatedAccount::new(0, Money::from(100), 1);

        let result = account.execute(&RobotTradeOrder::market(1, Direction::Sell), Money::from(10));

        assert!(matches!(result, Err(Error::SimulationViolation { .. })));
        assert_eq!(account, SimulatedAccount::new(0, Money::from(100), 1));
    }

    #[test]
    fn buying_beyond_balance_is_a_violation() {
        let mut account = SimulatedAccount::new(0, Money::from(100), 10);
        let result = account.execute(&RobotTradeOrder::market(2, Direction::Buy), Money::from(6));
        assert!(matches!(result, Err(Error::SimulationViolation { .. })));
    }

    #[test]
    fn limit_orders_fill_at_the_close() {
        let mut account = SimulatedAccount::new(3, Money::ZERO, 2);
        let order = RobotTradeOrder::limit(3, Direction::Sell, Money::from(100));

        account.execute(&order, Money::new(7, 250_000_000)).unwrap();

        assert_eq!(account.currency_balance(), Money::new(43, 500_000_000));
        assert_eq!(account.instrument_balance(), 0);
    }
}
