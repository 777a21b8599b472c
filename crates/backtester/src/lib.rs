// In crates/backtester/src/lib.rs

pub mod error;

pub use error::{Error, Result};

use analytics::TradeStatistics;
use core_types::{Candle, InstrumentInfo, TradeStrategyParams};
use execution::SimulatedAccount;
use strategies::Strategy;

/// The main engine for running historical backtests.
///
/// A backtest is a deterministic fold of candles, oldest first, through
/// `Strategy::decide_by_candle`. Orders never leave the process: they are
/// applied to a [`SimulatedAccount`] at the candle close and recorded in the
/// ledger as backtest trades.
pub struct Backtester<'a> {
    strategy: &'a mut dyn Strategy,
    account: SimulatedAccount,
    stats: TradeStatistics,
    candles_seen: usize,
}

impl<'a> Backtester<'a> {
    pub fn new(strategy: &'a mut dyn Strategy, instrument: &InstrumentInfo, initial: &TradeStrategyParams) -> Self {
        Self {
            strategy,
            account: SimulatedAccount::new(initial.instrument_balance, initial.currency_balance, instrument.lot),
            stats: TradeStatistics::new(instrument.clone(), initial.currency_balance, initial.instrument_balance),
            candles_seen: 0,
        }
    }

    /// Feeds the training window to the strategy. No decisions are made.
    pub fn warm_up(&mut self, candles: &[Candle]) {
        tracing::info!(candles = candles.len(), "Warming up strategy on the training window.");
        self.strategy.load_candles(candles);
    }

    /// Runs one candle through the strategy and applies the resulting order.
    pub fn step(&mut self, candle: &Candle) -> Result<()> {
        self.candles_seen += 1;
        self.stats.mark_price(candle.close);

        let params = self.account.params();
        let decision = self.strategy.decide_by_candle(candle, &params);
        if !decision.cancel_orders.is_empty() {
            tracing::debug!(
                count = decision.cancel_orders.len(),
                "Backtest has no resting orders, ignoring cancellations."
            );
        }
        let Some(order) = decision.robot_trade_order else {
            return Ok(());
        };

        self.account
            .execute(&order, candle.close)
            .map_err(|source| Error::InvariantViolated {
                time: candle.time,
                source,
            })?;
        self.stats
            .add_backtest_trade(candle.time, order.quantity, candle.close, order.direction);

        tracing::info!(
            time = %candle.time,
            direction = %order.direction,
            lots = order.quantity,
            price = %candle.close,
            money = %self.account.currency_balance(),
            positions = self.account.instrument_balance(),
            "Backtest trade."
        );
        Ok(())
    }

    /// Replays `candles` in order and returns the ledger of the whole run.
    pub fn run<I>(mut self, candles: I) -> Result<TradeStatistics>
    where
        I: IntoIterator<Item = Candle>,
    {
        for candle in candles {
            self.step(&candle)?;
        }
        Ok(self.finish())
    }

    pub fn account(&self) -> &SimulatedAccount {
        &self.account
    }

    pub fn statistics(&self) -> &TradeStatistics {
        &self.stats
    }

    pub fn finish(self) -> TradeStatistics {
        tracing::info!(
            strategy = self.strategy.strategy_id(),
            candles = self.candles_seen,
            trades = self.stats.trades().len(),
            money = %self.stats.get_money(),
            positions = self.stats.get_positions(),
            "Backtest finished."
        );
        self.stats
    }
}
