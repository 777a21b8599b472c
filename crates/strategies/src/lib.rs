// In crates/strategies/src/lib.rs

use core_types::{
    Candle, CandleInterval, InstrumentInfo, MarketUpdate, StrategyDecision, TradeStrategyParams,
};
use std::sync::Arc;

pub mod error;
pub mod factory;
pub mod ma_crossover;
pub mod random;
pub mod types;

pub use error::{Error, Result};
pub use factory::create_strategy;

/// The universal interface for a trading strategy.
///
/// A strategy declares which market-data streams it needs and turns every
/// update into a `StrategyDecision`. It is a stateful entity: it may keep
/// prices or indicator values between calls, but it only ever sees balances
/// through the read-only `TradeStrategyParams` snapshot it is handed.
pub trait Strategy: Send {
    /// Short stable name, used in logs and statistics.
    fn strategy_id(&self) -> &'static str;

    /// Candle granularity to subscribe to, `None` for no candle stream.
    fn candle_subscription_interval(&self) -> Option<CandleInterval> {
        Some(CandleInterval::OneMinute)
    }

    /// Order book depth to subscribe to, `None` for no order book stream.
    fn order_book_subscription_depth(&self) -> Option<u32> {
        None
    }

    fn trades_subscription(&self) -> bool {
        false
    }

    /// Called once before the first decision.
    fn load_instrument_info(&mut self, instrument: Arc<InstrumentInfo>);

    /// Optional warm-up with historic candles, oldest first.
    fn load_candles(&mut self, _candles: &[Candle]) {}

    /// Called for every streamed update. Candle updates go through
    /// `decide_by_candle`, which holds the trading logic.
    fn decide(&mut self, update: &MarketUpdate, params: &TradeStrategyParams) -> StrategyDecision {
        match update {
            MarketUpdate::Candle(candle) => self.decide_by_candle(candle, params),
            _ => StrategyDecision::none(),
        }
    }

    /// Called for live candles and for backtest replay alike.
    fn decide_by_candle(&mut self, candle: &Candle, params: &TradeStrategyParams) -> StrategyDecision;
}
