// In crates/core-types/src/lib.rs

pub mod error;
pub mod money;
pub mod strategy;
pub mod types;

// Re-export the most important types for easy access from other crates.
pub use error::{Error, Result};
pub use money::{Money, Quotation, NANO_IN_UNIT};
pub use strategy::StrategyConfig;
pub use types::{
    Candle, CandleInterval, Direction, ExecutionReportStatus, InstrumentInfo, InstrumentSelector,
    MarketDataSubscription, MarketTrade, MarketUpdate, OrderBook, OrderBookLevel, OrderState,
    OrderType, RobotTradeOrder, StrategyDecision, TradeStrategyParams, TradingStatus,
};
