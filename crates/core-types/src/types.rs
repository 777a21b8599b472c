// In crates/core-types/src/types.rs

use crate::money::Money;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

/// Static descriptor of the traded instrument, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// Financial instrument global identifier.
    pub figi: String,
    pub ticker: String,
    pub class_code: String,
    /// Number of instrument units in one lot.
    pub lot: i64,
    /// Trading currency, e.g. "rub".
    pub currency: String,
    #[serde(default)]
    pub name: String,
}

/// How the instrument to trade is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentSelector {
    Figi(String),
    Ticker { ticker: String, class_code: String },
}

impl fmt::Display for InstrumentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentSelector::Figi(figi) => write!(f, "figi:{figi}"),
            InstrumentSelector::Ticker { ticker, class_code } => write!(f, "{class_code}:{ticker}"),
        }
    }
}

/// Candle granularity, used both for history requests and stream subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleInterval {
    OneMinute,
    FiveMinutes,
    Hour,
    Day,
}

impl CandleInterval {
    pub fn duration(&self) -> Duration {
        match self {
            CandleInterval::OneMinute => Duration::minutes(1),
            CandleInterval::FiveMinutes => Duration::minutes(5),
            CandleInterval::Hour => Duration::hours(1),
            CandleInterval::Day => Duration::days(1),
        }
    }
}

/// A single OHLCV bar, either streamed or historic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: Money,
    pub high: Money,
    pub low: Money,
    pub close: Money,
    pub volume: i64,
    /// False while the bar is still forming.
    #[serde(default = "default_complete")]
    pub is_complete: bool,
}

fn default_complete() -> bool {
    true
}

impl Candle {
    /// A flat bar where every price equals `close`.
    pub fn flat(time: DateTime<Utc>, close: Money) -> Self {
        Self {
            time,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
            is_complete: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Money,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub figi: String,
    pub depth: u32,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub time: DateTime<Utc>,
}

/// An anonymous trade printed on the exchange tape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrade {
    pub figi: String,
    pub direction: Direction,
    pub price: Money,
    pub quantity: i64,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingStatus {
    pub figi: String,
    pub market_order_available: bool,
    pub limit_order_available: bool,
}

/// One event from the market-data stream.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketUpdate {
    Candle(Candle),
    OrderBook(OrderBook),
    Trade(MarketTrade),
    /// Delivered by the info subscription.
    TradingStatus(TradingStatus),
}

/// The set of streams to open for one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDataSubscription {
    pub figi: String,
    pub candle_interval: Option<CandleInterval>,
    pub order_book_depth: Option<u32>,
    pub trades: bool,
    pub info: bool,
}

/// Execution state of an order as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionReportStatus {
    Unspecified,
    New,
    PartiallyFill,
    Fill,
    Rejected,
    Cancelled,
}

impl ExecutionReportStatus {
    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionReportStatus::Fill | ExecutionReportStatus::Rejected | ExecutionReportStatus::Cancelled
        )
    }
}

/// Snapshot of an order on the broker side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    pub order_id: String,
    pub figi: String,
    pub direction: Direction,
    pub order_type: OrderType,
    pub lots_requested: i64,
    pub lots_executed: i64,
    /// Money moved by the executed part of the order so far.
    pub executed_amount: Money,
    /// Limit price, absent for market orders.
    pub initial_price: Option<Money>,
    pub execution_report_status: ExecutionReportStatus,
}

impl OrderState {
    pub fn is_pending(&self) -> bool {
        !self.execution_report_status.is_terminal()
    }
}

/// Read-only view of balances handed to a strategy on every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStrategyParams {
    /// Instrument balance in lots.
    pub instrument_balance: i64,
    pub currency_balance: Money,
    pub pending_orders: Vec<OrderState>,
}

impl TradeStrategyParams {
    pub fn new(instrument_balance: i64, currency_balance: Money) -> Self {
        Self {
            instrument_balance,
            currency_balance,
            pending_orders: Vec::new(),
        }
    }
}

/// A candidate order produced by a strategy. `quantity` is a positive number of lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotTradeOrder {
    pub quantity: i64,
    pub direction: Direction,
    /// Absent for market orders.
    pub price: Option<Money>,
    pub order_type: OrderType,
}

impl RobotTradeOrder {
    pub fn market(quantity: i64, direction: Direction) -> Self {
        Self {
            quantity,
            direction,
            price: None,
            order_type: OrderType::Market,
        }
    }

    pub fn limit(quantity: i64, direction: Direction, price: Money) -> Self {
        Self {
            quantity,
            direction,
            price: Some(price),
            order_type: OrderType::Limit,
        }
    }
}

/// What a strategy wants done after seeing one market update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyDecision {
    pub robot_trade_order: Option<RobotTradeOrder>,
    pub cancel_orders: Vec<OrderState>,
}

impl StrategyDecision {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn order(order: RobotTradeOrder) -> Self {
        Self {
            robot_trade_order: Some(order),
            cancel_orders: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.robot_trade_order.is_none() && self.cancel_orders.is_empty()
    }
}
