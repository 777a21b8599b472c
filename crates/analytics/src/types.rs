// In crates/analytics/src/types.rs

use chrono::{DateTime, Utc};
use core_types::{Direction, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a recorded trade came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSource {
    /// A broker fill, possibly one slice of a partially filled order.
    Live,
    /// A simulated fill. No broker order exists.
    Backtest,
}

/// One executed movement of lots and money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub time: DateTime<Utc>,
    /// Broker order id, absent for backtest trades.
    pub order_id: Option<String>,
    pub direction: Direction,
    pub lots: i64,
    /// Price of one instrument unit.
    pub price: Money,
    /// Total money moved: `price * lot * lots`.
    pub amount: Money,
    pub source: TradeSource,
}

/// A struct to hold a point in the account's equity curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
}

/// Summary of a trading session or backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PerformanceReport {
    pub total_trades: u32,
    pub buy_trades: u32,
    pub sell_trades: u32,
    pub lots_bought: i64,
    pub lots_sold: i64,
    /// Sum of the absolute money amounts of all trades.
    pub turnover: Decimal,

    pub initial_money: Decimal,
    pub initial_positions: i64,
    pub final_money: Decimal,
    pub final_positions: i64,

    /// Money plus lots marked at the first known price.
    pub initial_equity: Decimal,
    /// Money plus lots marked at the last known price.
    pub final_equity: Decimal,
    pub net_pnl_absolute: Decimal,
    pub net_pnl_percentage: f64,
    pub max_drawdown_absolute: Decimal,
    pub max_drawdown_percentage: f64,
}

impl PerformanceReport {
    /// Creates a new, empty report with zero values.
    pub fn new() -> Self {
        Self::default()
    }
}
