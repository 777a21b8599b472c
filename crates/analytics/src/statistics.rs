// In crates/analytics/src/statistics.rs

use crate::error::Result;
use crate::types::{TradeRecord, TradeSource};
use chrono::{DateTime, Utc};
use core_types::{Direction, InstrumentInfo, Money, OrderState, TradeStrategyParams};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// The position ledger of one robot.
///
/// Holds the money and instrument balances, every order the robot has seen and
/// the log of executed trades. State only changes through [`add_trade`],
/// [`cancel_order`] and [`add_backtest_trade`]; readers get copies.
///
/// [`add_trade`]: TradeStatistics::add_trade
/// [`cancel_order`]: TradeStatistics::cancel_order
/// [`add_backtest_trade`]: TradeStatistics::add_backtest_trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    instrument: InstrumentInfo,
    initial_money: Money,
    initial_positions: i64,
    money: Money,
    /// Instrument balance in lots.
    positions: i64,
    /// Last known state per broker order id.
    orders: BTreeMap<String, OrderState>,
    /// Orders with a cancel sent but no terminal report yet.
    #[serde(default)]
    cancel_requested: BTreeSet<String>,
    trades: Vec<TradeRecord>,
    last_price: Option<Money>,
}

impl TradeStatistics {
    pub fn new(instrument: InstrumentInfo, money: Money, positions: i64) -> Self {
        Self {
            instrument,
            initial_money: money,
            initial_positions: positions,
            money,
            positions,
            orders: BTreeMap::new(),
            cancel_requested: BTreeSet::new(),
            trades: Vec::new(),
            last_price: None,
        }
    }

    /// Applies a broker order report.
    ///
    /// Reports are cumulative, so only the part executed since the previous
    /// report for the same order moves the balances. Reports for an order that
    /// already reached a terminal state are ignored. Returns the newly executed lots.
    pub fn add_trade(&mut self, state: &OrderState) -> i64 {
        let (seen_lots, seen_amount) = match self.orders.get(&state.order_id) {
            Some(known) if known.execution_report_status.is_terminal() => {
                tracing::debug!(order_id = %state.order_id, "Ignoring report for a finished order.");
                return 0;
            }
            Some(known) => (known.lots_executed, known.executed_amount),
            None => (0, Money::ZERO),
        };

        let new_lots = state.lots_executed - seen_lots;
        let new_amount = state.executed_amount - seen_amount;
        if new_lots < 0 {
            tracing::warn!(
                order_id = %state.order_id,
                seen_lots,
                reported_lots = state.lots_executed,
                "Order report went backwards, keeping the known execution."
            );
            return 0;
        }

        if new_lots > 0 {
            self.apply(state.direction, new_lots, new_amount);
            let price = new_amount
                .checked_div_int(new_lots * self.instrument.lot)
                .unwrap_or(Money::ZERO);
            self.last_price = Some(price);
            self.trades.push(TradeRecord {
                time: Utc::now(),
                order_id: Some(state.order_id.clone()),
                direction: state.direction,
                lots: new_lots,
                price,
                amount: new_amount,
                source: TradeSource::Live,
            });
            tracing::info!(
                order_id = %state.order_id,
                direction = %state.direction,
                lots = new_lots,
                amount = %new_amount,
                money = %self.money,
                positions = self.positions,
                "Recorded order execution."
            );
        }

        if state.execution_report_status.is_terminal() {
            self.cancel_requested.remove(&state.order_id);
        }
        self.orders.insert(state.order_id.clone(), state.clone());
        new_lots
    }

    /// Records that a cancel was sent for a pending order, which is no longer
    /// offered to the strategy. The broker's status is kept: fills reported
    /// before the cancel took effect still reach the balances.
    ///
    /// Returns false for unknown, finished or already cancelling orders.
    pub fn cancel_order(&mut self, order_id: &str) -> bool {
        if !self.orders.get(order_id).is_some_and(OrderState::is_pending) {
            return false;
        }
        self.cancel_requested.insert(order_id.to_string())
    }

    /// Records a simulated fill of `quantity` lots at `price` per unit.
    pub fn add_backtest_trade(
        &mut self,
        time: DateTime<Utc>,
        quantity: i64,
        price: Money,
        direction: Direction,
    ) {
        let amount = price * self.instrument.lot * quantity;
        self.apply(direction, quantity, amount);
        self.last_price = Some(price);
        self.trades.push(TradeRecord {
            time,
            order_id: None,
            direction,
            lots: quantity,
            price,
            amount,
            source: TradeSource::Backtest,
        });
    }

    /// Remembers the latest market price for mark-to-market reporting.
    pub fn mark_price(&mut self, price: Money) {
        self.last_price = Some(price);
    }

    fn apply(&mut self, direction: Direction, lots: i64, amount: Money) {
        match direction {
            Direction::Buy => {
                self.positions += lots;
                self.money -= amount;
            }
            Direction::Sell => {
                self.positions -= lots;
                self.money += amount;
            }
        }
    }

    pub fn get_money(&self) -> Money {
        self.money
    }

    /// Instrument balance in lots.
    pub fn get_positions(&self) -> i64 {
        self.positions
    }

    pub fn get_pending_orders(&self) -> Vec<OrderState> {
        self.orders
            .values()
            .filter(|o| o.is_pending() && !self.cancel_requested.contains(&o.order_id))
            .cloned()
            .collect()
    }

    pub fn get_order(&self, order_id: &str) -> Option<OrderState> {
        self.orders.get(order_id).cloned()
    }

    /// Fresh balance snapshot for a strategy decision.
    pub fn strategy_params(&self) -> TradeStrategyParams {
        TradeStrategyParams {
            instrument_balance: self.positions,
            currency_balance: self.money,
            pending_orders: self.get_pending_orders(),
        }
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn instrument(&self) -> &InstrumentInfo {
        &self.instrument
    }

    pub fn initial_money(&self) -> Money {
        self.initial_money
    }

    pub fn initial_positions(&self) -> i64 {
        self.initial_positions
    }

    pub fn last_price(&self) -> Option<Money> {
        self.last_price
    }

    /// Writes the ledger as pretty JSON, creating parent directories as needed.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        tracing::info!(path = %path.display(), trades = self.trades.len(), "Saved trade statistics.");
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::{ExecutionReportStatus, OrderType};

    fn instrument() -> InstrumentInfo {
        InstrumentInfo {
            figi: "BBG004730N88".into(),
            ticker: "SBER".into(),
            class_code: "TQBR".into(),
            lot: 10,
            currency: "rub".into(),
            name: "Sberbank".into(),
        }
    }

    fn report(id: &str, direction: Direction, executed: i64, amount: i64, status: ExecutionReportStatus) -> OrderState {
        OrderState {
            order_id: id.into(),
            figi: "BBG004730N88".into(),
            direction,
            order_type: OrderType::Market,
            lots_requested: 3,
            lots_executed: executed,
            executed_amount: Money::from(amount),
            initial_price: None,
            execution_report_status: status,
        }
    }

    #[test]
    fn cumulative_reports_apply_only_the_delta() {
        let mut stats = TradeStatistics::new(instrument(), Money::from(10_000), 0);

        assert_eq!(stats.add_trade(&report("a", Direction::Buy, 0, 0, ExecutionReportStatus::New)), 0);
        assert_eq!(stats.get_pending_orders().len(), 1);

        assert_eq!(stats.add_trade(&report("a", Direction::Buy, 1, 1_000, ExecutionReportStatus::PartiallyFill)), 1);
        assert_eq!(stats.add_trade(&report("a", Direction::Buy, 3, 3_000, ExecutionReportStatus::Fill)), 2);

        assert_eq!(stats.get_positions(), 3);
        assert_eq!(stats.get_money(), Money::from(7_000));
        assert!(stats.get_pending_orders().is_empty());
        assert_eq!(stats.trades().len(), 2);
        // 2000 for 2 lots of 10 units.
        assert_eq!(stats.trades()[1].price, Money::from(100));
    }

    #[test]
    fn finished_orders_are_applied_once() {
        let mut stats = TradeStatistics::new(instrument(), Money::ZERO, 5);
        let filled = report("s", Direction::Sell, 2, 400, ExecutionReportStatus::Fill);

        stats.add_trade(&filled);
        stats.add_trade(&filled);

        assert_eq!(stats.get_positions(), 3);
        assert_eq!(stats.get_money(), Money::from(400));
    }

    #[test]
    fn cancel_only_touches_pending_orders() {
        let mut stats = TradeStatistics::new(instrument(), Money::from(1_000), 0);
        stats.add_trade(&report("p", Direction::Buy, 0, 0, ExecutionReportStatus::New));
        stats.add_trade(&report("f", Direction::Buy, 3, 300, ExecutionReportStatus::Fill));

        assert!(stats.cancel_order("p"));
        assert!(!stats.cancel_order("p"));
        assert!(!stats.cancel_order("f"));
        assert!(!stats.cancel_order("unknown"));
        assert!(stats.get_pending_orders().is_empty());
    }

    #[test]
    fn fills_reported_after_a_cancel_still_count() {
        let mut stats = TradeStatistics::new(instrument(), Money::from(1_000), 0);
        stats.add_trade(&report("a", Direction::Buy, 0, 0, ExecutionReportStatus::New));

        assert!(stats.cancel_order("a"));
        assert!(stats.get_pending_orders().is_empty());
        assert_eq!(
            stats.add_trade(&report("a", Direction::Buy, 1, 100, ExecutionReportStatus::Cancelled)),
            1
        );

        assert_eq!(stats.get_positions(), 1);
        assert_eq!(stats.get_money(), Money::from(900));
        assert_eq!(
            stats.get_order("a").map(|o| o.execution_report_status),
            Some(ExecutionReportStatus::Cancelled)
        );
        // The terminal report closes the order for good.
        assert!(!stats.cancel_order("a"));
    }

    #[test]
    fn backtest_trades_move_balances() {
        let mut stats = TradeStatistics::new(instrument(), Money::from(1_000), 0);
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        stats.add_backtest_trade(time, 2, Money::new(12, 500_000_000), Direction::Buy);
        assert_eq!(stats.get_money(), Money::from(750));
        assert_eq!(stats.get_positions(), 2);

        stats.add_backtest_trade(time, 1, Money::from(15), Direction::Sell);
        assert_eq!(stats.get_money(), Money::from(900));
        assert_eq!(stats.get_positions(), 1);
        assert_eq!(stats.last_price(), Some(Money::from(15)));
        assert!(stats.trades().iter().all(|t| t.order_id.is_none()));
    }

    #[test]
    fn snapshot_reflects_ledger() {
        let mut stats = TradeStatistics::new(instrument(), Money::from(500), 4);
        stats.add_trade(&report("p", Direction::Sell, 0, 0, ExecutionReportStatus::New));

        let params = stats.strategy_params();
        assert_eq!(params.instrument_balance, 4);
        assert_eq!(params.currency_balance, Money::from(500));
        assert_eq!(params.pending_orders.len(), 1);
    }

    #[test]
    fn survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.json");
        let mut stats = TradeStatistics::new(instrument(), Money::from(1_000), 0);
        stats.add_trade(&report("a", Direction::Buy, 1, 100, ExecutionReportStatus::PartiallyFill));

        stats.save_to_file(&path).unwrap();
        let loaded = TradeStatistics::load_from_file(&path).unwrap();

        assert_eq!(loaded, stats);
    }

    #[test]
    fn out_of_range_amounts_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let stats = TradeStatistics::new(instrument(), Money::from(1_000), 0);
        stats.save_to_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap().replacen(
            "\"units\": 1000",
            "\"units\": 9223372036854775807",
            1,
        );
        let text = text.replacen("\"nano\": 0", "\"nano\": 1000000000", 1);
        std::fs::write(&path, text).unwrap();

        assert!(matches!(
            TradeStatistics::load_from_file(&path),
            Err(crate::Error::Json(_))
        ));
    }
}
