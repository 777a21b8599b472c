// In crates/analytics/src/engine.rs

use crate::statistics::TradeStatistics;
use crate::types::{EquityPoint, PerformanceReport};
use core_types::{Direction, Money};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// The engine responsible for calculating performance metrics from a ledger.
#[derive(Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates a performance report from the trades recorded in `stats`.
    ///
    /// Lots are valued at the first known price for the initial equity and at
    /// the last known price for the final one.
    pub fn calculate(&self, stats: &TradeStatistics) -> PerformanceReport {
        let mut report = PerformanceReport::new();
        let lot = Decimal::from(stats.instrument().lot);
        let trades = stats.trades();

        report.initial_money = stats.initial_money().to_decimal();
        report.initial_positions = stats.initial_positions();
        report.final_money = stats.get_money().to_decimal();
        report.final_positions = stats.get_positions();

        // --- Trade counts and volume ---
        report.total_trades = trades.len() as u32;
        for trade in trades {
            match trade.direction {
                Direction::Buy => {
                    report.buy_trades += 1;
                    report.lots_bought += trade.lots;
                }
                Direction::Sell => {
                    report.sell_trades += 1;
                    report.lots_sold += trade.lots;
                }
            }
            report.turnover += trade.amount.abs().to_decimal();
        }

        let first_price = trades
            .first()
            .map(|t| t.price)
            .or(stats.last_price())
            .unwrap_or(Money::ZERO)
            .to_decimal();
        let last_price = stats.last_price().unwrap_or(Money::ZERO).to_decimal();

        report.initial_equity = report.initial_money + Decimal::from(report.initial_positions) * lot * first_price;
        report.final_equity = report.final_money + Decimal::from(report.final_positions) * lot * last_price;

        // --- Net P&L ---
        report.net_pnl_absolute = report.final_equity - report.initial_equity;
        if report.initial_equity > dec!(0) {
            report.net_pnl_percentage = (report.net_pnl_absolute / report.initial_equity)
                .to_f64()
                .unwrap_or(0.0)
                * 100.0;
        }

        // --- Max drawdown over the equity curve ---
        let equity_curve = self.equity_curve(stats);
        let mut peak_equity = report.initial_equity;
        let mut max_drawdown = dec!(0);
        for point in &equity_curve {
            peak_equity = peak_equity.max(point.value);
            max_drawdown = max_drawdown.max(peak_equity - point.value);
        }
        report.max_drawdown_absolute = max_drawdown;
        if peak_equity > dec!(0) {
            report.max_drawdown_percentage = (max_drawdown / peak_equity).to_f64().unwrap_or(0.0) * 100.0;
        }

        tracing::debug!(
            trades = report.total_trades,
            net_pnl = %report.net_pnl_absolute,
            "Performance report calculated."
        );
        report
    }

    /// Account value after every trade, marked at that trade's price.
    pub fn equity_curve(&self, stats: &TradeStatistics) -> Vec<EquityPoint> {
        let lot = Decimal::from(stats.instrument().lot);
        let mut money = stats.initial_money().to_decimal();
        let mut positions = stats.initial_positions();

        stats
            .trades()
            .iter()
            .map(|trade| {
                let amount = trade.amount.to_decimal();
                match trade.direction {
                    Direction::Buy => {
                        money -= amount;
                        positions += trade.lots;
                    }
                    Direction::Sell => {
                        money += amount;
                        positions -= trade.lots;
                    }
                }
                EquityPoint {
                    timestamp: trade.time,
                    value: money + Decimal::from(positions) * lot * trade.price.to_decimal(),
                }
            })
            .collect()
    }
}
