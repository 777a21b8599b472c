// In crates/engine/src/reconciler.rs

use analytics::TradeStatistics;
use core_types::{Direction, ExecutionReportStatus, Money, OrderState};
use execution::Executor;
use std::collections::BTreeMap;

/// What the robot knows locally about one of its orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderExecutionInfo {
    pub direction: Direction,
    /// Lots filled so far.
    pub lots: i64,
    /// Money filled so far.
    pub amount: Money,
}

/// Keeps the robot's in-flight orders in step with the broker.
///
/// An order is tracked from placement until the broker reports it filled,
/// rejected or cancelled. Every report is also written to the ledger.
#[derive(Debug, Default)]
pub struct OrderTracker {
    orders: BTreeMap<String, OrderExecutionInfo>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a freshly placed order.
    pub fn track(&mut self, order: &OrderState) {
        self.orders.insert(
            order.order_id.clone(),
            OrderExecutionInfo {
                direction: order.direction,
                lots: order.lots_executed,
                amount: order.executed_amount,
            },
        );
    }

    pub fn get(&self, order_id: &str) -> Option<&OrderExecutionInfo> {
        self.orders.get(order_id)
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.orders.contains_key(order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Polls the broker once for every tracked order.
    ///
    /// A failed status fetch is logged and that order is retried on the next
    /// call. It never stops the remaining orders from being reconciled.
    pub async fn reconcile(&mut self, executor: &dyn Executor, stats: &mut TradeStatistics) {
        tracing::debug!(orders = self.orders.len(), "Updating trade orders info.");
        let order_ids: Vec<String> = self.orders.keys().cloned().collect();

        for order_id in order_ids {
            let state = match executor.order_state(&order_id).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!(order_id = %order_id, error = %e, "Failed to fetch order state.");
                    continue;
                }
            };

            stats.add_trade(&state);
            match state.execution_report_status {
                ExecutionReportStatus::Fill => {
                    tracing::info!(order_id = %order_id, "Trade order has been FULLY FILLED.");
                    self.orders.remove(&order_id);
                }
                ExecutionReportStatus::Rejected => {
                    tracing::warn!(order_id = %order_id, "Trade order has been REJECTED.");
                    self.orders.remove(&order_id);
                }
                ExecutionReportStatus::Cancelled => {
                    tracing::warn!(order_id = %order_id, "Trade order has been CANCELLED.");
                    self.orders.remove(&order_id);
                }
                ExecutionReportStatus::PartiallyFill => {
                    tracing::info!(
                        order_id = %order_id,
                        lots = state.lots_executed,
                        "Trade order has been PARTIALLY FILLED."
                    );
                    self.orders.insert(
                        order_id,
                        OrderExecutionInfo {
                            direction: state.direction,
                            lots: state.lots_executed,
                            amount: state.executed_amount,
                        },
                    );
                }
                ExecutionReportStatus::New | ExecutionReportStatus::Unspecified => {
                    tracing::debug!(order_id = %order_id, "No updates on order.");
                }
            }
        }

        tracing::debug!(orders = self.orders.len(), "Trade orders updated.");
    }
}
