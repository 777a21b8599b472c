// In crates/execution/src/live.rs

use crate::{Error, Executor, Result};
use api_client::{BrokerClient, PostOrderRequest, TradingMode};
use async_trait::async_trait;
use core_types::{OrderState, RobotTradeOrder};
use std::sync::Arc;

/// An executor that places orders through a broker client.
///
/// The mode is fixed at construction: every call goes either to the sandbox
/// endpoints or to the live ones, never both.
#[derive(Clone)]
pub struct BrokerExecutor {
    client: Arc<dyn BrokerClient>,
    account_id: String,
    mode: TradingMode,
}

impl BrokerExecutor {
    pub fn new(client: Arc<dyn BrokerClient>, account_id: impl Into<String>, mode: TradingMode) -> Self {
        Self {
            client,
            account_id: account_id.into(),
            mode,
        }
    }

    pub fn mode(&self) -> TradingMode {
        self.mode
    }
}

#[async_trait]
impl Executor for BrokerExecutor {
    fn name(&self) -> &'static str {
        "BrokerExecutor"
    }

    async fn execute(&self, order: &RobotTradeOrder, figi: &str) -> Result<OrderState> {
        if order.quantity <= 0 {
            return Err(Error::ExecutionFailed {
                reason: format!("Order quantity must be positive, got {}", order.quantity),
            });
        }

        let request = PostOrderRequest {
            figi: figi.to_string(),
            quantity: order.quantity,
            price: order.price,
            direction: order.direction,
            order_type: order.order_type,
            account_id: self.account_id.clone(),
            client_order_id: uuid::Uuid::new_v4().to_string(),
        };
        tracing::debug!(
            mode = %self.mode,
            client_order_id = %request.client_order_id,
            ?order,
            "Submitting order."
        );

        let state = self.client.post_order(self.mode, request).await?;
        tracing::info!(
            mode = %self.mode,
            order_id = %state.order_id,
            direction = %state.direction,
            lots = state.lots_requested,
            status = ?state.execution_report_status,
            "Placed trade order."
        );
        Ok(state)
    }

    async fn order_state(&self, order_id: &str) -> Result<OrderState> {
        Ok(self
            .client
            .get_order_state(self.mode, &self.account_id, order_id)
            .await?)
    }

    async fn cancel(&self, order_id: &str) -> Result<()> {
        self.client
            .cancel_order(self.mode, &self.account_id, order_id)
            .await?;
        tracing::info!(mode = %self.mode, order_id, "Cancelled order.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::{
        AccessLevel, Account, AccountStatus, AccountType, PaperBroker, PaperConfig,
    };
    use chrono::{TimeZone, Utc};
    use core_types::{Candle, Direction, ExecutionReportStatus, InstrumentInfo, Money};

    fn broker(mode: TradingMode) -> Arc<PaperBroker> {
        Arc::new(PaperBroker::new(PaperConfig {
            instrument: InstrumentInfo {
                figi: "FIGI".into(),
                ticker: "TCKR".into(),
                class_code: "TQBR".into(),
                lot: 1,
                currency: "rub".into(),
                name: String::new(),
            },
            account: Account {
                id: "acc".into(),
                name: String::new(),
                account_type: AccountType::Brokerage,
                status: AccountStatus::Open,
                access_level: AccessLevel::FullAccess,
            },
            account_mode: mode,
            money: Money::from(100),
            lots: 0,
            candles: vec![Candle::flat(
                Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                Money::from(10),
            )],
            replay_from: None,
            replay_delay: None,
        }))
    }

    #[tokio::test]
    async fn orders_go_to_the_configured_mode() {
        let executor = BrokerExecutor::new(broker(TradingMode::Sandbox), "acc", TradingMode::Sandbox);

        let state = executor
            .execute(&RobotTradeOrder::market(2, Direction::Buy), "FIGI")
            .await
            .unwrap();

        assert_eq!(state.execution_report_status, ExecutionReportStatus::Fill);
        let polled = executor.order_state(&state.order_id).await.unwrap();
        assert_eq!(polled, state);
    }

    #[tokio::test]
    async fn wrong_mode_surfaces_the_broker_error() {
        let executor = BrokerExecutor::new(broker(TradingMode::Sandbox), "acc", TradingMode::Live);

        let result = executor
            .execute(&RobotTradeOrder::market(1, Direction::Buy), "FIGI")
            .await;

        assert!(matches!(result, Err(Error::ApiClientError(api_client::Error::NotFound(_)))));
    }

    #[tokio::test]
    async fn each_submission_is_a_new_order() {
        let executor = BrokerExecutor::new(broker(TradingMode::Sandbox), "acc", TradingMode::Sandbox);
        let order = RobotTradeOrder::market(1, Direction::Buy);

        let first = executor.execute(&order, "FIGI").await.unwrap();
        let second = executor.execute(&order, "FIGI").await.unwrap();

        assert_ne!(first.order_id, second.order_id);
    }
}
