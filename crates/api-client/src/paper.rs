// In crates/api-client/src/paper.rs

use crate::types::{Account, MoneyBalance, Positions, PostOrderRequest, SecurityPosition, TradingMode};
use crate::{BrokerClient, CandleStream, Error, MarketDataStream, Result};
use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use core_types::{
    Candle, CandleInterval, Direction, ExecutionReportStatus, InstrumentInfo, InstrumentSelector,
    MarketDataSubscription, MarketUpdate, Money, OrderState, OrderType, TradingStatus,
};
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Broker error code for a malformed order.
const INVALID_ORDER: i64 = 30_001;
/// Broker error code for cancelling an order that already finished.
const ORDER_FINISHED: i64 = 30_059;

/// The market and account a [`PaperBroker`] simulates.
#[derive(Debug, Clone)]
pub struct PaperConfig {
    pub instrument: InstrumentInfo,
    pub account: Account,
    /// The endpoints that list the account.
    pub account_mode: TradingMode,
    pub money: Money,
    /// Starting balance in lots.
    pub lots: i64,
    /// One-minute candles, any order.
    pub candles: Vec<Candle>,
    /// Candles before this instant are history, the rest are streamed.
    /// Defaults to one minute after the last candle, so everything is history.
    pub replay_from: Option<DateTime<Utc>>,
    /// Pause before each streamed candle.
    pub replay_delay: Option<std::time::Duration>,
}

#[derive(Debug)]
struct PaperState {
    money: Money,
    lots: i64,
    last_close: Option<Money>,
    orders: BTreeMap<String, OrderState>,
    /// Client order id -> broker order id.
    client_ids: HashMap<String, String>,
    next_order: u64,
    market_open: bool,
}

impl PaperState {
    /// Executes the whole order at `price`, or rejects it if the account cannot cover it.
    fn fill(&mut self, order: &mut OrderState, price: Money, lot: i64) {
        let quantity = order.lots_requested;
        let amount = price.checked_mul_int(lot).and_then(|p| p.checked_mul_int(quantity));
        let covered = match (order.direction, amount) {
            (Direction::Buy, Some(amount)) => amount <= self.money,
            (Direction::Sell, Some(_)) => quantity <= self.lots,
            (_, None) => false,
        };
        let Some(amount) = amount.filter(|_| covered) else {
            tracing::warn!(order_id = %order.order_id, "Paper account cannot cover the order.");
            order.execution_report_status = ExecutionReportStatus::Rejected;
            return;
        };

        match order.direction {
            Direction::Buy => {
                self.money -= amount;
                self.lots += quantity;
            }
            Direction::Sell => {
                self.money += amount;
                self.lots -= quantity;
            }
        }
        order.lots_executed = quantity;
        order.executed_amount = amount;
        order.execution_report_status = ExecutionReportStatus::Fill;
    }

    /// Fills resting limit orders that `close` crosses, at their limit price.
    fn match_resting(&mut self, close: Money, lot: i64) {
        let crossed: Vec<String> = self
            .orders
            .values()
            .filter(|o| o.is_pending() && o.order_type == OrderType::Limit)
            .filter(|o| match (o.direction, o.initial_price) {
                (Direction::Buy, Some(limit)) => close <= limit,
                (Direction::Sell, Some(limit)) => close >= limit,
                (_, None) => false,
            })
            .map(|o| o.order_id.clone())
            .collect();

        for order_id in crossed {
            if let Some(mut order) = self.orders.remove(&order_id) {
                let price = order.initial_price.unwrap_or(close);
                self.fill(&mut order, price, lot);
                tracing::debug!(
                    order_id = %order_id,
                    status = ?order.execution_report_status,
                    "Resting limit order crossed."
                );
                self.orders.insert(order_id, order);
            }
        }
    }
}

/// An in-memory sandbox broker.
///
/// Replays a fixed series of candles as the market and keeps one paper account.
/// Market orders fill in full at the last streamed close. Limit orders rest
/// until a later close crosses their price. Orders the account cannot cover
/// are rejected. When the replay runs out, trading becomes unavailable and the
/// stream reports it through the info subscription.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    config: Arc<PaperConfig>,
    clock: DateTime<Utc>,
    state: Arc<Mutex<PaperState>>,
}

impl PaperBroker {
    pub fn new(mut config: PaperConfig) -> Self {
        config.candles.sort_by_key(|c| c.time);
        let clock = config
            .replay_from
            .or_else(|| config.candles.last().map(|c| c.time + Duration::minutes(1)))
            .unwrap_or_else(Utc::now);
        let last_close = config
            .candles
            .iter()
            .take_while(|c| c.time < clock)
            .last()
            .map(|c| c.close);

        let state = PaperState {
            money: config.money,
            lots: config.lots,
            last_close,
            orders: BTreeMap::new(),
            client_ids: HashMap::new(),
            next_order: 0,
            market_open: true,
        };
        tracing::info!(
            figi = %config.instrument.figi,
            candles = config.candles.len(),
            %clock,
            "Paper broker ready."
        );
        Self {
            config: Arc::new(config),
            clock,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Reads a JSON array of candles.
    pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Current paper money and lots.
    pub async fn balances(&self) -> (Money, i64) {
        let state = self.state.lock().await;
        (state.money, state.lots)
    }

    fn check_account(&self, mode: TradingMode, account_id: &str) -> Result<()> {
        if account_id == self.config.account.id && mode == self.config.account_mode {
            Ok(())
        } else {
            Err(Error::NotFound(format!("{mode} account {account_id}")))
        }
    }

    fn check_figi(&self, figi: &str) -> Result<()> {
        if figi == self.config.instrument.figi {
            Ok(())
        } else {
            Err(Error::NotFound(format!("instrument {figi}")))
        }
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn get_instrument(&self, selector: &InstrumentSelector) -> Result<InstrumentInfo> {
        let instrument = &self.config.instrument;
        let found = match selector {
            InstrumentSelector::Figi(figi) => *figi == instrument.figi,
            InstrumentSelector::Ticker { ticker, class_code } => {
                *ticker == instrument.ticker && *class_code == instrument.class_code
            }
        };
        if found {
            Ok(instrument.clone())
        } else {
            Err(Error::NotFound(format!("instrument {selector}")))
        }
    }

    async fn get_accounts(&self, mode: TradingMode) -> Result<Vec<Account>> {
        if mode == self.config.account_mode {
            Ok(vec![self.config.account.clone()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn get_positions(&self, mode: TradingMode, account_id: &str) -> Result<Positions> {
        self.check_account(mode, account_id)?;
        let state = self.state.lock().await;
        let mut positions = Positions {
            money: vec![MoneyBalance {
                currency: self.config.instrument.currency.clone(),
                amount: state.money,
            }],
            securities: Vec::new(),
        };
        if state.lots != 0 {
            positions.securities.push(SecurityPosition {
                figi: self.config.instrument.figi.clone(),
                balance: state.lots,
            });
        }
        Ok(positions)
    }

    async fn get_trading_status(&self, figi: &str) -> Result<TradingStatus> {
        self.check_figi(figi)?;
        let open = self.state.lock().await.market_open;
        Ok(TradingStatus {
            figi: figi.to_string(),
            market_order_available: open,
            limit_order_available: open,
        })
    }

    async fn stream_market_data(&self, subscription: MarketDataSubscription) -> Result<MarketDataStream> {
        self.check_figi(&subscription.figi)?;
        let replay: Vec<Candle> = self
            .config
            .candles
            .iter()
            .filter(|c| c.time >= self.clock)
            .cloned()
            .collect();
        let state = Arc::clone(&self.state);
        let lot = self.config.instrument.lot;
        let delay = self.config.replay_delay;
        tracing::info!(
            figi = %subscription.figi,
            candles = replay.len(),
            candle_interval = ?subscription.candle_interval,
            "Paper market data stream opened."
        );

        let updates = stream! {
            for candle in replay {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                {
                    let mut state = state.lock().await;
                    state.last_close = Some(candle.close);
                    state.match_resting(candle.close, lot);
                }
                if subscription.candle_interval.is_some() {
                    yield Ok(MarketUpdate::Candle(candle));
                }
            }

            state.lock().await.market_open = false;
            tracing::info!(figi = %subscription.figi, "Paper session is over.");
            if subscription.info {
                yield Ok(MarketUpdate::TradingStatus(TradingStatus {
                    figi: subscription.figi.clone(),
                    market_order_available: false,
                    limit_order_available: false,
                }));
            }
        };
        Ok(updates.boxed())
    }

    async fn get_historic_candles(
        &self,
        figi: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        interval: CandleInterval,
    ) -> Result<CandleStream> {
        self.check_figi(figi)?;
        if interval != CandleInterval::OneMinute {
            return Err(Error::ApiError {
                code: INVALID_ORDER,
                msg: format!("paper broker only keeps one-minute candles, got {interval:?}"),
            });
        }
        let to = to.map_or(self.clock, |to| to.min(self.clock));
        let candles: Vec<Result<Candle>> = self
            .config
            .candles
            .iter()
            .filter(|c| c.time >= from && c.time < to)
            .cloned()
            .map(Ok)
            .collect();
        Ok(futures::stream::iter(candles).boxed())
    }

    async fn post_order(&self, mode: TradingMode, request: PostOrderRequest) -> Result<OrderState> {
        self.check_account(mode, &request.account_id)?;
        self.check_figi(&request.figi)?;
        if request.quantity <= 0 {
            return Err(Error::ApiError {
                code: INVALID_ORDER,
                msg: format!("quantity must be positive, got {}", request.quantity),
            });
        }
        if request.order_type == OrderType::Limit && request.price.is_none() {
            return Err(Error::ApiError {
                code: INVALID_ORDER,
                msg: "limit order without a price".to_string(),
            });
        }

        let mut state = self.state.lock().await;
        if let Some(order_id) = state.client_ids.get(&request.client_order_id) {
            return state
                .orders
                .get(order_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("order {order_id}")));
        }
        if !state.market_open {
            return Err(Error::Unavailable("trading session is over".to_string()));
        }

        state.next_order += 1;
        let mut order = OrderState {
            order_id: format!("paper-{}", state.next_order),
            figi: request.figi.clone(),
            direction: request.direction,
            order_type: request.order_type,
            lots_requested: request.quantity,
            lots_executed: 0,
            executed_amount: Money::ZERO,
            initial_price: request.price,
            execution_report_status: ExecutionReportStatus::New,
        };

        let lot = self.config.instrument.lot;
        match (request.order_type, state.last_close) {
            (OrderType::Market, Some(close)) => state.fill(&mut order, close, lot),
            (OrderType::Market, None) => {
                tracing::warn!(order_id = %order.order_id, "No market price yet, rejecting.");
                order.execution_report_status = ExecutionReportStatus::Rejected;
            }
            (OrderType::Limit, _) => {}
        }

        let order_id = order.order_id.clone();
        state.client_ids.insert(request.client_order_id, order_id.clone());
        state.orders.insert(order_id.clone(), order);
        if let Some(close) = state.last_close {
            state.match_resting(close, lot);
        }
        let order = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("order {order_id}")))?;

        tracing::info!(
            order_id = %order.order_id,
            direction = %order.direction,
            lots = order.lots_requested,
            status = ?order.execution_report_status,
            "Paper order accepted."
        );
        Ok(order)
    }

    async fn get_order_state(&self, mode: TradingMode, account_id: &str, order_id: &str) -> Result<OrderState> {
        self.check_account(mode, account_id)?;
        self.state
            .lock()
            .await
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("order {order_id}")))
    }

    async fn cancel_order(&self, mode: TradingMode, account_id: &str, order_id: &str) -> Result<()> {
        self.check_account(mode, account_id)?;
        let mut state = self.state.lock().await;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| Error::NotFound(format!("order {order_id}")))?;
        if !order.is_pending() {
            return Err(Error::ApiError {
                code: ORDER_FINISHED,
                msg: format!("order {order_id} is already {:?}", order.execution_report_status),
            });
        }
        order.execution_report_status = ExecutionReportStatus::Cancelled;
        tracing::info!(order_id, "Paper order cancelled.");
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessLevel, AccountStatus, AccountType};
    use chrono::TimeZone;
    use futures::TryStreamExt;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn config(closes: &[i64], replay_from_minute: Option<i64>) -> PaperConfig {
        PaperConfig {
            instrument: InstrumentInfo {
                figi: "BBG000000001".into(),
                ticker: "TEST".into(),
                class_code: "TQBR".into(),
                lot: 1,
                currency: "rub".into(),
                name: "Test".into(),
            },
            account: Account {
                id: "acc-1".into(),
                name: "paper".into(),
                account_type: AccountType::Brokerage,
                status: AccountStatus::Open,
                access_level: AccessLevel::FullAccess,
            },
            account_mode: TradingMode::Sandbox,
            money: Money::from(100),
            lots: 0,
            candles: closes
                .iter()
                .enumerate()
                .map(|(i, close)| Candle::flat(start() + Duration::minutes(i as i64), Money::from(*close)))
                .collect(),
            replay_from: replay_from_minute.map(|m| start() + Duration::minutes(m)),
            replay_delay: None,
        }
    }

    fn request(id: &str, quantity: i64, direction: Direction, price: Option<i64>) -> PostOrderRequest {
        PostOrderRequest {
            figi: "BBG000000001".into(),
            quantity,
            price: price.map(Money::from),
            direction,
            order_type: if price.is_some() { OrderType::Limit } else { OrderType::Market },
            account_id: "acc-1".into(),
            client_order_id: id.into(),
        }
    }

    #[tokio::test]
    async fn market_buy_fills_at_last_close() {
        let broker = PaperBroker::new(config(&[12, 10], None));

        let order = broker
            .post_order(TradingMode::Sandbox, request("c1", 3, Direction::Buy, None))
            .await
            .unwrap();

        assert_eq!(order.execution_report_status, ExecutionReportStatus::Fill);
        assert_eq!(order.executed_amount, Money::from(30));
        assert_eq!(broker.balances().await, (Money::from(70), 3));
    }

    #[tokio::test]
    async fn uncovered_orders_are_rejected() {
        let broker = PaperBroker::new(config(&[10], None));

        let buy = broker
            .post_order(TradingMode::Sandbox, request("c1", 11, Direction::Buy, None))
            .await
            .unwrap();
        let sell = broker
            .post_order(TradingMode::Sandbox, request("c2", 1, Direction::Sell, None))
            .await
            .unwrap();

        assert_eq!(buy.execution_report_status, ExecutionReportStatus::Rejected);
        assert_eq!(sell.execution_report_status, ExecutionReportStatus::Rejected);
        assert_eq!(broker.balances().await, (Money::from(100), 0));
    }

    #[tokio::test]
    async fn market_order_without_price_is_rejected() {
        let broker = PaperBroker::new(config(&[10, 11], Some(0)));
        let order = broker
            .post_order(TradingMode::Sandbox, request("c1", 1, Direction::Buy, None))
            .await
            .unwrap();
        assert_eq!(order.execution_report_status, ExecutionReportStatus::Rejected);
    }

    #[tokio::test]
    async fn limit_order_rests_until_crossed() {
        let broker = PaperBroker::new(config(&[10, 10, 9, 7], Some(1)));
        let order = broker
            .post_order(TradingMode::Sandbox, request("c1", 2, Direction::Buy, Some(8)))
            .await
            .unwrap();
        assert_eq!(order.execution_report_status, ExecutionReportStatus::New);

        let mut stream = broker
            .stream_market_data(MarketDataSubscription {
                figi: "BBG000000001".into(),
                candle_interval: Some(CandleInterval::OneMinute),
                order_book_depth: None,
                trades: false,
                info: true,
            })
            .await
            .unwrap();
        stream.next().await.unwrap().unwrap();
        stream.next().await.unwrap().unwrap();
        let state = broker
            .get_order_state(TradingMode::Sandbox, "acc-1", &order.order_id)
            .await
            .unwrap();
        assert!(state.is_pending());

        stream.next().await.unwrap().unwrap();
        let state = broker
            .get_order_state(TradingMode::Sandbox, "acc-1", &order.order_id)
            .await
            .unwrap();
        assert_eq!(state.execution_report_status, ExecutionReportStatus::Fill);
        // Filled at the limit price, not the close.
        assert_eq!(state.executed_amount, Money::from(16));
    }

    #[tokio::test]
    async fn cancel_only_pending_orders() {
        let broker = PaperBroker::new(config(&[10], None));
        let resting = broker
            .post_order(TradingMode::Sandbox, request("c1", 1, Direction::Buy, Some(5)))
            .await
            .unwrap();
        let filled = broker
            .post_order(TradingMode::Sandbox, request("c2", 1, Direction::Buy, None))
            .await
            .unwrap();

        broker
            .cancel_order(TradingMode::Sandbox, "acc-1", &resting.order_id)
            .await
            .unwrap();
        let err = broker
            .cancel_order(TradingMode::Sandbox, "acc-1", &filled.order_id)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ApiError { code: ORDER_FINISHED, .. }));
        let state = broker
            .get_order_state(TradingMode::Sandbox, "acc-1", &resting.order_id)
            .await
            .unwrap();
        assert_eq!(state.execution_report_status, ExecutionReportStatus::Cancelled);
    }

    #[tokio::test]
    async fn repeated_client_id_returns_the_same_order() {
        let broker = PaperBroker::new(config(&[10], None));
        let first = broker
            .post_order(TradingMode::Sandbox, request("same", 1, Direction::Buy, None))
            .await
            .unwrap();
        let second = broker
            .post_order(TradingMode::Sandbox, request("same", 1, Direction::Buy, None))
            .await
            .unwrap();

        assert_eq!(first.order_id, second.order_id);
        assert_eq!(broker.balances().await, (Money::from(90), 1));
    }

    #[tokio::test]
    async fn stream_ends_with_trading_unavailable() {
        let broker = PaperBroker::new(config(&[10, 11, 12], Some(1)));
        let updates: Vec<MarketUpdate> = broker
            .stream_market_data(MarketDataSubscription {
                figi: "BBG000000001".into(),
                candle_interval: Some(CandleInterval::OneMinute),
                order_book_depth: None,
                trades: false,
                info: true,
            })
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(updates.len(), 3);
        assert!(matches!(
            updates.last(),
            Some(MarketUpdate::TradingStatus(TradingStatus { market_order_available: false, .. }))
        ));
        let status = broker.get_trading_status("BBG000000001").await.unwrap();
        assert!(!status.market_order_available);
    }

    #[tokio::test]
    async fn history_stops_at_the_clock() {
        let broker = PaperBroker::new(config(&[10, 11, 12, 13], Some(2)));
        let history: Vec<Candle> = broker
            .get_historic_candles("BBG000000001", start(), None, CandleInterval::OneMinute)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(broker.now(), start() + Duration::minutes(2));
    }

    #[tokio::test]
    async fn accounts_are_listed_under_their_mode_only() {
        let broker = PaperBroker::new(config(&[10], None));
        assert!(broker.get_account(TradingMode::Sandbox, "acc-1").await.unwrap().is_some());
        assert!(broker.get_account(TradingMode::Live, "acc-1").await.unwrap().is_none());
        assert!(matches!(
            broker
                .post_order(TradingMode::Live, request("c1", 1, Direction::Buy, None))
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn candles_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candles.json");
        let candles = config(&[10, 11], None).candles;
        std::fs::write(&path, serde_json::to_string(&candles).unwrap()).unwrap();

        assert_eq!(PaperBroker::load_candles(&path).unwrap(), candles);
    }
}
