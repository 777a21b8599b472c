// In crates/engine/src/bot.rs

use crate::reconciler::OrderTracker;
use crate::Result;
use analytics::TradeStatistics;
use api_client::{BrokerClient, CandleStream, TradingMode};
use backtester::Backtester;
use chrono::{DateTime, Duration, Utc};
use core_types::{
    Candle, CandleInterval, InstrumentInfo, MarketDataSubscription, MarketUpdate, Money, OrderState,
    RobotTradeOrder, TradeStrategyParams,
};
use execution::Executor;
use futures::StreamExt;
use risk::{BalanceRiskManager, RiskManager};
use std::sync::Arc;
use strategies::Strategy;

/// Minutes of history the strategy sees before live trading starts.
const WARM_UP_MINUTES: i64 = 60;

/// One strategy trading one instrument on one account.
pub struct TradingRobot {
    client: Arc<dyn BrokerClient>,
    executor: Box<dyn Executor>,
    risk_manager: Box<dyn RiskManager>,
    strategy: Box<dyn Strategy>,
    instrument: Arc<InstrumentInfo>,
    stats: TradeStatistics,
    tracker: OrderTracker,
    /// Latest candle close or trade price.
    last_price: Option<Money>,
    mode: TradingMode,
}

impl TradingRobot {
    /// Creates a robot with the balance risk checks.
    pub fn new(
        client: Arc<dyn BrokerClient>,
        executor: Box<dyn Executor>,
        strategy: Box<dyn Strategy>,
        instrument: Arc<InstrumentInfo>,
        stats: TradeStatistics,
        mode: TradingMode,
    ) -> Self {
        tracing::info!(
            strategy = strategy.strategy_id(),
            figi = %instrument.figi,
            %mode,
            "Creating trading robot."
        );
        Self {
            client,
            executor,
            risk_manager: Box::new(BalanceRiskManager::new()),
            strategy,
            instrument,
            stats,
            tracker: OrderTracker::new(),
            last_price: None,
            mode,
        }
    }

    pub fn with_risk_manager(mut self, risk_manager: Box<dyn RiskManager>) -> Self {
        self.risk_manager = risk_manager;
        self
    }

    pub fn statistics(&self) -> &TradeStatistics {
        &self.stats
    }

    pub fn tracker(&self) -> &OrderTracker {
        &self.tracker
    }

    pub fn instrument(&self) -> &InstrumentInfo {
        &self.instrument
    }

    pub fn mode(&self) -> TradingMode {
        self.mode
    }

    /// Trades until the broker reports that market orders are no longer
    /// available or the stream fails. Broker failures end the session; they
    /// are logged and never returned.
    pub async fn trade(&mut self) -> TradeStatistics {
        tracing::info!(strategy = self.strategy.strategy_id(), "Starting trading.");

        let now = self.client.now();
        let from = now - Duration::minutes(WARM_UP_MINUTES);
        let history = load_historic_data(self.client.as_ref(), &self.instrument.figi, from, None).await;
        self.strategy.load_candles(&history);

        match self.client.get_trading_status(&self.instrument.figi).await {
            Ok(status) if !status.market_order_available => {
                tracing::warn!("Market trading is not available now.");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to fetch trading status."),
        }

        let subscription = self.subscription();
        tracing::debug!(?subscription, "Subscribing to market data.");
        let mut stream = match self.client.stream_market_data(subscription).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open market data stream, stopping trading.");
                return self.stats.clone();
            }
        };

        while let Some(message) = stream.next().await {
            match message {
                Ok(MarketUpdate::TradingStatus(status)) => {
                    if !status.market_order_available {
                        tracing::info!(?status, "Trading is limited, stopping.");
                        break;
                    }
                    tracing::debug!(?status, "Trading status update.");
                }
                Ok(update) => self.on_update(&update).await,
                Err(e) => {
                    tracing::error!(error = %e, "Caught broker error, stopping trading.");
                    break;
                }
            }
        }

        tracing::info!(
            trades = self.stats.trades().len(),
            money = %self.stats.get_money(),
            positions = self.stats.get_positions(),
            pending = self.tracker.len(),
            "Trading stopped."
        );
        self.stats.clone()
    }

    /// Replays recent history through the strategy without placing orders.
    ///
    /// The test window is the last `test_duration`. With a `train_duration`,
    /// the window right before it warms the strategy up first.
    pub async fn backtest(
        &mut self,
        initial: TradeStrategyParams,
        test_duration: Duration,
        train_duration: Option<Duration>,
    ) -> Result<TradeStatistics> {
        let now = self.client.now();
        let test_start = now - test_duration;
        let train = match train_duration {
            Some(train) => Some(
                load_historic_data(
                    self.client.as_ref(),
                    &self.instrument.figi,
                    test_start - train,
                    Some(test_start),
                )
                .await,
            ),
            None => None,
        };
        let test = open_history(self.client.as_ref(), &self.instrument.figi, test_start, None).await;

        let mut backtester = Backtester::new(self.strategy.as_mut(), &self.instrument, &initial);
        if let Some(train) = train {
            backtester.warm_up(&train);
        }
        if let Some(mut test) = test {
            while let Some(candle) = test.next().await {
                match candle {
                    Ok(candle) => backtester.step(&candle)?,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to load historical data.");
                        break;
                    }
                }
            }
        }
        Ok(backtester.finish())
    }

    fn subscription(&self) -> MarketDataSubscription {
        MarketDataSubscription {
            figi: self.instrument.figi.clone(),
            candle_interval: self.strategy.candle_subscription_interval(),
            order_book_depth: self.strategy.order_book_subscription_depth(),
            trades: self.strategy.trades_subscription(),
            info: true,
        }
    }

    async fn on_update(&mut self, update: &MarketUpdate) {
        match update {
            MarketUpdate::Candle(candle) => self.observe_price(candle.close),
            MarketUpdate::Trade(trade) => self.observe_price(trade.price),
            _ => {}
        }

        self.tracker.reconcile(self.executor.as_ref(), &mut self.stats).await;

        let params = self.stats.strategy_params();
        tracing::debug!(?params, "Running strategy.");
        let decision = self.strategy.decide(update, &params);
        if decision.is_empty() {
            return;
        }
        tracing::debug!(?decision, "Strategy decision.");

        if !decision.cancel_orders.is_empty() {
            self.cancel_orders(&decision.cancel_orders).await;
        }

        if let Some(order) = decision.robot_trade_order {
            let params = self.stats.strategy_params();
            match self
                .risk_manager
                .evaluate(&order, self.last_price, &self.instrument, &params)
            {
                Ok(()) => self.post_trade_order(&order).await,
                Err(e) => tracing::warn!(
                    risk_manager = self.risk_manager.name(),
                    error = %e,
                    "Strategy decision cannot be executed."
                ),
            }
        }
    }

    fn observe_price(&mut self, price: Money) {
        self.last_price = Some(price);
        self.stats.mark_price(price);
    }

    async fn cancel_orders(&mut self, orders: &[OrderState]) {
        for order in orders {
            match self.executor.cancel(&order.order_id).await {
                Ok(()) => {
                    self.stats.cancel_order(&order.order_id);
                }
                Err(e) => {
                    tracing::error!(order_id = %order.order_id, error = %e, "Failed to cancel order.");
                }
            }
        }
    }

    async fn post_trade_order(&mut self, order: &RobotTradeOrder) {
        match self.executor.execute(order, &self.instrument.figi).await {
            Ok(state) => {
                self.tracker.track(&state);
                self.stats.add_trade(&state);
            }
            Err(e) => {
                tracing::error!(?order, error = %e, "Posting trade order failed.");
            }
        }
    }
}

async fn open_history(
    client: &dyn BrokerClient,
    figi: &str,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
) -> Option<CandleStream> {
    match client
        .get_historic_candles(figi, from, to, CandleInterval::OneMinute)
        .await
    {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load historical data.");
            None
        }
    }
}

/// Collects history, keeping whatever arrived before a failure.
async fn load_historic_data(
    client: &dyn BrokerClient,
    figi: &str,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
) -> Vec<Candle> {
    let mut candles = Vec::new();
    let Some(mut stream) = open_history(client, figi, from, to).await else {
        return candles;
    };
    while let Some(candle) = stream.next().await {
        match candle {
            Ok(candle) => candles.push(candle),
            Err(e) => {
                tracing::error!(error = %e, loaded = candles.len(), "Failed to load historical data.");
                break;
            }
        }
    }
    tracing::debug!(%from, loaded = candles.len(), "Historical data loaded.");
    candles
}
