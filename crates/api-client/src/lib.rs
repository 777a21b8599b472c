// In crates/api-client/src/lib.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{
    Candle, CandleInterval, InstrumentInfo, InstrumentSelector, MarketDataSubscription, MarketUpdate,
    OrderState, TradingStatus,
};
use futures::stream::BoxStream;

pub mod error;
pub mod paper;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use paper::{PaperBroker, PaperConfig};
pub use types::*;

/// An ordered, possibly endless sequence of market-data events.
pub type MarketDataStream = BoxStream<'static, Result<MarketUpdate>>;

/// A finite, forward-only sequence of historic candles, oldest first.
pub type CandleStream = BoxStream<'static, Result<Candle>>;

/// The broker service as seen by the robot.
///
/// Implementations own the connection, authentication and transport. Every
/// call either succeeds or returns an [`Error`]; per-call timeouts are the
/// implementation's business.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Resolves an instrument by FIGI or by ticker and class code.
    async fn get_instrument(&self, selector: &InstrumentSelector) -> Result<InstrumentInfo>;

    /// Accounts reachable through the given endpoints.
    async fn get_accounts(&self, mode: TradingMode) -> Result<Vec<Account>>;

    /// Looks one account up among the accounts of `mode`.
    async fn get_account(&self, mode: TradingMode, account_id: &str) -> Result<Option<Account>> {
        Ok(self
            .get_accounts(mode)
            .await?
            .into_iter()
            .find(|account| account.id == account_id))
    }

    async fn get_positions(&self, mode: TradingMode, account_id: &str) -> Result<Positions>;

    async fn get_trading_status(&self, figi: &str) -> Result<TradingStatus>;

    /// Opens one stream carrying every requested subscription.
    async fn stream_market_data(&self, subscription: MarketDataSubscription) -> Result<MarketDataStream>;

    /// Candles with `from <= time < to`. `to = None` means up to now.
    async fn get_historic_candles(
        &self,
        figi: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        interval: CandleInterval,
    ) -> Result<CandleStream>;

    async fn post_order(&self, mode: TradingMode, request: PostOrderRequest) -> Result<OrderState>;

    async fn get_order_state(&self, mode: TradingMode, account_id: &str, order_id: &str) -> Result<OrderState>;

    async fn cancel_order(&self, mode: TradingMode, account_id: &str, order_id: &str) -> Result<()>;

    /// The broker's notion of the current time.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
