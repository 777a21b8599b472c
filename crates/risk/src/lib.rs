// In crates/risk/src/lib.rs

use core_types::{InstrumentInfo, Money, RobotTradeOrder, TradeStrategyParams};

pub mod balance_manager;
pub mod error;

// Re-export public types
pub use balance_manager::BalanceRiskManager;
pub use error::{Error, Result};

/// The universal interface for a pre-trade check.
///
/// A `RiskManager` looks at a candidate order before it leaves the robot and
/// either lets it through or vetoes it with a reason.
pub trait RiskManager: Send + Sync {
    /// The name of the risk management strategy.
    fn name(&self) -> &'static str;

    /// Evaluates a candidate order against the current balances.
    ///
    /// # Arguments
    ///
    /// * `order`: The order produced by a strategy.
    /// * `market_price`: The latest known unit price, used when the order has none.
    /// * `instrument`: Supplies the lot size.
    /// * `params`: The balance snapshot the strategy decided on.
    ///
    /// # Returns
    ///
    /// * `Ok(())`: If the order may be placed.
    /// * `Err(Error::Vetoed)`: If the order breaks a rule.
    fn evaluate(
        &self,
        order: &RobotTradeOrder,
        market_price: Option<Money>,
        instrument: &InstrumentInfo,
        params: &TradeStrategyParams,
    ) -> Result<()>;
}
