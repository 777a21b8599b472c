// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{OrderState, RobotTradeOrder};

pub mod error;
pub mod live;
pub mod simulated;

// Re-export public types
pub use error::{Error, Result};
pub use live::BrokerExecutor;
pub use simulated::SimulatedAccount;

/// The universal interface for an execution handler.
///
/// An `Executor` takes a validated `RobotTradeOrder` to a target venue and
/// answers questions about the orders it placed there. One executor serves a
/// single account and a fixed trading mode.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The name of the executor (e.g., "BrokerExecutor").
    fn name(&self) -> &'static str;

    /// Places an order for `figi` and returns the broker's first report on it.
    async fn execute(&self, order: &RobotTradeOrder, figi: &str) -> Result<OrderState>;

    /// Fetches the current state of an order placed earlier.
    async fn order_state(&self, order_id: &str) -> Result<OrderState>;

    async fn cancel(&self, order_id: &str) -> Result<()>;
}
