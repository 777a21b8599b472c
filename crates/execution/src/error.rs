// In crates/execution/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Execution failed: {reason}")]
    ExecutionFailed { reason: String },

    /// A simulated order broke a balance invariant. Always a logic error in the strategy.
    #[error("Simulation invariant violated: {reason}")]
    SimulationViolation { reason: String },

    #[error("API client error: {0}")]
    ApiClientError(#[from] api_client::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
