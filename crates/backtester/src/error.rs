// In crates/backtester/src/error.rs

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The strategy produced an order the simulated balances cannot cover.
    #[error("Backtest aborted at {time}: {source}")]
    InvariantViolated {
        time: DateTime<Utc>,
        #[source]
        source: execution::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
