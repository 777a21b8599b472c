// In crates/engine/src/error.rs

use api_client::{AccessLevel, AccountStatus, AccountType, TradingMode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Account {0} not found")]
    AccountNotFound(String),

    #[error("Account type {0:?} is not supported")]
    UnsupportedAccountType(AccountType),

    #[error("Account status {0:?} is not supported")]
    UnsupportedAccountStatus(AccountStatus),

    #[error("No access to account. Current level is {0:?}")]
    InsufficientAccessLevel(AccessLevel),

    #[error("Account {account_id} is a {available} account, cannot trade it in {requested} mode")]
    ModeMismatch {
        account_id: String,
        requested: TradingMode,
        available: TradingMode,
    },

    #[error("Instrument {0} not found")]
    MissingInstrument(String),

    #[error("Broker error: {0}")]
    Broker(#[from] api_client::Error),

    #[error("Backtest failed: {0}")]
    Backtest(#[from] backtester::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
