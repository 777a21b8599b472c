// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid money amount: {0}")]
    InvalidMoney(String),

    #[error("Money amount out of range: {0}")]
    MoneyOutOfRange(String),
}

pub type Result<T> = std::result::Result<T, Error>;
