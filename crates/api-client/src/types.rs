// In crates/api-client/src/types.rs

use core_types::{Direction, Money, OrderType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which order endpoints a call goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    /// Paper money on the broker's sandbox.
    Sandbox,
    /// The real account.
    Live,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Sandbox => f.write_str("sandbox"),
            TradingMode::Live => f.write_str("live"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Unspecified,
    /// A regular brokerage account.
    Brokerage,
    /// An individual investment account.
    Iis,
    InvestBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Unspecified,
    /// Opening is still in progress.
    New,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Unspecified,
    FullAccess,
    ReadOnly,
    NoAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub access_level: AccessLevel,
}

/// Free money in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyBalance {
    pub currency: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPosition {
    pub figi: String,
    /// Balance in lots.
    pub balance: i64,
}

/// Everything an account currently holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Positions {
    pub money: Vec<MoneyBalance>,
    pub securities: Vec<SecurityPosition>,
}

impl Positions {
    /// Money in `currency`, zero if the account holds none.
    pub fn money_in(&self, currency: &str) -> Money {
        self.money
            .iter()
            .find(|m| m.currency.eq_ignore_ascii_case(currency))
            .map(|m| m.amount)
            .unwrap_or(Money::ZERO)
    }

    /// Lots of `figi`, zero if the account holds none.
    pub fn lots_of(&self, figi: &str) -> i64 {
        self.securities
            .iter()
            .find(|s| s.figi == figi)
            .map(|s| s.balance)
            .unwrap_or(0)
    }
}

/// An order as sent to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostOrderRequest {
    pub figi: String,
    /// Lots.
    pub quantity: i64,
    /// Limit price per unit, absent for market orders.
    pub price: Option<Money>,
    pub direction: Direction,
    pub order_type: OrderType,
    pub account_id: String,
    /// Idempotency key chosen by the caller.
    pub client_order_id: String,
}
