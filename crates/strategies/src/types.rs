// In crates/strategies/src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MaCrossoverSettings {
    /// Number of most recent minutes in the short average.
    #[serde(default = "default_short_len")]
    pub short_len: usize,
    /// Number of most recent minutes in the long average. Must exceed `short_len`.
    #[serde(default = "default_long_len")]
    pub long_len: usize,
    /// Maximum lots per signal.
    #[serde(default = "default_trade_count")]
    pub trade_count: i64,
}

impl Default for MaCrossoverSettings {
    fn default() -> Self {
        Self {
            short_len: default_short_len(),
            long_len: default_long_len(),
            trade_count: default_trade_count(),
        }
    }
}

fn default_short_len() -> usize {
    5
}

fn default_long_len() -> usize {
    20
}

fn default_trade_count() -> i64 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RandomSettings {
    /// Lower bound of the drawn signed lot count. Negative values allow sells.
    pub low: i64,
    /// Upper bound of the drawn signed lot count. Positive values allow buys.
    pub high: i64,
    /// Fixed seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}
