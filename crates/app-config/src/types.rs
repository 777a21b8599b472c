// In crates/app-config/src/types.rs

use std::path::PathBuf;

use api_client::{Account, TradingMode};
use chrono::{DateTime, Duration, Utc};
use core_types::{InstrumentInfo, InstrumentSelector, Money, StrategyConfig, TradeStrategyParams};
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Which account and instrument the robot trades.
    pub broker: BrokerSettings,
    /// The strategy to run, by name, with its parameter table.
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
    /// The sandbox market the bundled paper broker replays.
    pub paper: PaperSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BrokerSettings {
    pub account_id: String,
    pub figi: Option<String>,
    pub ticker: Option<String>,
    pub class_code: Option<String>,
    #[serde(default)]
    pub sandbox_mode: bool,
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl BrokerSettings {
    /// A FIGI wins over a ticker. A ticker needs its class code.
    pub fn instrument_selector(&self) -> Result<InstrumentSelector> {
        if let Some(figi) = self.figi.as_ref().filter(|f| !f.is_empty()) {
            return Ok(InstrumentSelector::Figi(figi.clone()));
        }
        match (&self.ticker, &self.class_code) {
            (Some(ticker), Some(class_code)) if !ticker.is_empty() && !class_code.is_empty() => {
                Ok(InstrumentSelector::Ticker {
                    ticker: ticker.clone(),
                    class_code: class_code.clone(),
                })
            }
            _ => Err(Error::InvalidSetting {
                key: "broker.figi",
                reason: "set either a figi or both ticker and class_code".into(),
            }),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct BacktestSettings {
    /// Decimal string, e.g. "100000.50".
    #[serde(default = "default_backtest_money")]
    pub initial_currency_balance: String,
    #[serde(default)]
    pub initial_instrument_balance: i64,
    #[serde(default = "default_test_days")]
    pub test_days: i64,
    pub train_days: Option<i64>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_currency_balance: default_backtest_money(),
            initial_instrument_balance: 0,
            test_days: default_test_days(),
            train_days: None,
        }
    }
}

impl BacktestSettings {
    pub fn initial_params(&self) -> Result<TradeStrategyParams> {
        if self.initial_instrument_balance < 0 {
            return Err(Error::InvalidSetting {
                key: "backtest.initial_instrument_balance",
                reason: format!("must not be negative, got {}", self.initial_instrument_balance),
            });
        }
        let money = parse_money("backtest.initial_currency_balance", &self.initial_currency_balance)?;
        Ok(TradeStrategyParams::new(self.initial_instrument_balance, money))
    }

    pub fn test_duration(&self) -> Result<Duration> {
        days("backtest.test_days", self.test_days)
    }

    pub fn train_duration(&self) -> Result<Option<Duration>> {
        self.train_days.map(|d| days("backtest.train_days", d)).transpose()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PaperSettings {
    /// JSON array of one-minute candles.
    pub candles_path: PathBuf,
    pub instrument: InstrumentInfo,
    pub account: Account,
    #[serde(default = "default_account_mode")]
    pub account_mode: TradingMode,
    /// Decimal string, e.g. "100000".
    pub money: String,
    #[serde(default)]
    pub lots: i64,
    pub replay_from: Option<DateTime<Utc>>,
    pub replay_delay_ms: Option<u64>,
}

impl PaperSettings {
    pub fn money(&self) -> Result<Money> {
        parse_money("paper.money", &self.money)
    }

    pub fn replay_delay(&self) -> Option<std::time::Duration> {
        self.replay_delay_ms.map(std::time::Duration::from_millis)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct OutputSettings {
    #[serde(default = "default_statistics_path")]
    pub statistics_path: PathBuf,
    /// Chart events are written as JSON lines when set.
    pub chart_events_path: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            statistics_path: default_statistics_path(),
            chart_events_path: None,
        }
    }
}

fn parse_money(key: &'static str, value: &str) -> Result<Money> {
    value.trim().parse().map_err(|e: core_types::Error| Error::InvalidSetting {
        key,
        reason: e.to_string(),
    })
}

fn days(key: &'static str, days: i64) -> Result<Duration> {
    if days <= 0 {
        return Err(Error::InvalidSetting {
            key,
            reason: format!("must be positive, got {days}"),
        });
    }
    Duration::try_days(days).ok_or_else(|| Error::InvalidSetting {
        key,
        reason: format!("{days} days is out of range"),
    })
}

// Helper functions for serde defaults
fn default_app_name() -> String {
    "trading-robot".into()
}
fn default_backtest_money() -> String {
    "100000".into()
}
fn default_test_days() -> i64 {
    1
}
fn default_account_mode() -> TradingMode {
    TradingMode::Sandbox
}
fn default_statistics_path() -> PathBuf {
    PathBuf::from("output/statistics.json")
}
