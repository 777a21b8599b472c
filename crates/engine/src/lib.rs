// In crates/engine/src/lib.rs

pub mod bot;
pub mod error;
pub mod reconciler;

pub use bot::TradingRobot;
pub use error::{Error, Result};
pub use reconciler::{OrderExecutionInfo, OrderTracker};

use analytics::TradeStatistics;
use api_client::{AccessLevel, Account, AccountStatus, AccountType, BrokerClient, TradingMode};
use core_types::{InstrumentInfo, InstrumentSelector};
use execution::BrokerExecutor;
use std::sync::Arc;
use strategies::Strategy;

/// Builds trading robots for one account and one instrument.
///
/// Construction resolves the instrument and validates the account, so a
/// factory that exists is known to be able to trade.
pub struct RobotFactory {
    client: Arc<dyn BrokerClient>,
    account_id: String,
    instrument: Arc<InstrumentInfo>,
    /// The endpoints the account was found under.
    account_mode: TradingMode,
}

impl RobotFactory {
    pub async fn new(
        client: Arc<dyn BrokerClient>,
        account_id: impl Into<String>,
        selector: &InstrumentSelector,
    ) -> Result<Self> {
        let account_id = account_id.into();
        let instrument = match client.get_instrument(selector).await {
            Ok(instrument) => instrument,
            Err(api_client::Error::NotFound(_)) => {
                tracing::error!(%selector, "Instrument not found.");
                return Err(Error::MissingInstrument(selector.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let account_mode = validate_account(client.as_ref(), &account_id).await?;
        tracing::info!(
            figi = %instrument.figi,
            ticker = %instrument.ticker,
            lot = instrument.lot,
            account_id = %account_id,
            %account_mode,
            "Robot factory ready."
        );

        Ok(Self {
            client,
            account_id,
            instrument: Arc::new(instrument),
            account_mode,
        })
    }

    pub fn instrument(&self) -> &Arc<InstrumentInfo> {
        &self.instrument
    }

    /// True when the account lives on the sandbox endpoints.
    pub fn sandbox_mode(&self) -> bool {
        self.account_mode == TradingMode::Sandbox
    }

    /// Loads the current balances and wires `strategy` into a new robot.
    pub async fn create_robot(&self, mut strategy: Box<dyn Strategy>, sandbox_mode: bool) -> Result<TradingRobot> {
        let requested = if sandbox_mode {
            TradingMode::Sandbox
        } else {
            TradingMode::Live
        };
        if requested != self.account_mode {
            return Err(Error::ModeMismatch {
                account_id: self.account_id.clone(),
                requested,
                available: self.account_mode,
            });
        }

        let positions = self.client.get_positions(requested, &self.account_id).await?;
        let money = positions.money_in(&self.instrument.currency);
        let lots = positions.lots_of(&self.instrument.figi);
        tracing::info!(%money, lots, "Loaded current positions.");

        strategy.load_instrument_info(Arc::clone(&self.instrument));
        let stats = TradeStatistics::new((*self.instrument).clone(), money, lots);
        let executor = BrokerExecutor::new(Arc::clone(&self.client), self.account_id.clone(), requested);

        Ok(TradingRobot::new(
            Arc::clone(&self.client),
            Box::new(executor),
            strategy,
            Arc::clone(&self.instrument),
            stats,
            requested,
        ))
    }
}

/// Finds the account among the real accounts, then among the sandbox ones,
/// and checks it can be traded. Returns where it was found.
async fn validate_account(client: &dyn BrokerClient, account_id: &str) -> Result<TradingMode> {
    let (account, mode) = match client.get_account(TradingMode::Live, account_id).await? {
        Some(account) => (account, TradingMode::Live),
        None => match client.get_account(TradingMode::Sandbox, account_id).await? {
            Some(account) => (account, TradingMode::Sandbox),
            None => {
                tracing::error!(account_id, "Account not found.");
                return Err(Error::AccountNotFound(account_id.to_string()));
            }
        },
    };
    check_account(&account)?;
    Ok(mode)
}

fn check_account(account: &Account) -> Result<()> {
    if !matches!(account.account_type, AccountType::Brokerage | AccountType::InvestBox) {
        tracing::error!(account_type = ?account.account_type, "Account type is not supported.");
        return Err(Error::UnsupportedAccountType(account.account_type));
    }
    if account.status != AccountStatus::Open {
        tracing::error!(status = ?account.status, "Account status is not supported.");
        return Err(Error::UnsupportedAccountStatus(account.status));
    }
    if account.access_level != AccessLevel::FullAccess {
        tracing::error!(access_level = ?account.access_level, "No access to account.");
        return Err(Error::InsufficientAccessLevel(account.access_level));
    }
    Ok(())
}
