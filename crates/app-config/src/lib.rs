// In crates/app-config/src/lib.rs

use std::path::Path;

use config::{Config, Environment, File};

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{AppSettings, BacktestSettings, BrokerSettings, OutputSettings, PaperSettings, Settings};

/// Loads the application settings from various sources.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads from a default `config/base.toml` file.
/// 2. Merges settings from an environment-specific file (e.g., `config/development.toml`).
/// 3. Merges settings from environment variables.
pub fn load_settings() -> Result<Settings> {
    // Get the current environment. Default to "development" if not set.
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
    load_settings_from(Path::new("config"), &environment)
}

/// Same layering as [`load_settings`], rooted at `dir`.
pub fn load_settings_from(dir: &Path, environment: &str) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::from(dir.join("base")))
        .add_source(File::from(dir.join(environment)).required(false))
        // e.g. `APP__BROKER__ACCOUNT_ID=...`. The prefix is `APP`, separator is `__`.
        .add_source(Environment::with_prefix("APP").prefix_separator("__").separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    // Fail early on an unusable instrument, not when the robot starts.
    settings.broker.instrument_selector()?;

    Ok(settings)
}
