use serde::Deserialize;
use toml::Value;

/// Names a strategy and carries its raw parameter table.
#[derive(Deserialize, Debug, Clone)]
pub struct StrategyConfig {
    pub name: String,
    // This will hold the `params = { ... }` table from the TOML
    #[serde(default = "default_params")]
    pub params: Value,
}

impl StrategyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: default_params(),
        }
    }
}

fn default_params() -> Value {
    Value::Table(Default::default())
}
