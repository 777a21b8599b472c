use crate::ma_crossover::MaCrossover;
use crate::random::RandomStrategy;
use crate::types::{MaCrossoverSettings, RandomSettings};
use crate::{Error, Result, Strategy};
use core_types::StrategyConfig;
use events::EventSink;
use std::sync::Arc;

/// Builds the strategy named in `config`. Parameter problems fail here, before
/// any trading starts.
pub fn create_strategy(
    config: &StrategyConfig,
    sink: Option<Arc<dyn EventSink>>,
) -> Result<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match config.name.as_str() {
        "mae" | "ma_crossover" => {
            let settings: MaCrossoverSettings = config.params.clone().try_into()?;
            let mut strategy = MaCrossover::new(settings)?;
            if let Some(sink) = sink {
                strategy = strategy.with_sink(sink);
            }
            Box::new(strategy)
        }
        "random" => {
            let settings: RandomSettings = config.params.clone().try_into()?;
            Box::new(RandomStrategy::new(settings)?)
        }
        unknown => return Err(Error::UnknownStrategy(unknown.to_string())),
    };

    tracing::info!(strategy = strategy.strategy_id(), "Strategy created.");
    Ok(strategy)
}
