// In crates/strategies/src/ma_crossover.rs

use crate::types::MaCrossoverSettings;
use crate::{Error, Result, Strategy};
use chrono::{DateTime, Duration, DurationRound, Utc};
use core_types::{
    Candle, Direction, InstrumentInfo, Money, RobotTradeOrder, StrategyDecision, TradeStrategyParams,
};
use events::{ChartEvent, EventSink};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Moving-average crossover over per-minute closing prices.
///
/// Every minute, on the first update that belongs to it, the strategy compares
/// the long and short averages of the closes recorded so far. When the sign of
/// `long > short` flips, it sells (long moved above short) or buys (long moved
/// below short). The current candle's close is recorded only after the
/// decision, so each decision sees the window as it stood before the new minute.
pub struct MaCrossover {
    /// The configuration for this strategy instance.
    settings: MaCrossoverSettings,
    instrument: Option<Arc<InstrumentInfo>>,
    /// Close price per minute, never more than `long_len` entries.
    prices: BTreeMap<DateTime<Utc>, Money>,
    /// `long > short` as of the last evaluated minute. `None` until the window first fills.
    prev_sign: Option<bool>,
    sink: Option<Arc<dyn EventSink>>,
}

impl MaCrossover {
    /// Creates a new `MaCrossover` strategy instance from its settings.
    pub fn new(settings: MaCrossoverSettings) -> Result<Self> {
        if settings.short_len == 0 {
            return Err(Error::InvalidParameters("short_len must be positive".into()));
        }
        if settings.long_len <= settings.short_len {
            return Err(Error::InvalidParameters(format!(
                "long_len ({}) must be greater than short_len ({})",
                settings.long_len, settings.short_len
            )));
        }
        if settings.trade_count <= 0 {
            return Err(Error::InvalidParameters(format!(
                "trade_count must be positive, got {}",
                settings.trade_count
            )));
        }

        Ok(Self {
            settings,
            instrument: None,
            prices: BTreeMap::new(),
            prev_sign: None,
            sink: None,
        })
    }

    /// Publishes recorded prices and signals to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn settings(&self) -> &MaCrossoverSettings {
        &self.settings
    }

    /// Closes in chronological order.
    pub fn prices(&self) -> Vec<Money> {
        self.prices.values().copied().collect()
    }

    pub fn long_avg(&self) -> Option<Money> {
        self.average(self.settings.long_len)
    }

    pub fn short_avg(&self) -> Option<Money> {
        self.average(self.settings.short_len)
    }

    fn average(&self, len: usize) -> Option<Money> {
        if self.prices.len() < len {
            return None;
        }
        let sum: Money = self.prices.values().rev().take(len).sum();
        sum.checked_div_int(len as i64)
    }

    /// `long_avg > short_avg`, compared exactly by cross-multiplying the sums.
    /// `None` while fewer than `long_len` minutes are recorded.
    fn long_above_short(&self) -> Option<bool> {
        let long_len = self.settings.long_len;
        let short_len = self.settings.short_len;
        if self.prices.len() < long_len {
            return None;
        }
        let newest_first: Vec<Money> = self.prices.values().rev().take(long_len).copied().collect();
        let long_sum: Money = newest_first.iter().sum();
        let short_sum: Money = newest_first[..short_len].iter().sum();

        Some(long_sum.total_nanos() * short_len as i128 > short_sum.total_nanos() * long_len as i128)
    }

    fn record_price(&mut self, minute: DateTime<Utc>, close: Money) {
        self.prices.insert(minute, close);
        while self.prices.len() > self.settings.long_len {
            self.prices.pop_first();
        }
        self.publish(ChartEvent::Price {
            time: minute,
            price: close.to_f64(),
        });
    }

    fn publish(&self, event: ChartEvent) {
        if let Some(sink) = &self.sink {
            sink.publish(event);
        }
    }

    fn crossover_order(
        &self,
        long_above_short: bool,
        candle: &Candle,
        params: &TradeStrategyParams,
    ) -> Option<RobotTradeOrder> {
        if long_above_short {
            if params.instrument_balance <= 0 {
                return None;
            }
            let quantity = self.settings.trade_count.min(params.instrument_balance);
            return Some(RobotTradeOrder::market(quantity, Direction::Sell));
        }

        let Some(instrument) = &self.instrument else {
            tracing::warn!("Instrument info is not loaded, skipping buy signal.");
            return None;
        };
        let lot_price = candle.close * instrument.lot;
        if !lot_price.is_positive() {
            return None;
        }
        let lots_affordable = params.currency_balance.total_nanos() / lot_price.total_nanos();
        if lots_affordable < 1 {
            return None;
        }
        let lots_affordable = i64::try_from(lots_affordable).unwrap_or(i64::MAX);
        Some(RobotTradeOrder::market(
            self.settings.trade_count.min(lots_affordable),
            Direction::Buy,
        ))
    }
}

/// Truncates a timestamp to the start of its minute.
fn minute_of(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::minutes(1)).unwrap_or(time)
}

impl Strategy for MaCrossover {
    fn strategy_id(&self) -> &'static str {
        "mae"
    }

    fn load_instrument_info(&mut self, instrument: Arc<InstrumentInfo>) {
        self.instrument = Some(instrument);
    }

    fn load_candles(&mut self, candles: &[Candle]) {
        self.prices.clear();
        let start = candles.len().saturating_sub(self.settings.long_len);
        for candle in &candles[start..] {
            self.prices.insert(minute_of(candle.time), candle.close);
        }
        while self.prices.len() > self.settings.long_len {
            self.prices.pop_first();
        }
        self.prev_sign = self.long_above_short();
        tracing::debug!(
            loaded = self.prices.len(),
            prev_sign = ?self.prev_sign,
            "Moving averages warmed up."
        );
    }

    fn decide_by_candle(&mut self, candle: &Candle, params: &TradeStrategyParams) -> StrategyDecision {
        let minute = minute_of(candle.time);
        let last = self.prices.last_key_value().map(|(last, _)| *last);
        if last.is_some_and(|last| minute < last) {
            tracing::debug!(%minute, last = ?last, "Ignoring out-of-order candle.");
            return StrategyDecision::none();
        }
        let is_new_minute = last.is_none_or(|last| minute > last);

        let mut order = None;
        if is_new_minute {
            if let Some(sign) = self.long_above_short() {
                if self.prev_sign.is_some_and(|prev| prev != sign) {
                    tracing::debug!(
                        %minute,
                        long_avg = ?self.long_avg().map(|m| m.to_string()),
                        short_avg = ?self.short_avg().map(|m| m.to_string()),
                        "Moving averages crossed."
                    );
                    order = self.crossover_order(sign, candle, params);
                    if let Some(order) = &order {
                        self.publish(match order.direction {
                            Direction::Buy => ChartEvent::Buy { time: minute },
                            Direction::Sell => ChartEvent::Sell { time: minute },
                        });
                    }
                }
                self.prev_sign = Some(sign);
            }
        }
        self.record_price(minute, candle.close);

        match order {
            Some(order) => StrategyDecision::order(order),
            None => StrategyDecision::none(),
        }
    }
}
