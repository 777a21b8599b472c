use std::collections::HashMap;
use std::sync::Arc;

use backtester::{Backtester, Error};
use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{
    Candle, Direction, InstrumentInfo, Money, RobotTradeOrder, StrategyDecision, TradeStrategyParams,
};
use strategies::Strategy;
use strategies::ma_crossover::MaCrossover;
use strategies::types::MaCrossoverSettings;

/// Emits a fixed order at chosen candle indices.
struct Scripted {
    orders: HashMap<usize, RobotTradeOrder>,
    calls: usize,
}

impl Scripted {
    fn new(orders: impl IntoIterator<Item = (usize, RobotTradeOrder)>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
            calls: 0,
        }
    }
}

impl Strategy for Scripted {
    fn strategy_id(&self) -> &'static str {
        "scripted"
    }

    fn load_instrument_info(&mut self, _instrument: Arc<InstrumentInfo>) {}

    fn decide_by_candle(&mut self, _candle: &Candle, _params: &TradeStrategyParams) -> StrategyDecision {
        let decision = match self.orders.remove(&self.calls) {
            Some(order) => StrategyDecision::order(order),
            None => StrategyDecision::none(),
        };
        self.calls += 1;
        decision
    }
}

fn instrument(lot: i64) -> InstrumentInfo {
    InstrumentInfo {
        figi: "BBG000000001".into(),
        ticker: "TEST".into(),
        class_code: "TQBR".into(),
        lot,
        currency: "rub".into(),
        name: "Test".into(),
    }
}

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(minute)
}

fn candles(closes: &[i64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| Candle::flat(at(i as i64), Money::from(*close)))
        .collect()
}

#[test]
fn single_buy_moves_balances() {
    let mut strategy = Scripted::new([(0, RobotTradeOrder::market(1, Direction::Buy))]);
    let initial = TradeStrategyParams::new(0, Money::from(100));

    let stats = Backtester::new(&mut strategy, &instrument(1), &initial)
        .run(candles(&[10]))
        .unwrap();

    assert_eq!(stats.get_money(), Money::from(90));
    assert_eq!(stats.get_positions(), 1);
    assert_eq!(stats.trades().len(), 1);
    assert!(stats.trades()[0].order_id.is_none());
}

#[test]
fn selling_without_lots_aborts_the_run() {
    let mut strategy = Scripted::new([(1, RobotTradeOrder::market(1, Direction::Sell))]);
    let initial = TradeStrategyParams::new(0, Money::from(100));

    let result = Backtester::new(&mut strategy, &instrument(1), &initial).run(candles(&[10, 11, 12]));

    match result {
        Err(Error::InvariantViolated { time, .. }) => assert_eq!(time, at(1)),
        other => panic!("expected an invariant violation, got {other:?}"),
    }
}

#[test]
fn overspending_aborts_the_run() {
    let mut strategy = Scripted::new([(0, RobotTradeOrder::market(2, Direction::Buy))]);
    let initial = TradeStrategyParams::new(0, Money::from(100));

    let result = Backtester::new(&mut strategy, &instrument(10), &initial).run(candles(&[6]));

    assert!(matches!(result, Err(Error::InvariantViolated { .. })));
}

#[test]
fn crossover_run_keeps_the_ledger_balanced() {
    let mut strategy = MaCrossover::new(MaCrossoverSettings {
        short_len: 2,
        long_len: 4,
        trade_count: 2,
    })
    .unwrap();
    strategy.load_instrument_info(Arc::new(instrument(10)));
    let initial = TradeStrategyParams::new(1, Money::from(1_000));

    // Saw-tooth prices produce a crossover every few minutes.
    let closes: Vec<i64> = (0..120i64).map(|i| 20 + (i % 12 - 6).abs()).collect();
    let mut backtest = Backtester::new(&mut strategy, &instrument(10), &initial);
    for candle in candles(&closes) {
        backtest.step(&candle).unwrap();
        assert!(backtest.account().instrument_balance() >= 0);
        assert!(!backtest.account().currency_balance().is_negative());
    }
    let stats = backtest.finish();

    assert!(!stats.trades().is_empty());
    let bought: Money = stats
        .trades()
        .iter()
        .filter(|t| t.direction == Direction::Buy)
        .map(|t| t.amount)
        .sum();
    let sold: Money = stats
        .trades()
        .iter()
        .filter(|t| t.direction == Direction::Sell)
        .map(|t| t.amount)
        .sum();
    assert_eq!(stats.get_money() + bought - sold, Money::from(1_000));

    let lots_bought: i64 = stats.trades().iter().filter(|t| t.direction == Direction::Buy).map(|t| t.lots).sum();
    let lots_sold: i64 = stats.trades().iter().filter(|t| t.direction == Direction::Sell).map(|t| t.lots).sum();
    assert_eq!(stats.get_positions(), 1 + lots_bought - lots_sold);
}

#[test]
fn warm_up_primes_the_strategy() {
    let mut strategy = MaCrossover::new(MaCrossoverSettings {
        short_len: 2,
        long_len: 4,
        trade_count: 1,
    })
    .unwrap();
    strategy.load_instrument_info(Arc::new(instrument(1)));
    let initial = TradeStrategyParams::new(5, Money::from(100));

    let history = candles(&[20, 20, 20, 20]);
    let test: Vec<Candle> = [10, 10]
        .iter()
        .enumerate()
        .map(|(i, close)| Candle::flat(at(4 + i as i64), Money::from(*close)))
        .collect();

    let mut backtest = Backtester::new(&mut strategy, &instrument(1), &initial);
    backtest.warm_up(&history);
    let stats = backtest.run(test).unwrap();

    // Without warm-up the first sell would need four test minutes.
    assert_eq!(stats.trades().len(), 1);
    assert_eq!(stats.trades()[0].direction, Direction::Sell);
    assert_eq!(stats.trades()[0].time, at(5));
}
