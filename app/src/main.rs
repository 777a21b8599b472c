// In app/src/main.rs

use std::path::PathBuf;
use std::sync::Arc;

use analytics::{AnalyticsEngine, PerformanceReport, TradeStatistics};
use anyhow::{Context, Result};
use api_client::{PaperBroker, PaperConfig};
use app_config::Settings;
use chrono::Duration;
use clap::{Parser, Subcommand};
use engine::RobotFactory;
use tracing_subscriber::prelude::*;

use crate::chart::ChartWriter;

mod chart;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A single-instrument trading robot.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trades the configured instrument until the market closes.
    Trade,

    /// Replays recent history through the strategy without placing orders.
    Backtest {
        /// Days to test over, overriding `backtest.test_days`.
        #[arg(long)]
        test_days: Option<i64>,

        /// Days of warm-up before the test window, overriding `backtest.train_days`.
        #[arg(long)]
        train_days: Option<i64>,
    },

    /// Prints the performance report of a saved statistics file.
    Report {
        /// Path to a statistics JSON file.
        path: PathBuf,
    },
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trade => {
            let settings = app_config::load_settings()?;
            init_tracing(&settings.app.log_level);
            handle_trade(settings).await?;
        }
        Commands::Backtest { test_days, train_days } => {
            let mut settings = app_config::load_settings()?;
            init_tracing(&settings.app.log_level);
            if let Some(days) = test_days {
                settings.backtest.test_days = days;
            }
            if train_days.is_some() {
                settings.backtest.train_days = train_days;
            }
            handle_backtest(settings).await?;
        }
        Commands::Report { path } => {
            init_tracing("info");
            let stats = TradeStatistics::load_from_file(&path)
                .with_context(|| format!("Failed to load statistics from {}", path.display()))?;
            print_report(&stats, &AnalyticsEngine::new().calculate(&stats));
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) {
    let level = log_level.parse().unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("config", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
}

/// Builds the paper broker from `[paper]` and validates the account against it.
async fn connect(settings: &Settings) -> Result<RobotFactory> {
    let paper = &settings.paper;
    let candles = PaperBroker::load_candles(&paper.candles_path)
        .with_context(|| format!("Failed to load candles from {}", paper.candles_path.display()))?;
    tracing::info!(candles = candles.len(), "Market data loaded.");

    let broker = PaperBroker::new(PaperConfig {
        instrument: paper.instrument.clone(),
        account: paper.account.clone(),
        account_mode: paper.account_mode,
        money: paper.money()?,
        lots: paper.lots,
        candles,
        replay_from: paper.replay_from,
        replay_delay: paper.replay_delay(),
    });

    let selector = settings.broker.instrument_selector()?;
    let factory = RobotFactory::new(Arc::new(broker), settings.broker.account_id.clone(), &selector).await?;
    Ok(factory)
}

// --- "Trade" Subcommand Logic ---

async fn handle_trade(settings: Settings) -> Result<()> {
    tracing::info!(app_name = %settings.broker.app_name, "Starting trading robot.");

    let chart = match &settings.output.chart_events_path {
        Some(path) => Some(ChartWriter::start(path).await?),
        None => None,
    };
    let strategy = strategies::create_strategy(&settings.strategy, chart.as_ref().map(ChartWriter::sink))?;

    let factory = connect(&settings).await?;
    if settings.broker.sandbox_mode {
        tracing::info!("Trading in sandbox mode.");
    } else {
        tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
    }
    let mut robot = factory.create_robot(strategy, settings.broker.sandbox_mode).await?;

    let stats = robot.trade().await;
    // The robot owns the strategy, and with it the last chart sink.
    drop(robot);
    if let Some(chart) = chart {
        chart.finish().await?;
    }

    save_and_report(&settings, &stats)
}

// --- "Backtest" Subcommand Logic ---

async fn handle_backtest(settings: Settings) -> Result<()> {
    let initial = settings.backtest.initial_params()?;
    let test_duration: Duration = settings.backtest.test_duration()?;
    let train_duration = settings.backtest.train_duration()?;
    tracing::info!(
        test_days = settings.backtest.test_days,
        train_days = ?settings.backtest.train_days,
        money = %initial.currency_balance,
        lots = initial.instrument_balance,
        "Starting backtest."
    );

    let chart = match &settings.output.chart_events_path {
        Some(path) => Some(ChartWriter::start(path).await?),
        None => None,
    };
    let strategy = strategies::create_strategy(&settings.strategy, chart.as_ref().map(ChartWriter::sink))?;

    let factory = connect(&settings).await?;
    let mut robot = factory.create_robot(strategy, settings.broker.sandbox_mode).await?;
    let stats = robot.backtest(initial, test_duration, train_duration).await?;
    drop(robot);
    if let Some(chart) = chart {
        chart.finish().await?;
    }

    save_and_report(&settings, &stats)
}

fn save_and_report(settings: &Settings, stats: &TradeStatistics) -> Result<()> {
    let path = &settings.output.statistics_path;
    stats
        .save_to_file(path)
        .with_context(|| format!("Failed to save statistics to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Statistics saved.");

    print_report(stats, &AnalyticsEngine::new().calculate(stats));
    Ok(())
}

/// Helper function to print the final run summary.
fn print_report(stats: &TradeStatistics, report: &PerformanceReport) {
    let instrument = stats.instrument();
    println!("\n--- Run Complete: {} ({}) ---", instrument.ticker, instrument.figi);
    println!(
        "  - Trades: {} ({} buy / {} sell) | Lots: +{} / -{} | Turnover: {}",
        report.total_trades,
        report.buy_trades,
        report.sell_trades,
        report.lots_bought,
        report.lots_sold,
        report.turnover
    );
    println!(
        "  - Money: {} -> {} {} | Lots: {} -> {}",
        report.initial_money, report.final_money, instrument.currency, report.initial_positions, report.final_positions
    );
    println!(
        "  - P&L: {:.2} ({:.2}%) | Max Drawdown: {:.2} ({:.2}%)",
        report.net_pnl_absolute,
        report.net_pnl_percentage,
        report.max_drawdown_absolute,
        report.max_drawdown_percentage
    );
    let pending = stats.get_pending_orders();
    if !pending.is_empty() {
        println!("  - Orders still pending: {}", pending.len());
    }
    println!("---------------------------------");
}
