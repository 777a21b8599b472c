// In crates/analytics/src/lib.rs

pub mod engine;
pub mod error;
pub mod statistics;
pub mod types;

pub use engine::AnalyticsEngine;
pub use error::{Error, Result};
pub use statistics::TradeStatistics;
pub use types::{EquityPoint, PerformanceReport, TradeRecord, TradeSource};
