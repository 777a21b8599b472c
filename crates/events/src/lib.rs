// --- Chart event structures consumed by external plotters ---

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// A price or trade marker emitted while a strategy runs.
/// `tag` and `content` are used by serde for clean JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ChartEvent {
    Price { time: DateTime<Utc>, price: f64 },
    Buy { time: DateTime<Utc> },
    Sell { time: DateTime<Utc> },
}

/// Anything that can receive chart events. Publishing never fails the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ChartEvent);
}

/// Fans events out to every subscriber of a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ChartEvent>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<ChartEvent>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChartEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: ChartEvent) {
        // No receivers is fine: nobody is plotting.
        if self.tx.send(event).is_err() {
            tracing::trace!("Chart event dropped, no subscribers.");
        }
    }
}

/// Renders one event as a single JSON line.
pub fn to_json_line(event: &ChartEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}
