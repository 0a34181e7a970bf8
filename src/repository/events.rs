use crate::error::{CachelabError, Result};
use crate::types::DiscoverySummary;
use log::info;
use std::sync::Mutex;

/// Receiver of the per-cycle discovery summary.
pub trait EventSink: Send + Sync {
    fn emit(&self, summary: &DiscoverySummary) -> Result<()>;
}

/// Writes each summary as one JSON log line.
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, summary: &DiscoverySummary) -> Result<()> {
        info!("discovery_summary {}", serde_json::to_string(summary)?);
        Ok(())
    }
}

/// Keeps emitted summaries in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<DiscoverySummary>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiscoverySummary> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, summary: &DiscoverySummary) -> Result<()> {
        self.events
            .lock()
            .map_err(|e| CachelabError::Persistence(format!("Event buffer poisoned: {}", e)))?
            .push(summary.clone());
        Ok(())
    }
}
