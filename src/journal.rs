use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;

use crate::config::JournalConfig;

/// Registry activity journal
///
/// Every mutation of the registry (vehicle added/removed, fault
/// reported/verified) lands here with a timestamp, so "when did that
/// Corolla get its second verified fault?" stays answerable without a
/// database.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub event: String,
    pub detail: String,
}

pub struct Journal {
    config: JournalConfig,
    entries: RwLock<Vec<JournalEntry>>,
    total_recorded: AtomicU64,
}

impl Journal {
    pub fn new(config: &JournalConfig) -> Self {
        Self {
            config: config.clone(),
            entries: RwLock::new(Vec::new()),
            total_recorded: AtomicU64::new(0),
        }
    }

    /// Record a registry event
    pub fn record(&self, event: &str, detail: impl Into<String>) {
        if !self.config.enabled {
            return;
        }

        let entry = JournalEntry {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            event: event.to_string(),
            detail: detail.into(),
        };

        let mut entries = self.entries.write();
        entries.push(entry);
        self.total_recorded.fetch_add(1, Ordering::Relaxed);

        // Rotation: keep within max_entries
        if entries.len() > self.config.max_entries {
            let drain_count = entries.len() - self.config.max_entries;
            entries.drain(..drain_count);
        }
    }

    /// Search the journal, most recent first. `query` substring-matches
    /// the detail text, `event` matches the event kind exactly.
    pub fn search(&self, query: Option<&str>, event: Option<&str>, limit: usize) -> Vec<JournalEntry> {
        let entries = self.entries.read();
        entries
            .iter()
            .rev()
            .filter(|e| {
                if let Some(q) = query {
                    if !e.detail.contains(q) {
                        return false;
                    }
                }
                if let Some(ev) = event {
                    if e.event != ev {
                        return false;
                    }
                }
                true
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get journal stats
    pub fn get_stats(&self) -> serde_json::Value {
        let entries = self.entries.read();
        serde_json::json!({
            "enabled": self.config.enabled,
            "current_entries": entries.len(),
            "max_entries": self.config.max_entries,
            "total_recorded": self.total_recorded.load(Ordering::Relaxed),
        })
    }
}
