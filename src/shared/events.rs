use serde::Serialize;
use tokio::sync::broadcast;

use super::types::Entry;

/// History change notifications for presentation layers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// A new or promoted entry now sits at the top of its partition
    Ingested(Entry),
    PinToggled { id: String, pinned: bool },
    Removed { id: String },
    /// Unpinned entries were dropped; `removed` is how many
    Cleared { removed: usize },
    /// Entries dropped by the capacity policy
    Evicted { ids: Vec<String> },
}

/// Broadcast an event to every subscriber.
///
/// Having no subscribers is normal (headless runs), so send errors are ignored.
pub fn emit_event(sender: &broadcast::Sender<HistoryEvent>, event: HistoryEvent) {
    if sender.send(event).is_err() {
        tracing::trace!("history event dropped, no subscribers");
    }
}
