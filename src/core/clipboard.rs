//! Clipboard module
//!
//! Provides clipboard history tracking and monitoring functionality.
//!
//! - `history`: ordered, deduplicated, capacity-bounded entry list
//! - `monitor`: polling task that feeds clipboard changes into the history
//! - `state`: generation tracking and self-suppression bookkeeping
//! - `store`: durable JSON storage

pub mod history;
pub mod monitor;
pub mod state;
pub mod store;

pub use history::HistoryEngine;
pub use monitor::{ClipboardWatcher, WatcherState};
pub use state::TickOutcome;
pub use store::{HistoryStore, InMemoryStore, JsonFileStore};
