//! Clipboard history engine
//!
//! Watches the system clipboard, keeps a deduplicated, pinnable, size-bounded
//! history of copied text and persists it across restarts. Presentation
//! (menus, hotkeys, windows, paste keystrokes) lives outside this crate and
//! drives it through [`AppContext`].

pub mod core;
pub mod shared;
pub mod system;

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::clipboard::{
    ClipboardWatcher, HistoryEngine, HistoryStore, InMemoryStore, JsonFileStore,
};
use crate::shared::errors::EngineResult;
use crate::shared::settings::EngineSettings;
use crate::system::clipboard::HostClipboardPort;

pub use crate::core::clipboard::{TickOutcome, WatcherState};
pub use crate::shared::errors::EngineError;
pub use crate::shared::events::HistoryEvent;
pub use crate::shared::types::{Entry, EntryKind};

/// Explicitly constructed application context handed to UI collaborators
pub struct AppContext {
    settings: EngineSettings,
    history_path: Option<PathBuf>,
    engine: Arc<HistoryEngine>,
    watcher: ClipboardWatcher,
    port: Arc<dyn HostClipboardPort>,
}

impl AppContext {
    /// Build the engine on the configured history file. If no durable
    /// location can be determined, history is kept in memory only.
    pub fn new(settings: EngineSettings, port: Arc<dyn HostClipboardPort>) -> Self {
        let history_path = match settings.resolve_history_path() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "no history file location, using in-memory fallback");
                None
            }
        };
        let store: Arc<dyn HistoryStore> = match &history_path {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(InMemoryStore::new()),
        };
        let mut context = Self::with_store(settings, store, port);
        context.history_path = history_path;
        context
    }

    pub fn with_store(
        settings: EngineSettings,
        store: Arc<dyn HistoryStore>,
        port: Arc<dyn HostClipboardPort>,
    ) -> Self {
        let engine = Arc::new(HistoryEngine::new(store, settings.capacity));
        let watcher = ClipboardWatcher::new(
            Arc::clone(&engine),
            Arc::clone(&port),
            settings.poll_interval(),
        );
        Self {
            settings,
            history_path: None,
            engine,
            watcher,
            port,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// `None` when running on the in-memory fallback or a custom store
    pub fn history_path(&self) -> Option<&PathBuf> {
        self.history_path.as_ref()
    }

    pub fn engine(&self) -> &Arc<HistoryEngine> {
        &self.engine
    }

    pub fn watcher(&self) -> &ClipboardWatcher {
        &self.watcher
    }

    /// Start clipboard monitoring; must run inside a tokio runtime
    pub fn start(&self) -> bool {
        self.watcher.start_monitoring()
    }

    /// Put an entry back on the clipboard without it being re-recorded
    /// as a fresh copy. Hiding the window and sending the paste keystroke
    /// are up to the caller.
    pub fn reapply(&self, id: &str) -> EngineResult<String> {
        let port = Arc::clone(&self.port);
        self.engine.apply_entry(id, move |text| {
            port.write_text(text)?;
            Ok(port.current_generation())
        })
    }

    /// Stop polling and make one last best-effort save
    pub fn shutdown(&self) {
        self.watcher.stop();
        match self.engine.flush() {
            Ok(()) => tracing::info!(entries = self.engine.len(), "clipboard history flushed"),
            Err(e) => tracing::warn!(error = %e, "final history save failed"),
        }
    }
}
