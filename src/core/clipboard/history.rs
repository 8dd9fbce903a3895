use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use super::state::{GenerationCheck, GenerationTracker, TickOutcome};
use super::store::HistoryStore;
use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::events::{emit_event, HistoryEvent};
use crate::shared::settings::DEFAULT_CAPACITY;
use crate::shared::types::Entry;
use crate::system::clipboard::HostClipboardPort;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything guarded by the engine lock
struct HistoryState {
    entries: Vec<Entry>,
    generation: GenerationTracker,
}

/// Clipboard history engine
///
/// Owns the ordered entry list. Every read and mutation takes the same lock
/// for its whole duration (persistence included), so watcher ticks and
/// UI-triggered calls never interleave.
///
/// Ordering: pinned entries first, then newest `created_at` first within each
/// partition. Contents are unique. The list never grows past `capacity`.
pub struct HistoryEngine {
    state: Mutex<HistoryState>,
    store: Arc<dyn HistoryStore>,
    capacity: usize,
    events: broadcast::Sender<HistoryEvent>,
}

impl HistoryEngine {
    /// Load history from `store`. Missing or corrupt storage starts empty.
    pub fn new(store: Arc<dyn HistoryStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let loaded = match store.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load clipboard history, starting empty");
                Vec::new()
            }
        };
        let loaded_count = loaded.len();
        let entries = normalize(loaded, capacity);
        tracing::info!(
            loaded = loaded_count,
            kept = entries.len(),
            capacity,
            "clipboard history loaded"
        );

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(HistoryState {
                entries,
                generation: GenerationTracker::new(),
            }),
            store,
            capacity,
            events,
        }
    }

    pub fn with_default_capacity(store: Arc<dyn HistoryStore>) -> Self {
        Self::new(store, DEFAULT_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("history mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Save failures are logged; memory stays authoritative until the next save
    fn persist(&self, entries: &[Entry]) {
        if let Err(e) = self.store.save(entries) {
            tracing::warn!(error = %e, "failed to persist clipboard history");
        }
    }

    /// Record copied text. Returns the id of the new entry, or `None` when
    /// `text` is empty or the new entry was evicted straight away (every
    /// other slot holds a pinned entry).
    pub fn ingest(&self, text: &str) -> Option<String> {
        let mut state = self.lock();
        self.ingest_locked(&mut state, text)
    }

    fn ingest_locked(&self, state: &mut HistoryState, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }

        let pinned = match state.entries.iter().position(|e| e.content == text) {
            Some(index) => state.entries.remove(index).pinned,
            None => false,
        };
        let entry = Entry::with_pin(text.to_string(), pinned);
        let id = entry.id.clone();

        state.entries.insert(0, entry.clone());
        sort_entries(&mut state.entries);
        let evicted = enforce_capacity(&mut state.entries, self.capacity);

        self.persist(&state.entries);

        if evicted.iter().any(|e| e.id == id) {
            tracing::debug!(
                total = state.entries.len(),
                "history full of pinned entries, copy dropped"
            );
            return None;
        }
        tracing::debug!(id = %id, pinned, total = state.entries.len(), "ingested clipboard text");

        emit_event(&self.events, HistoryEvent::Ingested(entry));
        if !evicted.is_empty() {
            emit_event(
                &self.events,
                HistoryEvent::Evicted {
                    ids: evicted.into_iter().map(|e| e.id).collect(),
                },
            );
        }
        Some(id)
    }

    /// Flip the pin flag. Returns the new flag, `None` for an unknown id.
    pub fn toggle_pin(&self, id: &str) -> Option<bool> {
        let mut state = self.lock();
        let entry = state.entries.iter_mut().find(|e| e.id == id)?;
        entry.pinned = !entry.pinned;
        let pinned = entry.pinned;

        sort_entries(&mut state.entries);
        self.persist(&state.entries);

        emit_event(&self.events, HistoryEvent::PinToggled { id: id.to_string(), pinned });
        Some(pinned)
    }

    /// Returns false when the id is unknown
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.lock();
        let Some(index) = state.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        state.entries.remove(index);
        self.persist(&state.entries);

        emit_event(&self.events, HistoryEvent::Removed { id: id.to_string() });
        true
    }

    /// Drop every unpinned entry. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.pinned);
        let removed = before - state.entries.len();
        self.persist(&state.entries);

        tracing::info!(removed, kept = state.entries.len(), "cleared clipboard history");
        emit_event(&self.events, HistoryEvent::Cleared { removed });
        removed
    }

    pub fn snapshot(&self) -> Vec<Entry> {
        self.lock().entries.clone()
    }

    pub fn get(&self, id: &str) -> Option<Entry> {
        self.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Content of an entry, for writing back to the clipboard
    pub fn materialize(&self, id: &str) -> EngineResult<String> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.content.clone())
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Mark a clipboard generation as caused by our own write so the watcher
    /// does not ingest it.
    pub fn suppress_generation(&self, generation: u64) {
        self.lock().generation.suppress(generation);
        tracing::debug!(generation, "clipboard generation marked as self-originated");
    }

    /// Look up `id`, hand its content to `write`, and suppress the generation
    /// `write` returns. Runs under the engine lock, so no watcher tick can
    /// observe the write before it is marked.
    pub fn apply_entry<F>(&self, id: &str, write: F) -> EngineResult<String>
    where
        F: FnOnce(&str) -> EngineResult<u64>,
    {
        let mut state = self.lock();
        let content = state
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.content.clone())
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        let generation = write(&content)?;
        state.generation.suppress(generation);
        tracing::debug!(id, generation, "entry written back to clipboard");
        Ok(content)
    }

    /// Record `generation` as the baseline without ingesting anything
    pub fn seed_generation(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation.last_observed().is_none() {
            state.generation.check(generation);
        }
    }

    /// One polling step against the host clipboard. With `capture` false the
    /// change is consumed without being recorded.
    pub fn observe<P>(&self, port: &P, capture: bool) -> TickOutcome
    where
        P: HostClipboardPort + ?Sized,
    {
        let mut state = self.lock();
        match state.generation.check(port.current_generation()) {
            GenerationCheck::Seeded => return TickOutcome::Seeded,
            GenerationCheck::Unchanged => return TickOutcome::Unchanged,
            GenerationCheck::Suppressed => return TickOutcome::Suppressed,
            GenerationCheck::Changed => {}
        }
        if !capture {
            return TickOutcome::Paused;
        }

        match port.read_text() {
            Ok(Some(text)) if text.is_empty() => TickOutcome::Ignored,
            Ok(Some(text)) => match self.ingest_locked(&mut state, &text) {
                Some(id) => TickOutcome::Ingested { id },
                None => TickOutcome::Discarded,
            },
            Ok(None) => TickOutcome::NoText,
            Err(e) => TickOutcome::ReadFailed(e),
        }
    }

    /// Write the current history out, reporting failure
    pub fn flush(&self) -> EngineResult<()> {
        let state = self.lock();
        self.store.save(&state.entries)
    }
}

/// Pinned first, then newest first. Stable, so equal timestamps keep
/// insertion order (a fresh insert at index 0 stays ahead).
fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Evict oldest unpinned entries until within capacity. When only pinned
/// entries remain, the oldest of those goes. Expects sorted input.
fn enforce_capacity(entries: &mut Vec<Entry>, capacity: usize) -> Vec<Entry> {
    let mut evicted = Vec::new();
    while entries.len() > capacity {
        let removed = match entries.iter().rposition(|e| !e.pinned) {
            Some(index) => entries.remove(index),
            None => match entries.pop() {
                Some(entry) => entry,
                None => break,
            },
        };
        evicted.push(removed);
    }
    evicted
}

/// Restore invariants on loaded data: no empty contents, unique contents,
/// sorted, within capacity.
fn normalize(mut entries: Vec<Entry>, capacity: usize) -> Vec<Entry> {
    entries.retain(|e| !e.content.is_empty());
    sort_entries(&mut entries);

    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.content.clone()));

    let evicted = enforce_capacity(&mut entries, capacity);
    if !evicted.is_empty() {
        tracing::info!(evicted = evicted.len(), "loaded history exceeded capacity");
    }
    entries
}

/// Dedup, pinned-first/newest-first ordering and the capacity bound
#[cfg(test)]
pub(crate) fn assert_invariants(entries: &[Entry], capacity: usize) {
    assert!(entries.len() <= capacity, "history exceeds capacity");
    let unique: HashSet<_> = entries.iter().map(|e| &e.content).collect();
    assert_eq!(unique.len(), entries.len(), "duplicate contents in history");
    for pair in entries.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.pinned >= b.pinned, "pinned entries must come first");
        if a.pinned == b.pinned {
            assert!(a.created_at >= b.created_at, "entries must be newest first");
        }
    }
}
