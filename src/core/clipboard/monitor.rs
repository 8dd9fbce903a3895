use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::history::HistoryEngine;
use super::state::TickOutcome;
use crate::system::clipboard::HostClipboardPort;

/// Log read failures on the first occurrence and then every Nth
const ERROR_LOG_EVERY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Polling,
}

/// Clipboard watcher that polls the host generation counter
pub struct ClipboardWatcher {
    engine: Arc<HistoryEngine>,
    port: Arc<dyn HostClipboardPort>,
    poll_interval: Duration,
    enabled: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardWatcher {
    /// The clipboard's current generation becomes the baseline, so whatever
    /// is already on the clipboard is not recorded.
    pub fn new(
        engine: Arc<HistoryEngine>,
        port: Arc<dyn HostClipboardPort>,
        poll_interval: Duration,
    ) -> Self {
        engine.seed_generation(port.current_generation());
        Self {
            engine,
            port,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            enabled: Arc::new(AtomicBool::new(true)),
            task: Mutex::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("watcher task mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn state(&self) -> WatcherState {
        match self.task().as_ref() {
            Some(handle) if !handle.is_finished() => WatcherState::Polling,
            _ => WatcherState::Idle,
        }
    }

    /// Spawn the polling task on the current tokio runtime.
    ///
    /// Returns false if already polling or if called outside a runtime.
    pub fn start_monitoring(&self) -> bool {
        let mut task = self.task();
        if matches!(task.as_ref(), Some(handle) if !handle.is_finished()) {
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "clipboard watcher needs a tokio runtime");
                return false;
            }
        };

        let engine = Arc::clone(&self.engine);
        let port = Arc::clone(&self.port);
        let enabled = Arc::clone(&self.enabled);
        let interval = self.poll_interval;

        *task = Some(runtime.spawn(async move {
            let interval_ms = interval.as_millis() as u64;
            tracing::info!(interval_ms, "clipboard monitoring started");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut consecutive_errors = 0u32;

            loop {
                ticker.tick().await;
                let outcome = engine.observe(port.as_ref(), enabled.load(Ordering::SeqCst));
                report(&outcome, &mut consecutive_errors);
            }
        }));
        true
    }

    /// Run one tick synchronously
    pub fn tick_once(&self) -> TickOutcome {
        self.engine
            .observe(self.port.as_ref(), self.enabled.load(Ordering::SeqCst))
    }

    /// End the polling task. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        match self.task().take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("clipboard monitoring stopped");
                true
            }
            None => false,
        }
    }

    /// While paused, changes are consumed without being recorded
    pub fn pause(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::info!("clipboard monitoring paused");
    }

    pub fn resume(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        tracing::info!("clipboard monitoring resumed");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Toggle monitoring on/off, returning the new state
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        tracing::info!(enabled, "clipboard monitoring toggled");
        enabled
    }
}

impl Drop for ClipboardWatcher {
    fn drop(&mut self) {
        if let Some(handle) = self.task().take() {
            handle.abort();
        }
    }
}

fn report(outcome: &TickOutcome, consecutive_errors: &mut u32) {
    if let TickOutcome::ReadFailed(e) = outcome {
        *consecutive_errors += 1;
        if *consecutive_errors == 1 || *consecutive_errors % ERROR_LOG_EVERY == 0 {
            tracing::warn!(error = %e, count = *consecutive_errors, "failed to read clipboard");
        }
        return;
    }
    *consecutive_errors = 0;

    match outcome {
        TickOutcome::Ingested { id } => tracing::debug!(id = %id, "clipboard change recorded"),
        TickOutcome::Suppressed => tracing::debug!("self-originated clipboard change skipped"),
        TickOutcome::Paused => tracing::debug!("clipboard change skipped while paused"),
        TickOutcome::NoText => tracing::trace!("clipboard change without text"),
        _ => {}
    }
}
