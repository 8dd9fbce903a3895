//! Host clipboard access
//!
//! The engine never talks to the OS clipboard directly. It goes through
//! `HostClipboardPort`, which exposes the current text plus a generation
//! counter that increases whenever the clipboard changes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use cli_clipboard::{ClipboardContext, ClipboardProvider};

use crate::shared::errors::{EngineError, EngineResult};

pub trait HostClipboardPort: Send + Sync {
    /// Monotonic counter, bumped on every clipboard change
    fn current_generation(&self) -> u64;

    /// `Ok(None)` when the clipboard holds no text (e.g. an image)
    fn read_text(&self) -> EngineResult<Option<String>>;

    fn write_text(&self, text: &str) -> EngineResult<()>;
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("clipboard port mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[derive(Default)]
struct Fingerprint {
    generation: u64,
    /// Hash of the last text seen; `None` when no text was readable
    last_hash: Option<u64>,
}

/// Native pasteboard change counter (`NSPasteboard.changeCount`)
#[cfg(target_os = "macos")]
fn native_change_count() -> Option<u64> {
    use cocoa::base::{id, nil};
    use cocoa::foundation::NSInteger;
    use objc::{class, msg_send, sel, sel_impl};

    unsafe {
        let pasteboard: id = msg_send![class!(NSPasteboard), generalPasteboard];
        if pasteboard == nil {
            return None;
        }
        let count: NSInteger = msg_send![pasteboard, changeCount];
        u64::try_from(count).ok()
    }
}

#[cfg(not(target_os = "macos"))]
fn native_change_count() -> Option<u64> {
    None
}

/// System clipboard through `cli-clipboard`
///
/// On macOS the generation is the pasteboard's own `changeCount`, so every
/// copy counts, including one that repeats the current text.
///
/// Elsewhere there is no change counter, so one is synthesized: every call to
/// `current_generation` fingerprints the clipboard text and bumps the counter
/// when the fingerprint moves. Copying the text that is already on the
/// clipboard is therefore invisible there, and such a re-copy does not
/// promote its entry.
pub struct SystemClipboard {
    state: Mutex<Fingerprint>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let clipboard = Self {
            state: Mutex::new(Fingerprint::default()),
        };
        // Seed with whatever is on the clipboard right now
        let hash = Self::fingerprint(Self::get_contents().ok().as_deref());
        lock_recovering(&clipboard.state).last_hash = hash;
        clipboard
    }

    fn get_contents() -> Result<String, String> {
        ClipboardContext::new()
            .and_then(|mut ctx| ctx.get_contents())
            .map_err(|e| e.to_string())
    }

    fn fingerprint(text: Option<&str>) -> Option<u64> {
        text.map(|t| {
            let mut hasher = DefaultHasher::new();
            t.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClipboardPort for SystemClipboard {
    fn current_generation(&self) -> u64 {
        if let Some(count) = native_change_count() {
            return count;
        }
        let hash = Self::fingerprint(Self::get_contents().ok().as_deref());
        let mut state = lock_recovering(&self.state);
        if state.last_hash != hash {
            state.last_hash = hash;
            state.generation += 1;
        }
        state.generation
    }

    fn read_text(&self) -> EngineResult<Option<String>> {
        match Self::get_contents() {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            // Non-text content surfaces as a read error in cli-clipboard
            Err(e) => {
                tracing::debug!(error = %e, "no text on clipboard");
                Ok(None)
            }
        }
    }

    fn write_text(&self, text: &str) -> EngineResult<()> {
        ClipboardContext::new()
            .and_then(|mut ctx| ctx.set_contents(text.to_owned()))
            .map_err(|e| EngineError::Clipboard(e.to_string()))?;

        let mut state = lock_recovering(&self.state);
        state.last_hash = Self::fingerprint(Some(text));
        state.generation += 1;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    generation: u64,
    text: Option<String>,
    fail_reads: bool,
}

/// In-process clipboard, for embedding the engine without an OS clipboard
#[derive(Default)]
pub struct MemoryClipboard {
    state: Mutex<MemoryState>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a copy made by another application
    pub fn copy(&self, text: &str) {
        let mut state = lock_recovering(&self.state);
        state.text = Some(text.to_string());
        state.generation += 1;
    }

    /// Simulate non-text content (image, file list) replacing the text
    pub fn copy_non_text(&self) {
        let mut state = lock_recovering(&self.state);
        state.text = None;
        state.generation += 1;
    }

    /// Make subsequent `read_text` calls fail
    pub fn set_fail_reads(&self, fail: bool) {
        lock_recovering(&self.state).fail_reads = fail;
    }

    pub fn text(&self) -> Option<String> {
        lock_recovering(&self.state).text.clone()
    }
}

impl HostClipboardPort for MemoryClipboard {
    fn current_generation(&self) -> u64 {
        lock_recovering(&self.state).generation
    }

    fn read_text(&self) -> EngineResult<Option<String>> {
        let state = lock_recovering(&self.state);
        if state.fail_reads {
            return Err(EngineError::Clipboard("clipboard unavailable".to_string()));
        }
        Ok(state.text.clone())
    }

    fn write_text(&self, text: &str) -> EngineResult<()> {
        self.copy(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard_generation_increases_on_every_change() {
        let clipboard = MemoryClipboard::new();
        let g0 = clipboard.current_generation();

        clipboard.copy("a");
        let g1 = clipboard.current_generation();
        clipboard.copy("a");
        let g2 = clipboard.current_generation();
        clipboard.write_text("b").unwrap();
        let g3 = clipboard.current_generation();

        assert!(g0 < g1 && g1 < g2 && g2 < g3);
        assert_eq!(clipboard.read_text().unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_memory_clipboard_non_text_reads_none() {
        let clipboard = MemoryClipboard::new();
        clipboard.copy("a");
        clipboard.copy_non_text();
        assert_eq!(clipboard.read_text().unwrap(), None);
    }

    #[test]
    fn test_memory_clipboard_read_failure() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_fail_reads(true);
        assert!(matches!(clipboard.read_text(), Err(EngineError::Clipboard(_))));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_fingerprint_fallback_off_macos() {
        assert_eq!(native_change_count(), None);
    }

    #[test]
    fn test_fingerprint_distinguishes_text() {
        assert_eq!(SystemClipboard::fingerprint(None), None);
        assert_ne!(
            SystemClipboard::fingerprint(Some("a")),
            SystemClipboard::fingerprint(Some("b"))
        );
        assert_eq!(
            SystemClipboard::fingerprint(Some("a")),
            SystemClipboard::fingerprint(Some("a"))
        );
    }
}
