use crate::shared::errors::EngineError;

/// Result of comparing the host generation against the last observed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationCheck {
    /// First observation; recorded as the baseline, nothing to ingest
    Seeded,
    Unchanged,
    /// Change caused by our own clipboard write
    Suppressed,
    Changed,
}

/// Tracks the last observed clipboard generation and at most one
/// self-originated generation still waiting to be seen.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    last_observed: Option<u64>,
    suppressed: Option<u64>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_observed(&self) -> Option<u64> {
        self.last_observed
    }

    pub fn suppressed(&self) -> Option<u64> {
        self.suppressed
    }

    /// Mark `generation` as produced by an internal write
    pub fn suppress(&mut self, generation: u64) {
        self.suppressed = Some(generation);
    }

    pub fn check(&mut self, current: u64) -> GenerationCheck {
        let last = match self.last_observed {
            None => {
                self.last_observed = Some(current);
                return GenerationCheck::Seeded;
            }
            Some(last) => last,
        };
        if last == current {
            return GenerationCheck::Unchanged;
        }
        self.last_observed = Some(current);

        match self.suppressed {
            Some(marked) if marked == current => {
                self.suppressed = None;
                GenerationCheck::Suppressed
            }
            // Mark is still ahead of the host; keep waiting for it
            Some(marked) if marked > current => GenerationCheck::Changed,
            // An external copy landed after our write; the mark is stale
            Some(_) => {
                self.suppressed = None;
                GenerationCheck::Changed
            }
            None => GenerationCheck::Changed,
        }
    }
}

/// What a single watcher tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Seeded,
    Unchanged,
    Suppressed,
    /// Changed while monitoring was paused; generation consumed, not ingested
    Paused,
    /// Changed but the clipboard held no text
    NoText,
    /// Changed to empty text
    Ignored,
    Ingested { id: String },
    /// Recorded and immediately evicted because every other entry is pinned
    Discarded,
    ReadFailed(EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_check_seeds() {
        let mut tracker = GenerationTracker::new();
        assert_eq!(tracker.check(7), GenerationCheck::Seeded);
        assert_eq!(tracker.check(7), GenerationCheck::Unchanged);
        assert_eq!(tracker.check(8), GenerationCheck::Changed);
        assert_eq!(tracker.last_observed(), Some(8));
    }

    #[test]
    fn test_suppressed_generation_consumed_once() {
        let mut tracker = GenerationTracker::new();
        tracker.check(1);
        tracker.suppress(2);

        assert_eq!(tracker.check(2), GenerationCheck::Suppressed);
        assert_eq!(tracker.suppressed(), None);
        assert_eq!(tracker.check(3), GenerationCheck::Changed);
    }

    #[test]
    fn test_stale_mark_dropped_when_host_moves_past_it() {
        let mut tracker = GenerationTracker::new();
        tracker.check(1);
        tracker.suppress(2);

        // Our write and a later external copy both happened before the tick
        assert_eq!(tracker.check(3), GenerationCheck::Changed);
        assert_eq!(tracker.suppressed(), None);
    }

    #[test]
    fn test_mark_ahead_of_host_is_kept() {
        let mut tracker = GenerationTracker::new();
        tracker.check(1);
        tracker.suppress(5);

        assert_eq!(tracker.check(2), GenerationCheck::Changed);
        assert_eq!(tracker.suppressed(), Some(5));
        assert_eq!(tracker.check(5), GenerationCheck::Suppressed);
    }
}
