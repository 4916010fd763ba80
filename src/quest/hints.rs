//! Hint budget enforcement.
//!
//! The budget is a fixed per-session constant; only the consumed count persists.
//! Rationing happens locally before any backend hint request is made, so an empty
//! budget never costs a network round trip.

use crate::quest::progress::Progress;
use crate::storage::ProgressStore;

/// Hints available per session.
pub const MAX_HINTS: u32 = 3;

/// Enforces the hint budget against [`Progress`].
#[derive(Debug, Clone, Copy)]
pub struct HintRationer {
    max_hints: u32,
}

impl Default for HintRationer {
    fn default() -> Self {
        Self {
            max_hints: MAX_HINTS,
        }
    }
}

impl HintRationer {
    /// Consume one hint if the budget allows. On success the counter is
    /// incremented and persisted; otherwise state is left untouched.
    pub fn use_hint(&self, progress: &mut Progress, store: &ProgressStore) -> bool {
        if progress.hints_used >= self.max_hints {
            return false;
        }
        progress.record_hint_used(store);
        true
    }

    /// Remaining budget; never negative even if a stored counter overshoots.
    pub fn hints_left(&self, progress: &Progress) -> u32 {
        self.max_hints.saturating_sub(progress.hints_used)
    }
}
