//! In-memory progress state and its persisted mirror.
//!
//! [`Progress`] is the authoritative record of the session: the store is only a
//! projection of it, read once at load and written after every mutation. A failed
//! write is logged and ignored so a storage hiccup can never lose or corrupt the
//! running session; a corrupt stored value is discarded at load time and the field
//! starts fresh.
//!
//! Mutation and persistence happen on one control flow with no await point between
//! them, so each operation is atomic with respect to the rest of the engine.

use std::collections::BTreeSet;

use log::{info, warn};

use crate::quest::access::{AccessPolicy, LocationGraph};
use crate::storage::{
    ProgressStore, StoreError, KEY_COLLECTED, KEY_COMPLETED, KEY_CURRENT_LOCATION,
    KEY_GAME_STARTED, KEY_HINTS_USED,
};

/// The player's progress through the quest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Completed location ids. Monotonic: only grows, cleared only by reset.
    pub completed: BTreeSet<String>,
    /// Locations at which an amulet was collected, in collection order.
    /// Duplicates are rejected.
    pub collected: Vec<String>,
    /// Hints consumed so far. Bounded by the rationer, not here.
    pub hints_used: u32,
    /// Last-known position; defaults to the first location in the graph.
    pub current_location: String,
    /// Set once by `start_game`; gates all access under the prefix-count policy.
    pub game_started: bool,
}

fn persist(field: &str, result: Result<(), StoreError>) {
    if let Err(e) = result {
        warn!("failed to persist {}: {} (keeping in-memory state)", field, e);
    }
}

impl Progress {
    /// Load progress from the store, treating missing or corrupt fields as fresh.
    pub fn load(store: &ProgressStore, graph: &LocationGraph) -> Self {
        let start = graph
            .start_location()
            .map(|l| l.id.clone())
            .unwrap_or_default();
        let progress = Self {
            completed: store.get(KEY_COMPLETED).unwrap_or_default(),
            collected: store.get(KEY_COLLECTED).unwrap_or_default(),
            hints_used: store.get(KEY_HINTS_USED).unwrap_or(0),
            current_location: store.get(KEY_CURRENT_LOCATION).unwrap_or(start),
            game_started: store.get(KEY_GAME_STARTED).unwrap_or(false),
        };
        info!(
            "loaded progress: {} completed, {} amulets, {} hints used, at {}",
            progress.completed.len(),
            progress.collected.len(),
            progress.hints_used,
            progress.current_location
        );
        progress
    }

    /// Record a location as completed. Idempotent; legality of `id` is the
    /// access controller's business, not checked here.
    pub fn mark_location_completed(&mut self, store: &ProgressStore, id: &str) {
        if self.completed.insert(id.to_string()) {
            persist(KEY_COMPLETED, store.put(KEY_COMPLETED, &self.completed));
        }
    }

    /// Record an amulet collected at `at`. Returns whether a new amulet was
    /// recorded; collecting at an already-recorded location is a no-op.
    pub fn collect_item(&mut self, store: &ProgressStore, at: &str) -> bool {
        if self.collected.iter().any(|l| l == at) {
            return false;
        }
        self.collected.push(at.to_string());
        persist(KEY_COLLECTED, store.put(KEY_COLLECTED, &self.collected));
        true
    }

    /// Overwrite the player's position.
    pub fn set_current_location(&mut self, store: &ProgressStore, id: &str) {
        self.current_location = id.to_string();
        persist(
            KEY_CURRENT_LOCATION,
            store.put(KEY_CURRENT_LOCATION, &self.current_location),
        );
    }

    /// Consume one hint. Bound enforcement lives in the rationer.
    pub fn record_hint_used(&mut self, store: &ProgressStore) {
        self.hints_used += 1;
        persist(KEY_HINTS_USED, store.put(KEY_HINTS_USED, &self.hints_used));
    }

    /// Mark the game as started.
    pub fn start_game(&mut self, store: &ProgressStore) {
        if self.game_started {
            return;
        }
        self.game_started = true;
        persist(KEY_GAME_STARTED, store.put(KEY_GAME_STARTED, &self.game_started));
    }

    /// Clear all fields back to initial values. The store clear is a single batch
    /// so the persisted mirror never holds a partial reset.
    pub fn reset(&mut self, store: &ProgressStore, graph: &LocationGraph) {
        self.completed.clear();
        self.collected.clear();
        self.hints_used = 0;
        self.current_location = graph
            .start_location()
            .map(|l| l.id.clone())
            .unwrap_or_default();
        self.game_started = false;
        persist("reset", store.clear());
        info!("progress reset");
    }

    /// Quest-completion predicate, defined in terms of the configured access
    /// policy: completed-count for named-prerequisite, amulet-count for
    /// prefix-count.
    pub fn is_complete(&self, policy: AccessPolicy, total_locations: usize) -> bool {
        if total_locations == 0 {
            return false;
        }
        match policy {
            AccessPolicy::NamedPrerequisite => self.completed.len() >= total_locations,
            AccessPolicy::PrefixCount => self.collected.len() >= total_locations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ProgressStoreBuilder;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ProgressStore, LocationGraph) {
        let dir = TempDir::new().expect("tempdir");
        let store = ProgressStoreBuilder::new(dir.path()).open().expect("store");
        (dir, store, LocationGraph::builtin())
    }

    #[test]
    fn completion_is_monotonic_and_idempotent() {
        let (_dir, store, graph) = setup();
        let mut progress = Progress::load(&store, &graph);

        progress.mark_location_completed(&store, "gates");
        assert_eq!(progress.completed.len(), 1);
        progress.mark_location_completed(&store, "gates");
        assert_eq!(progress.completed.len(), 1);
        progress.mark_location_completed(&store, "dome");
        assert_eq!(progress.completed.len(), 2);
    }

    #[test]
    fn duplicate_collection_is_a_no_op() {
        let (_dir, store, graph) = setup();
        let mut progress = Progress::load(&store, &graph);

        assert!(progress.collect_item(&store, "forest"));
        assert!(!progress.collect_item(&store, "forest"));
        assert!(progress.collect_item(&store, "lake"));
        assert_eq!(progress.collected, vec!["forest", "lake"]);
    }

    #[test]
    fn fresh_session_starts_at_first_location() {
        let (_dir, store, graph) = setup();
        let progress = Progress::load(&store, &graph);
        assert_eq!(progress.current_location, "gates");
        assert!(!progress.game_started);
        assert_eq!(progress.hints_used, 0);
    }

    #[test]
    fn round_trip_through_store() {
        let dir = TempDir::new().expect("tempdir");
        let graph = LocationGraph::builtin();
        {
            let store = ProgressStoreBuilder::new(dir.path()).open().expect("store");
            let mut progress = Progress::load(&store, &graph);
            progress.start_game(&store);
            progress.mark_location_completed(&store, "gates");
            progress.mark_location_completed(&store, "dome");
            progress.collect_item(&store, "gates");
            progress.record_hint_used(&store);
            progress.set_current_location(&store, "dome");
        }

        let store = ProgressStoreBuilder::new(dir.path()).open().expect("reopen");
        let progress = Progress::load(&store, &graph);
        assert!(progress.game_started);
        assert_eq!(progress.completed.len(), 2);
        assert!(progress.completed.contains("dome"));
        assert_eq!(progress.collected, vec!["gates"]);
        assert_eq!(progress.hints_used, 1);
        assert_eq!(progress.current_location, "dome");
    }

    #[test]
    fn reset_restores_initial_state() {
        let (_dir, store, graph) = setup();
        let mut progress = Progress::load(&store, &graph);
        progress.start_game(&store);
        progress.mark_location_completed(&store, "gates");
        progress.collect_item(&store, "gates");
        progress.record_hint_used(&store);
        progress.set_current_location(&store, "mirror");

        progress.reset(&store, &graph);

        let fresh = Progress::load(&store, &graph);
        assert_eq!(progress, fresh);
        assert!(fresh.completed.is_empty());
        assert!(fresh.collected.is_empty());
        assert_eq!(fresh.hints_used, 0);
        assert_eq!(fresh.current_location, "gates");
        assert!(!fresh.game_started);
    }

    #[test]
    fn completion_predicate_follows_policy() {
        let (_dir, store, graph) = setup();
        let mut progress = Progress::load(&store, &graph);
        for l in ["gates", "dome", "mirror", "stone", "hut", "lair"] {
            progress.mark_location_completed(&store, l);
        }
        assert!(progress.is_complete(AccessPolicy::NamedPrerequisite, graph.len()));
        // No amulets collected: prefix-count completion is amulet-based.
        assert!(!progress.is_complete(AccessPolicy::PrefixCount, graph.len()));
    }
}
