//! Location ordering and access control.
//!
//! The quest world is a total order over locations, not a general dependency graph:
//! each location carries a rank and reachability is decided purely from the rank
//! sequence and the player's progress. Two policies exist and are never mixed within
//! a session:
//!
//! - **named-prerequisite**: a location is reachable iff every location of strictly
//!   lower rank has been completed.
//! - **prefix-count**: a location is reachable iff the game has been started and the
//!   location's position in the rank-ordered sequence does not exceed the number of
//!   amulets collected so far.
//!
//! Both policies are monotonic: completions and collections only ever unlock.

use log::warn;

use crate::quest::progress::Progress;

/// One location in the quest sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSpec {
    pub id: String,
    pub name: String,
    /// Rank in the total order; strictly increasing along the sequence.
    pub order: u32,
}

/// The static, rank-ordered location sequence. Immutable at runtime.
#[derive(Debug, Clone)]
pub struct LocationGraph {
    locations: Vec<LocationSpec>,
}

impl LocationGraph {
    /// Build a graph from location specs, sorting by rank.
    pub fn new(mut specs: Vec<LocationSpec>) -> Self {
        specs.sort_by_key(|l| l.order);
        Self { locations: specs }
    }

    /// The built-in six-stage sequence used when configuration supplies none.
    pub fn builtin() -> Self {
        let specs = [
            ("gates", "Village Gates", 1),
            ("dome", "Shield Dome", 2),
            ("mirror", "Mirror of Truth", 3),
            ("stone", "Prophecy Stone", 4),
            ("hut", "Keeper's Hut", 5),
            ("lair", "Virus Lair", 6),
        ]
        .iter()
        .map(|(id, name, order)| LocationSpec {
            id: (*id).to_string(),
            name: (*name).to_string(),
            order: *order,
        })
        .collect();
        Self::new(specs)
    }

    pub fn get(&self, id: &str) -> Option<&LocationSpec> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// 0-based position of a location in the rank-ordered sequence.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.locations.iter().position(|l| l.id == id)
    }

    /// First location in the sequence; the default position of a fresh session.
    pub fn start_location(&self) -> Option<&LocationSpec> {
        self.locations.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationSpec> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Which gating rule decides reachability. Chosen once via configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    NamedPrerequisite,
    PrefixCount,
}

impl AccessPolicy {
    /// Parse a configured policy name. Unknown values fall back to
    /// named-prerequisite with a warning rather than failing startup.
    pub fn parse(value: &str) -> Self {
        match value {
            "named-prerequisite" => AccessPolicy::NamedPrerequisite,
            "prefix-count" => AccessPolicy::PrefixCount,
            other => {
                warn!(
                    "unknown access policy '{}', defaulting to named-prerequisite",
                    other
                );
                AccessPolicy::NamedPrerequisite
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPolicy::NamedPrerequisite => "named-prerequisite",
            AccessPolicy::PrefixCount => "prefix-count",
        }
    }
}

/// Decide whether `location_id` is reachable under the given policy.
/// A location with no match in the graph is never accessible.
pub fn can_access(
    graph: &LocationGraph,
    policy: AccessPolicy,
    progress: &Progress,
    location_id: &str,
) -> bool {
    match policy {
        AccessPolicy::NamedPrerequisite => {
            let Some(target) = graph.get(location_id) else {
                return false;
            };
            graph
                .iter()
                .filter(|l| l.order < target.order)
                .all(|l| progress.completed.contains(&l.id))
        }
        AccessPolicy::PrefixCount => {
            if !progress.game_started {
                return false;
            }
            match graph.position(location_id) {
                Some(position) => position <= progress.collected.len(),
                None => false,
            }
        }
    }
}
