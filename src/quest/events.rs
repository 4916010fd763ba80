//! Game events reported to the backend.
//!
//! Events are a closed, tagged set with fixed payload shapes; the wire format uses
//! camelCase field names inside `eventData` to match the backend contract.

use serde_json::{json, Value};

/// A reportable game event. Constructed at the moment the corresponding local
/// state transition commits; the report itself is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The player (team) started the mission.
    MissionStarted {
        level: u32,
        team_id: Option<String>,
    },
    /// The player moved to a new location.
    LocationChanged { location: String },
    /// An amulet was collected; `amulet_number` is the running total.
    AmuletCollected {
        amulet_number: usize,
        location: String,
    },
    /// Every location is done.
    MissionCompleted {
        amulets: usize,
        level: u32,
        locations: usize,
    },
}

impl GameEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::MissionStarted { .. } => "mission_started",
            GameEvent::LocationChanged { .. } => "location_changed",
            GameEvent::AmuletCollected { .. } => "amulet_collected",
            GameEvent::MissionCompleted { .. } => "mission_completed",
        }
    }

    /// Wire payload (`eventData`).
    pub fn payload(&self) -> Value {
        match self {
            GameEvent::MissionStarted { level, team_id } => json!({
                "level": level,
                "teamId": team_id,
            }),
            GameEvent::LocationChanged { location } => json!({
                "location": location,
            }),
            GameEvent::AmuletCollected {
                amulet_number,
                location,
            } => json!({
                "amuletNumber": amulet_number,
                "location": location,
            }),
            GameEvent::MissionCompleted {
                amulets,
                level,
                locations,
            } => json!({
                "amulets": amulets,
                "level": level,
                "locations": locations,
            }),
        }
    }
}
