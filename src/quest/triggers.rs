//! Time-gated narrative triggers.
//!
//! Trigger definitions are fetched once per session and are immutable afterwards.
//! Each trigger is a tiny state machine: `Pending` until an evaluation observes
//! `now >= activation_time`, then `Active` forever (recorded in the activation log).
//! Activation is level-triggered: the condition is re-checked on every evaluation,
//! so a missed tick can only delay a firing, never lose it. Unknown trigger kinds
//! deserialize fine and simply never activate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Trigger kind. Only `time` activates today; anything else is inert so newer
/// backend definitions do not break older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Time,
    #[serde(other)]
    Unknown,
}

/// A declarative trigger definition as served by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    #[serde(rename = "activationTime")]
    pub activation_time: DateTime<Utc>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A trigger that fired on this evaluation, ready to surface to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFire {
    pub id: String,
    pub message: Option<String>,
}

/// Evaluates triggers against wall-clock time, activating each at most once per
/// session. Owned exclusively by the engine, so the pending-to-active transition
/// needs no lock.
#[derive(Debug, Default)]
pub struct TriggerScheduler {
    triggers: Vec<Trigger>,
    /// Activation log: trigger id -> when it fired. Presence means "never again".
    activated: HashMap<String, DateTime<Utc>>,
}

impl TriggerScheduler {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        info!("loaded {} trigger definition(s)", triggers.len());
        Self {
            triggers,
            activated: HashMap::new(),
        }
    }

    /// Evaluate every trigger against `now`, returning the ones that fired on this
    /// call. Safe to call at any cadence.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<TriggerFire> {
        let mut fired = Vec::new();
        for trigger in &self.triggers {
            if trigger.kind != TriggerKind::Time {
                continue;
            }
            if self.activated.contains_key(&trigger.id) {
                continue;
            }
            if now >= trigger.activation_time {
                self.activated.insert(trigger.id.clone(), now);
                debug!("trigger {} activated", trigger.id);
                fired.push(TriggerFire {
                    id: trigger.id.clone(),
                    message: trigger.message.clone(),
                });
            }
        }
        fired
    }

    /// When the given trigger activated, if it has.
    pub fn activated_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.activated.get(id).copied()
    }

    /// Triggers still waiting for their deadline (unknown kinds excluded; they
    /// can never fire).
    pub fn pending_count(&self) -> usize {
        self.triggers
            .iter()
            .filter(|t| t.kind == TriggerKind::Time && !self.activated.contains_key(&t.id))
            .count()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn time_trigger(id: &str, activation_time: DateTime<Utc>) -> Trigger {
        Trigger {
            id: id.to_string(),
            kind: TriggerKind::Time,
            activation_time,
            message: Some(format!("message for {}", id)),
        }
    }

    #[test]
    fn past_trigger_fires_exactly_once() {
        let now = Utc::now();
        let mut scheduler = TriggerScheduler::new(vec![time_trigger("t1", now - Duration::hours(1))]);

        let fired = scheduler.evaluate(now);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, "t1");
        assert_eq!(fired[0].message.as_deref(), Some("message for t1"));

        for _ in 0..100 {
            assert!(scheduler.evaluate(now).is_empty());
        }
        assert!(scheduler.activated_at("t1").is_some());
    }

    #[test]
    fn future_trigger_waits_for_deadline() {
        let now = Utc::now();
        let deadline = now + Duration::minutes(5);
        let mut scheduler = TriggerScheduler::new(vec![time_trigger("t1", deadline)]);

        assert!(scheduler.evaluate(now).is_empty());
        assert_eq!(scheduler.pending_count(), 1);

        // A sparse cadence that skips the exact deadline still activates.
        let fired = scheduler.evaluate(deadline + Duration::minutes(30));
        assert_eq!(fired.len(), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn unknown_kinds_are_inert() {
        let now = Utc::now();
        let mut scheduler = TriggerScheduler::new(vec![Trigger {
            id: "geo1".to_string(),
            kind: TriggerKind::Unknown,
            activation_time: now - Duration::hours(1),
            message: None,
        }]);

        assert!(scheduler.evaluate(now).is_empty());
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn unknown_kind_deserializes_without_error() {
        let json = r#"{"id":"g1","type":"geofence","activationTime":"2026-01-01T00:00:00Z"}"#;
        let trigger: Trigger = serde_json::from_str(json).unwrap();
        assert_eq!(trigger.kind, TriggerKind::Unknown);
        assert!(trigger.message.is_none());

        let json = r#"{"id":"t1","type":"time","activationTime":"2026-01-01T00:00:00Z","message":"midnight"}"#;
        let trigger: Trigger = serde_json::from_str(json).unwrap();
        assert_eq!(trigger.kind, TriggerKind::Time);
    }

    #[test]
    fn several_triggers_fire_independently() {
        let now = Utc::now();
        let mut scheduler = TriggerScheduler::new(vec![
            time_trigger("early", now - Duration::hours(2)),
            time_trigger("late", now + Duration::hours(2)),
        ]);

        let fired = scheduler.evaluate(now);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, "early");

        let fired = scheduler.evaluate(now + Duration::hours(3));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, "late");
    }
}
