//! # Configuration Management Module
//!
//! Handles all configuration aspects of Questline: the quest definition (name, level,
//! access policy, location sequence), backend connectivity, launch-time session
//! identity, storage paths, and logging.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - Quest name, level, access policy, and location sequence
//! - [`BackendConfig`] - Backend base URL, timeouts, trigger polling, report limits
//! - [`SessionConfig`] - Launch-provided identity (user, team, session token)
//! - [`StorageConfig`] - Data persistence settings
//! - [`LoggingConfig`] - Logging settings
//!
//! ## Configuration File Format
//!
//! Questline uses TOML:
//!
//! ```toml
//! [game]
//! name = "Cyber Village Quest"
//! level = 1
//! access_policy = "named-prerequisite"
//!
//! [backend]
//! base_url = "https://quest.example.com/api"
//! timeout_seconds = 10
//!
//! [session]
//! team_id = "team-blue"
//! auth_token = "opaque-launch-credential"
//! ```
//!
//! The location sequence may be overridden with `[[game.locations]]` tables; when
//! absent, the built-in six-location sequence is used.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::quest::access::{AccessPolicy, LocationGraph, LocationSpec};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub game: GameConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Display name of the quest.
    pub name: String,
    /// Difficulty/campaign level reported with mission events.
    pub level: u32,
    /// Location access policy: "named-prerequisite" or "prefix-count".
    /// Invalid values fall back to "named-prerequisite".
    #[serde(default = "default_access_policy")]
    pub access_policy: String,
    /// Ordered location sequence; empty means the built-in sequence.
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

fn default_access_policy() -> String {
    "named-prerequisite".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub id: String,
    pub name: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL. Unset means offline mode: every backend-dependent
    /// operation degrades to a local no-op/failure return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Interval between trigger evaluations in the run loop.
    pub trigger_poll_seconds: u64,
    /// Maximum detached event reports in flight; excess reports are dropped
    /// (delivery is at-most-once, best-effort by contract).
    pub max_inflight_reports: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: 10,
            trigger_poll_seconds: 15,
            max_inflight_reports: 8,
        }
    }
}

/// Launch-provided session identity. All fields optional: a missing user id gets a
/// locally generated fallback, a missing token leaves the session unauthenticated
/// (backend calls then fail closed).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Generate a random team id when none is provided (web-preview behavior).
    #[serde(default)]
    pub fallback_team: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl GameConfig {
    /// Parse the configured access policy, falling back to named-prerequisite for
    /// unknown values.
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy::parse(&self.access_policy)
    }

    /// Build the location graph from configuration, or the built-in sequence when
    /// no locations are configured.
    pub fn location_graph(&self) -> LocationGraph {
        if self.locations.is_empty() {
            return LocationGraph::builtin();
        }
        let specs = self
            .locations
            .iter()
            .map(|l| LocationSpec {
                id: l.id.clone(),
                name: l.name.clone(),
                order: l.order,
            })
            .collect();
        LocationGraph::new(specs)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            game: GameConfig {
                name: "Cyber Village Quest".to_string(),
                level: 1,
                access_policy: default_access_policy(),
                locations: Vec::new(),
            },
            backend: BackendConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("questline.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.game.name, config.game.name);
        assert_eq!(parsed.backend.timeout_seconds, config.backend.timeout_seconds);
        assert_eq!(parsed.logging.level, "info");
        assert!(parsed.backend.base_url.is_none());
    }

    #[test]
    fn minimal_config_uses_section_defaults() {
        let toml_src = r#"
            [game]
            name = "Test Quest"
            level = 2

            [storage]
            data_dir = "./data"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.game.access_policy, "named-prerequisite");
        assert!(config.game.locations.is_empty());
        assert_eq!(config.backend.trigger_poll_seconds, 15);
        assert!(config.session.auth_token.is_none());
        assert!(!config.session.fallback_team);
    }

    #[test]
    fn invalid_access_policy_falls_back() {
        let game = GameConfig {
            name: "q".to_string(),
            level: 1,
            access_policy: "strictest".to_string(),
            locations: Vec::new(),
        };
        assert_eq!(game.policy(), AccessPolicy::NamedPrerequisite);
    }

    #[test]
    fn configured_locations_override_builtin() {
        let game = GameConfig {
            name: "q".to_string(),
            level: 1,
            access_policy: default_access_policy(),
            locations: vec![
                LocationConfig {
                    id: "alpha".to_string(),
                    name: "Alpha".to_string(),
                    order: 1,
                },
                LocationConfig {
                    id: "beta".to_string(),
                    name: "Beta".to_string(),
                    order: 2,
                },
            ],
        };
        let graph = game.location_graph();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.start_location().map(|l| l.id.as_str()), Some("alpha"));
    }
}
