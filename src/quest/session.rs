//! Session identity and authentication state.
//!
//! A [`SessionContext`] is resolved once at startup from launch configuration and is
//! immutable for the session lifetime. The authentication token is an opaque
//! credential handed over by the hosting platform; Questline never inspects it, only
//! forwards it in the dedicated request header. An absent or empty token leaves the
//! session unauthenticated, and every backend-routed operation then fails closed.

use log::{info, warn};
use rand::Rng;
use uuid::Uuid;

use crate::config::SessionConfig;

/// Identity of the current player plus the opaque launch credential.
#[derive(Debug, Clone)]
pub struct SessionContext {
    user_id: String,
    team_id: Option<String>,
    auth_token: Option<String>,
}

impl SessionContext {
    /// Build a session from explicit parts. Empty strings are normalized to `None`
    /// so an empty token can never masquerade as a credential.
    pub fn new(user_id: String, team_id: Option<String>, auth_token: Option<String>) -> Self {
        let team_id = team_id.filter(|t| !t.is_empty());
        let auth_token = auth_token.filter(|t| !t.is_empty());
        Self {
            user_id,
            team_id,
            auth_token,
        }
    }

    /// Resolve the session from launch configuration. A missing user id gets a
    /// locally generated `web-` fallback (the host platform normally assigns one);
    /// a missing team id is synthesized only when `fallback_team` is enabled.
    pub fn from_config(config: &SessionConfig) -> Self {
        let user_id = match config.user_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let generated = format!("web-{}", Uuid::new_v4());
                info!("no user id provided, generated fallback {}", generated);
                generated
            }
        };

        let team_id = match config.team_id.as_deref() {
            Some(team) if !team.is_empty() => Some(team.to_string()),
            _ if config.fallback_team => {
                let team = format!("team-{}", rand::thread_rng().gen_range(0..1000));
                info!("no team id provided, generated fallback {}", team);
                Some(team)
            }
            _ => None,
        };

        let session = Self::new(user_id, team_id, config.auth_token.clone());
        if !session.is_authenticated() {
            warn!("session has no auth token: backend calls will be skipped");
        }
        session
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    /// The opaque launch credential, if any.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// True when the session carries a non-empty credential.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_unauthenticated() {
        let session = SessionContext::new("u1".to_string(), None, Some(String::new()));
        assert!(!session.is_authenticated());
        assert!(session.auth_token().is_none());
    }

    #[test]
    fn missing_user_id_gets_generated_fallback() {
        let session = SessionContext::from_config(&SessionConfig::default());
        assert!(session.user_id().starts_with("web-"));
        assert!(session.team_id().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn fallback_team_only_when_enabled() {
        let config = SessionConfig {
            fallback_team: true,
            ..SessionConfig::default()
        };
        let session = SessionContext::from_config(&config);
        assert!(session.team_id().unwrap().starts_with("team-"));
    }

    #[test]
    fn configured_identity_is_kept() {
        let config = SessionConfig {
            user_id: Some("player-7".to_string()),
            team_id: Some("team-blue".to_string()),
            auth_token: Some("launch-credential".to_string()),
            fallback_team: false,
        };
        let session = SessionContext::from_config(&config);
        assert_eq!(session.user_id(), "player-7");
        assert_eq!(session.team_id(), Some("team-blue"));
        assert!(session.is_authenticated());
    }
}
