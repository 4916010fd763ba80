//! Authenticated backend synchronization.
//!
//! Two call shapes live here. Event reports are fire-and-forget: the local state
//! transition has already committed when a report is submitted, and delivery is
//! at-most-once, best-effort (no queue, no retry, failures logged and swallowed).
//! Mission, hint, password, and trigger calls are request/response and suspend the
//! caller until the backend answers or the timeout elapses.
//!
//! Every call requires the opaque session token; a missing token is a local
//! failure and no network call is attempted. The gateway never substitutes an
//! unauthenticated request for an authenticated one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::BackendConfig;
use crate::logutil::escape_log;
use crate::quest::errors::QuestError;
use crate::quest::events::GameEvent;
use crate::quest::session::SessionContext;
use crate::quest::triggers::Trigger;

/// Request header carrying the opaque launch credential.
pub const AUTH_HEADER: &str = "X-Session-Token";

/// What happened to a fire-and-forget event report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Backend acknowledged the event.
    Sent,
    /// Skipped locally: no token or no configured endpoint. Not an error, but
    /// never silently upgraded to an anonymous call either.
    NotSent,
    /// A network call was attempted and failed; local state is unaffected.
    Failed,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventReport<'a> {
    event_type: &'a str,
    event_data: Value,
    user_id: &'a str,
    team_id: Option<&'a str>,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MissionRequest<'a> {
    location: &'a str,
    user_id: &'a str,
    team_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HintRequest<'a> {
    location: &'a str,
    hint_level: u32,
    user_id: &'a str,
    team_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    location: &'a str,
    password: &'a str,
    user_id: &'a str,
    team_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct MissionResponse {
    mission: String,
}

#[derive(Debug, Deserialize)]
struct HintResponse {
    hint: String,
}

/// Backend's answer to a password attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordVerdict {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Authenticated, best-effort gateway to the quest backend. Cloning is cheap
/// (the HTTP client and session are reference-counted) and is how detached
/// report tasks get their own handle.
#[derive(Clone)]
pub struct SyncGateway {
    backend: BackendConfig,
    session: Arc<SessionContext>,
    client: reqwest::Client,
    /// Caps detached reports in flight; overflow drops the report.
    report_slots: Arc<Semaphore>,
}

impl SyncGateway {
    pub fn new(backend: BackendConfig, session: Arc<SessionContext>) -> Self {
        let slots = backend.max_inflight_reports.max(1);
        Self {
            backend,
            session,
            client: reqwest::Client::new(),
            report_slots: Arc::new(Semaphore::new(slots)),
        }
    }

    /// True when the gateway has both an endpoint and a credential to use.
    pub fn is_configured(&self) -> bool {
        self.backend.base_url.is_some() && self.session.is_authenticated()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds)
    }

    fn require_auth(&self) -> Result<&str, QuestError> {
        self.session.auth_token().ok_or(QuestError::Unauthorized)
    }

    fn endpoint(&self, path: &str) -> Result<String, QuestError> {
        let base = self
            .backend
            .base_url
            .as_deref()
            .ok_or(QuestError::Unconfigured)?;
        Ok(format!("{}/{}", base.trim_end_matches('/'), path))
    }

    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, QuestError> {
        let response = timeout(self.request_timeout(), request.send())
            .await
            .map_err(|_| QuestError::Timeout(self.backend.timeout_seconds))??;
        if !response.status().is_success() {
            return Err(QuestError::Status(response.status()));
        }
        Ok(response)
    }

    /// Report a game event, returning what happened. The caller's state
    /// transition has already committed; nothing here rolls it back.
    pub async fn report_event(&self, event: &GameEvent) -> ReportOutcome {
        let Some(token) = self.session.auth_token() else {
            warn!("skipping {} report: session is not authenticated", event.kind());
            return ReportOutcome::NotSent;
        };
        let url = match self.endpoint("game-event") {
            Ok(url) => url,
            Err(_) => {
                warn!(
                    "skipping {} report: backend endpoint not configured",
                    event.kind()
                );
                return ReportOutcome::NotSent;
            }
        };

        let body = EventReport {
            event_type: event.kind(),
            event_data: event.payload(),
            user_id: self.session.user_id(),
            team_id: self.session.team_id(),
            timestamp: Utc::now(),
        };
        let request = self.client.post(&url).header(AUTH_HEADER, token).json(&body);

        match timeout(self.request_timeout(), request.send()).await {
            Err(_) => {
                warn!(
                    "{} report timed out after {}s",
                    event.kind(),
                    self.backend.timeout_seconds
                );
                ReportOutcome::Failed
            }
            Ok(Err(e)) => {
                warn!("{} report failed: {}", event.kind(), e);
                ReportOutcome::Failed
            }
            Ok(Ok(response)) if !response.status().is_success() => {
                warn!("{} report rejected: status {}", event.kind(), response.status());
                ReportOutcome::Failed
            }
            Ok(Ok(_)) => {
                debug!("reported {}", event.kind());
                ReportOutcome::Sent
            }
        }
    }

    /// Submit a report as a detached task so the caller never blocks on the
    /// network. In-flight reports are capped; when the cap is hit the report is
    /// dropped with a log line (the delivery contract is best-effort).
    pub fn spawn_report(&self, event: GameEvent) {
        let permit = match Arc::clone(&self.report_slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("dropping {} report: too many reports in flight", event.kind());
                return;
            }
        };
        let gateway = self.clone();
        tokio::spawn(async move {
            let _permit = permit;
            gateway.report_event(&event).await;
        });
    }

    /// Fetch the mission briefing for a location.
    pub async fn fetch_mission(&self, location: &str) -> Result<String, QuestError> {
        let token = self.require_auth()?;
        let url = self.endpoint("get-mission")?;
        let body = MissionRequest {
            location,
            user_id: self.session.user_id(),
            team_id: self.session.team_id(),
        };
        let request = self.client.post(&url).header(AUTH_HEADER, token).json(&body);
        let response = self.send_checked(request).await?;
        let payload: MissionResponse = response.json().await?;
        debug!(
            "mission for {}: {}",
            location,
            escape_log(&payload.mission)
        );
        Ok(payload.mission)
    }

    /// Request a hint for a location. Budget enforcement is the rationer's
    /// business and has already happened when this is called.
    pub async fn request_hint(
        &self,
        location: &str,
        hint_level: u32,
    ) -> Result<String, QuestError> {
        let token = self.require_auth()?;
        let url = self.endpoint("request-hint")?;
        let body = HintRequest {
            location,
            hint_level,
            user_id: self.session.user_id(),
            team_id: self.session.team_id(),
        };
        let request = self.client.post(&url).header(AUTH_HEADER, token).json(&body);
        let response = self.send_checked(request).await?;
        let payload: HintResponse = response.json().await?;
        Ok(payload.hint)
    }

    /// Check a location password against the backend.
    pub async fn check_password(
        &self,
        location: &str,
        password: &str,
    ) -> Result<PasswordVerdict, QuestError> {
        let token = self.require_auth()?;
        let url = self.endpoint("check-password")?;
        let body = PasswordRequest {
            location,
            password,
            user_id: self.session.user_id(),
            team_id: self.session.team_id(),
        };
        let request = self.client.post(&url).header(AUTH_HEADER, token).json(&body);
        let response = self.send_checked(request).await?;
        Ok(response.json::<PasswordVerdict>().await?)
    }

    /// Fetch the session's trigger definitions. Called once at startup.
    pub async fn fetch_triggers(&self) -> Result<Vec<Trigger>, QuestError> {
        let token = self.require_auth()?;
        let url = self.endpoint("triggers")?;
        let request = self.client.get(&url).header(AUTH_HEADER, token);
        let response = self.send_checked(request).await?;
        Ok(response.json::<Vec<Trigger>>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn session(token: Option<&str>) -> Arc<SessionContext> {
        Arc::new(SessionContext::new(
            "u1".to_string(),
            Some("team-blue".to_string()),
            token.map(str::to_string),
        ))
    }

    fn backend(base_url: Option<&str>) -> BackendConfig {
        BackendConfig {
            base_url: base_url.map(str::to_string),
            timeout_seconds: 1,
            ..BackendConfig::default()
        }
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let gateway = SyncGateway::new(
            backend(Some("https://quest.example.com/api/")),
            session(Some("tok")),
        );
        assert_eq!(
            gateway.endpoint("game-event").unwrap(),
            "https://quest.example.com/api/game-event"
        );
    }

    #[test]
    fn unconfigured_gateway_has_no_endpoint() {
        let gateway = SyncGateway::new(backend(None), session(Some("tok")));
        assert!(matches!(
            gateway.endpoint("triggers"),
            Err(QuestError::Unconfigured)
        ));
        assert!(!gateway.is_configured());
    }

    #[tokio::test]
    async fn report_without_token_is_not_sent() {
        let gateway = SyncGateway::new(backend(Some("http://127.0.0.1:1/api")), session(None));
        let outcome = gateway
            .report_event(&GameEvent::LocationChanged {
                location: "gates".to_string(),
            })
            .await;
        assert_eq!(outcome, ReportOutcome::NotSent);
    }

    #[tokio::test]
    async fn report_without_endpoint_is_not_sent() {
        let gateway = SyncGateway::new(backend(None), session(Some("tok")));
        let outcome = gateway
            .report_event(&GameEvent::LocationChanged {
                location: "gates".to_string(),
            })
            .await;
        assert_eq!(outcome, ReportOutcome::NotSent);
    }

    #[tokio::test]
    async fn request_calls_fail_locally_without_token() {
        let gateway = SyncGateway::new(backend(Some("http://127.0.0.1:1/api")), session(None));
        assert!(matches!(
            gateway.fetch_mission("gates").await,
            Err(QuestError::Unauthorized)
        ));
        assert!(matches!(
            gateway.request_hint("gates", 1).await,
            Err(QuestError::Unauthorized)
        ));
        assert!(matches!(
            gateway.check_password("gates", "pw").await,
            Err(QuestError::Unauthorized)
        ));
        assert!(matches!(
            gateway.fetch_triggers().await,
            Err(QuestError::Unauthorized)
        ));
    }
}
