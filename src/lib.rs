//! # Questline - Progress Engine for Location-Based Quest Games
//!
//! Questline tracks a player's (or team's) progress through an ordered sequence of
//! quest locations, gates access to later locations on completion of earlier ones,
//! rations a limited pool of hints, fires time-based narrative triggers, and reports
//! game events to a remote backend under an authenticated session.
//!
//! ## Features
//!
//! - **Ordered Location Gating**: A total order over quest locations with two
//!   selectable access policies (named-prerequisite and prefix-count).
//! - **Durable Progress**: Completed locations, collected amulets, hint usage, and
//!   position persist across restarts via an embedded sled store; remote sync is
//!   strictly additive and never required for local play.
//! - **Hint Rationing**: A fixed per-session hint budget enforced locally before any
//!   backend request is made.
//! - **Time Triggers**: Declarative wall-clock triggers fetched once per session and
//!   activated at most once, regardless of evaluation cadence.
//! - **Best-Effort Sync**: Fire-and-forget event reports with an authenticated
//!   header; missing credentials fail closed rather than degrading to anonymous calls.
//! - **Async Design**: Built with Tokio; local state transitions never block on the
//!   network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use questline::config::Config;
//! use questline::quest::QuestEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load("config.toml").await?;
//!
//!     // Create the engine and fetch trigger definitions (best effort)
//!     let mut engine = QuestEngine::new(&config)?;
//!     engine.load_triggers().await;
//!
//!     engine.start_game();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`quest`] - Engine core: progress state, access control, hints, triggers, sync
//! - [`storage`] - Progress persistence layer
//! - [`config`] - Configuration management and validation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  QuestEngine    │ ← UI-level operations and glue
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Progress /     │ ← Local state machine (synchronous, authoritative)
//! │  Access / Hints │
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  SyncGateway    │ ← Authenticated, best-effort backend reporting
//! └─────────────────┘
//! ```
//!
//! Local mutations commit (in memory and to the store) before any network call is
//! issued; backend failures are logged and never roll local state back.

pub mod config;
pub mod logutil;
pub mod quest;
pub mod storage;
