//! # podium-core
//!
//! Offline-first score and achievement tracking for game-services
//! platforms.
//!
//! This crate provides:
//! - A per-player cache of best scores and achievement progress with
//!   monotonic merge rules (a worse score or lower percentage never
//!   overwrites a better one)
//! - A pending queue for saves made while signed out or offline, replayed
//!   with best-effort flushes when the platform is reachable again
//! - A reconciliation engine that merges the platform's view of a player
//!   back into the local cache
//! - A thread-backed [`Manager`] facade with non-blocking submits and a
//!   typed event stream
//!
//! ## Feature Flags
//!
//! - `api`: Enables [`HttpScoreService`], a REST binding for the remote
//!   platform. Without it the crate is purely local and callers supply
//!   their own [`ScoreService`].

pub mod achievement;
pub mod cache;
pub mod challenge;
pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod player;
pub mod reconcile;
pub mod score;
pub mod service;
pub mod store;

pub use achievement::{clamp_percent, PendingAchievement, COMPLETE_PERCENT};
pub use cache::PlayerCache;
pub use challenge::{Challenge, ChallengeState};
pub use config::ManagerConfig;
pub use error::{Error, Result};
pub use event::{ChannelSink, Event, EventSink, Sinks};
pub use manager::Manager;
pub use player::{
    cache_key, AuthProvider, Player, StaticAuth, ToggleAuth, UNKNOWN_PLAYER,
};
pub use reconcile::{
    DeferReason, FlushReport, Link, Reconciler, Submission, SubmitOutcome, SyncReport,
};
pub use score::{BestScore, PendingScore, SortOrder};
pub use service::{
    AlwaysOnline, Connectivity, OfflineService, RemoteProgress, RemoteScore, ScoreService,
    ToggleConnectivity,
};
pub use store::{CacheStore, JsonStore, MemoryStore, PlainCipher, StoreCipher};

// REST binding (requires api feature)
#[cfg(feature = "api")]
pub use service::HttpScoreService;
