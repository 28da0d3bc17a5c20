//! Remote platform seam.
//!
//! The engine only ever talks to the platform through [`ScoreService`] and
//! asks [`Connectivity`] before trying. Both are traits so tests and
//! offline-only callers can swap the network out entirely.

#[cfg(feature = "api")]
mod http;

#[cfg(feature = "api")]
pub use http::HttpScoreService;

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::achievement::PendingAchievement;
use crate::challenge::Challenge;
use crate::error::{Error, Result};
use crate::score::{PendingScore, SortOrder};

/// A best value the platform reports for one of the player's leaderboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteScore {
    pub leaderboard: String,
    pub value: i64,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Achievement progress as the platform last saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProgress {
    pub achievement: String,
    pub percent: f64,
}

/// Calls into the remote game-services platform. Submissions are fire-once;
/// retry policy lives with the caller.
pub trait ScoreService {
    fn submit_score(&self, entry: &PendingScore) -> Result<()>;

    fn submit_achievement(&self, entry: &PendingAchievement) -> Result<()>;

    fn fetch_player_scores(&self, player: &str) -> Result<Vec<RemoteScore>>;

    fn fetch_player_achievements(&self, player: &str) -> Result<Vec<RemoteProgress>>;

    fn fetch_challenges(&self, player: &str) -> Result<Vec<Challenge>>;

    /// Raw profile image for `player`, whatever format the platform serves.
    fn fetch_player_photo(&self, player: &str) -> Result<Vec<u8>>;

    /// Wipe all achievement progress for `player` on the platform side.
    fn reset_achievements(&self, player: &str) -> Result<()>;
}

/// Service used when no remote endpoint is configured: every call reports
/// [`Error::Offline`], so all writes park in the pending queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineService;

impl ScoreService for OfflineService {
    fn submit_score(&self, _entry: &PendingScore) -> Result<()> {
        Err(Error::Offline)
    }

    fn submit_achievement(&self, _entry: &PendingAchievement) -> Result<()> {
        Err(Error::Offline)
    }

    fn fetch_player_scores(&self, _player: &str) -> Result<Vec<RemoteScore>> {
        Err(Error::Offline)
    }

    fn fetch_player_achievements(&self, _player: &str) -> Result<Vec<RemoteProgress>> {
        Err(Error::Offline)
    }

    fn fetch_challenges(&self, _player: &str) -> Result<Vec<Challenge>> {
        Err(Error::Offline)
    }

    fn fetch_player_photo(&self, _player: &str) -> Result<Vec<u8>> {
        Err(Error::Offline)
    }

    fn reset_achievements(&self, _player: &str) -> Result<()> {
        Err(Error::Offline)
    }
}

/// Reachability oracle consulted before any remote attempt.
pub trait Connectivity {
    fn is_online(&self) -> bool;
}

/// Oracle that always answers yes. The default when the embedding app has no
/// reachability signal of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Flippable oracle for apps that track reachability themselves, and for
/// tests that script connectivity loss.
#[derive(Debug)]
pub struct ToggleConnectivity {
    online: AtomicBool,
}

impl ToggleConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for ToggleConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
