use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::achievement::{clamp_percent, PendingAchievement};
use crate::player::UNKNOWN_PLAYER;
use crate::score::{BestScore, PendingScore, SortOrder};

/// Everything tracked for one player: confirmed-or-local bests, achievement
/// progress, and the queue of saves still waiting for the remote platform.
///
/// Maps are ordered so flushes and serialized state stay deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCache {
    pub player: String,
    pub high_scores: BTreeMap<String, BestScore>,
    pub progress: BTreeMap<String, f64>,
    pub pending_scores: BTreeMap<String, PendingScore>,
    pub pending_achievements: BTreeMap<String, PendingAchievement>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Default for PlayerCache {
    fn default() -> Self {
        Self::new(UNKNOWN_PLAYER)
    }
}

impl PlayerCache {
    pub fn new(player: &str) -> Self {
        Self {
            player: player.to_string(),
            high_scores: BTreeMap::new(),
            progress: BTreeMap::new(),
            pending_scores: BTreeMap::new(),
            pending_achievements: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record a score against the local best. Returns `true` when the value
    /// is the first for the leaderboard or strictly better under `sort`;
    /// otherwise the cache is untouched.
    pub fn record_score(&mut self, leaderboard: &str, value: i64, sort: SortOrder) -> bool {
        match self.high_scores.get(leaderboard) {
            Some(best) if !sort.is_improvement(value, best.value) => false,
            _ => {
                self.high_scores
                    .insert(leaderboard.to_string(), BestScore::new(value, sort));
                self.touch();
                true
            }
        }
    }

    pub fn best_score(&self, leaderboard: &str) -> Option<i64> {
        self.high_scores.get(leaderboard).map(|best| best.value)
    }

    /// Record achievement progress. Values are clamped to `0..=100` and only
    /// strict increases are kept, so progress can never move backwards.
    pub fn record_progress(&mut self, achievement: &str, percent: f64) -> bool {
        let percent = clamp_percent(percent);
        let current = self.progress(achievement);
        if percent > current {
            self.progress.insert(achievement.to_string(), percent);
            self.touch();
            true
        } else {
            false
        }
    }

    /// Stored progress for an achievement, `0.0` when never reported.
    pub fn progress(&self, achievement: &str) -> f64 {
        self.progress.get(achievement).copied().unwrap_or(0.0)
    }

    /// Park a score for a later flush. At most one entry is kept per
    /// leaderboard; an incoming entry replaces the parked one only when it
    /// beats it.
    pub fn queue_score(&mut self, entry: PendingScore) -> bool {
        match self.pending_scores.get(&entry.leaderboard) {
            Some(parked) if !entry.beats(parked) => false,
            _ => {
                self.pending_scores.insert(entry.leaderboard.clone(), entry);
                self.touch();
                true
            }
        }
    }

    /// Park an achievement report, keeping only the highest percentage seen
    /// per achievement.
    pub fn queue_achievement(&mut self, entry: PendingAchievement) -> bool {
        match self.pending_achievements.get(&entry.achievement) {
            Some(parked) if entry.percent <= parked.percent => false,
            _ => {
                self.pending_achievements
                    .insert(entry.achievement.clone(), entry);
                self.touch();
                true
            }
        }
    }

    pub fn clear_pending_score(&mut self, leaderboard: &str) -> Option<PendingScore> {
        let removed = self.pending_scores.remove(leaderboard);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn clear_pending_achievement(&mut self, achievement: &str) -> Option<PendingAchievement> {
        let removed = self.pending_achievements.remove(achievement);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn pending_count(&self) -> usize {
        self.pending_scores.len() + self.pending_achievements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.high_scores.is_empty() && self.progress.is_empty() && self.pending_count() == 0
    }

    /// Wipe achievement state, parked reports included. Called after the
    /// platform confirms a remote reset.
    pub fn reset_achievements(&mut self) {
        self.progress.clear();
        self.pending_achievements.clear();
        self.touch();
    }

    /// Drop queue entries the cached state strictly beats, typically after
    /// remote values were merged in. An entry matching the cached best is
    /// the undelivered write that produced it, so it stays parked. Returns
    /// how many were removed.
    pub fn prune_subsumed(&mut self) -> usize {
        let before = self.pending_count();
        let bests = self.high_scores.clone();
        self.pending_scores.retain(|board, entry| match bests.get(board) {
            Some(best) => !entry.sort.is_improvement(best.value, entry.value),
            None => true,
        });
        let progress = self.progress.clone();
        self.pending_achievements
            .retain(|id, entry| entry.percent >= progress.get(id).copied().unwrap_or(0.0));
        let removed = before - self.pending_count();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Fold another player's state into this one using the same monotonic
    /// rules as live recording. Used when saves filed under
    /// [`UNKNOWN_PLAYER`] are claimed by whoever signs in next; queued
    /// entries are re-attributed to this player.
    pub fn adopt(&mut self, other: PlayerCache) -> usize {
        let mut merged = 0;
        for (board, best) in &other.high_scores {
            if self.record_score(board, best.value, best.sort) {
                merged += 1;
            }
        }
        for (id, percent) in &other.progress {
            if self.record_progress(id, *percent) {
                merged += 1;
            }
        }
        for (_, mut entry) in other.pending_scores {
            entry.player = self.player.clone();
            if self.queue_score(entry) {
                merged += 1;
            }
        }
        for (_, mut entry) in other.pending_achievements {
            entry.player = self.player.clone();
            if self.queue_achievement(entry) {
                merged += 1;
            }
        }
        if merged > 0 {
            debug!(player = %self.player, merged, "adopted orphaned state");
        }
        merged
    }
}
