//! The reconciliation engine.
//!
//! Every save first lands in the local cache under the monotonic rules, then
//! either goes straight to the platform or parks in the pending queue for a
//! later flush. A flush is one best-effort pass over the queue: whatever the
//! platform accepts is removed, whatever fails stays for the next trigger.
//! There is no backoff and no retry count; game telemetry is written rarely
//! enough that the next submit or connectivity change is the retry.

use std::fmt;
use std::sync::Arc;

use strum::Display;
use tracing::{debug, info, warn};

use crate::achievement::{clamp_percent, PendingAchievement};
use crate::cache::PlayerCache;
use crate::challenge::Challenge;
use crate::error::{Error, Result};
use crate::player::UNKNOWN_PLAYER;
use crate::score::{PendingScore, SortOrder};
use crate::service::ScoreService;
use crate::store::CacheStore;

/// Availability picture for one operation, already gated in order:
/// capability, then identity, then reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Link {
    Online,
    Offline,
    Unauthenticated,
    Unavailable,
}

impl Link {
    pub fn is_online(self) -> bool {
        matches!(self, Link::Online)
    }

    pub fn require_online(self) -> Result<()> {
        match self {
            Link::Online => Ok(()),
            Link::Offline => Err(Error::Offline),
            Link::Unauthenticated => Err(Error::Unauthenticated),
            Link::Unavailable => Err(Error::Unavailable),
        }
    }

    fn defer_reason(self) -> Option<DeferReason> {
        match self {
            Link::Online => None,
            Link::Offline => Some(DeferReason::Offline),
            Link::Unauthenticated => Some(DeferReason::Unauthenticated),
            Link::Unavailable => Some(DeferReason::Unavailable),
        }
    }
}

/// Why a write was parked instead of delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferReason {
    Unauthenticated,
    Unavailable,
    Offline,
    /// The platform answered and said no.
    Remote(String),
}

impl DeferReason {
    fn from_error(err: &Error) -> Self {
        match err {
            Error::Unauthenticated => DeferReason::Unauthenticated,
            Error::Unavailable => DeferReason::Unavailable,
            Error::Offline => DeferReason::Offline,
            other => DeferReason::Remote(other.to_string()),
        }
    }
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::Unauthenticated => write!(f, "not signed in"),
            DeferReason::Unavailable => write!(f, "game services unavailable"),
            DeferReason::Offline => write!(f, "offline"),
            DeferReason::Remote(msg) => write!(f, "remote: {msg}"),
        }
    }
}

/// What happened to a single submit call.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Delivered to the platform.
    Sent,
    /// Parked in the pending queue for a later flush.
    Deferred(DeferReason),
    /// Not an improvement on the cached value; dropped entirely.
    Skipped,
}

impl Submission {
    pub fn is_sent(&self) -> bool {
        matches!(self, Submission::Sent)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Submission::Deferred(_))
    }
}

/// Tally of one pass over the pending queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    pub sent_scores: Vec<PendingScore>,
    pub sent_achievements: Vec<PendingAchievement>,
    pub failed: usize,
}

impl FlushReport {
    pub fn sent_count(&self) -> usize {
        self.sent_scores.len() + self.sent_achievements.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn is_empty(&self) -> bool {
        self.sent_count() == 0 && self.failed == 0
    }
}

/// Result of a submit call, including whatever the opportunistic queue pass
/// delivered before the new value was considered.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub submission: Submission,
    pub flushed: FlushReport,
}

/// Tally of a full reconcile against the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub merged_scores: usize,
    pub merged_achievements: usize,
    /// Queue entries dropped because merged remote values subsumed them.
    pub pruned: usize,
    pub flush: FlushReport,
}

/// Owns one player's cache and decides, for every save, between immediate
/// submission, parking, and dropping. Mutating access must be serialized by
/// the caller; the facade runs one engine on one worker thread.
pub struct Reconciler {
    cache: PlayerCache,
    store: Arc<dyn CacheStore + Send + Sync>,
    service: Arc<dyn ScoreService + Send + Sync>,
    flush_on_submit: bool,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn CacheStore + Send + Sync>,
        service: Arc<dyn ScoreService + Send + Sync>,
        player_key: &str,
    ) -> Self {
        let cache = store.load(player_key);
        Self {
            cache,
            store,
            service,
            flush_on_submit: true,
        }
    }

    /// Disable the queue pass that normally runs at the start of each
    /// submit.
    pub fn with_flush_on_submit(mut self, enabled: bool) -> Self {
        self.flush_on_submit = enabled;
        self
    }

    pub fn cache(&self) -> &PlayerCache {
        &self.cache
    }

    pub fn player_key(&self) -> &str {
        &self.cache.player
    }

    pub fn pending_count(&self) -> usize {
        self.cache.pending_count()
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.cache) {
            warn!(player = %self.cache.player, %err, "failed to persist cache");
        }
    }

    fn opportunistic_flush(&mut self, link: Link) -> FlushReport {
        if !self.flush_on_submit || !link.is_online() || self.cache.pending_count() == 0 {
            return FlushReport::default();
        }
        self.flush(link)
    }

    /// Record a score and, when it improves on the cached best, deliver or
    /// park it. A value that does not improve is dropped without touching
    /// the network.
    pub fn submit_score(
        &mut self,
        link: Link,
        leaderboard: &str,
        value: i64,
        sort: SortOrder,
    ) -> SubmitOutcome {
        let flushed = self.opportunistic_flush(link);
        if !self.cache.record_score(leaderboard, value, sort) {
            debug!(leaderboard, value, "score does not beat cached best, skipping");
            return SubmitOutcome {
                submission: Submission::Skipped,
                flushed,
            };
        }
        let entry = PendingScore::new(leaderboard, value, sort, &self.cache.player);
        let submission = match link.defer_reason() {
            Some(reason) => {
                self.cache.queue_score(entry);
                debug!(leaderboard, value, %reason, "score parked");
                Submission::Deferred(reason)
            }
            None => match self.service.submit_score(&entry) {
                Ok(()) => {
                    // anything parked for this board is now subsumed
                    self.cache.clear_pending_score(leaderboard);
                    info!(leaderboard, value, "score delivered");
                    Submission::Sent
                }
                Err(err) => {
                    warn!(leaderboard, value, %err, "score submission failed, parked");
                    self.cache.queue_score(entry);
                    Submission::Deferred(DeferReason::from_error(&err))
                }
            },
        };
        self.persist();
        SubmitOutcome { submission, flushed }
    }

    /// Record achievement progress and deliver or park it. Progress never
    /// regresses: a report at or below the cached percentage is dropped.
    pub fn submit_achievement(
        &mut self,
        link: Link,
        achievement: &str,
        percent: f64,
        show_banner: bool,
    ) -> SubmitOutcome {
        let flushed = self.opportunistic_flush(link);
        let percent = clamp_percent(percent);
        if !self.cache.record_progress(achievement, percent) {
            debug!(achievement, percent, "progress does not advance, skipping");
            return SubmitOutcome {
                submission: Submission::Skipped,
                flushed,
            };
        }
        let entry = PendingAchievement::new(achievement, percent, show_banner, &self.cache.player);
        let submission = match link.defer_reason() {
            Some(reason) => {
                self.cache.queue_achievement(entry);
                debug!(achievement, percent, %reason, "progress parked");
                Submission::Deferred(reason)
            }
            None => match self.service.submit_achievement(&entry) {
                Ok(()) => {
                    self.cache.clear_pending_achievement(achievement);
                    info!(achievement, percent, "progress delivered");
                    Submission::Sent
                }
                Err(err) => {
                    warn!(achievement, percent, %err, "progress submission failed, parked");
                    self.cache.queue_achievement(entry);
                    Submission::Deferred(DeferReason::from_error(&err))
                }
            },
        };
        self.persist();
        SubmitOutcome { submission, flushed }
    }

    /// One best-effort pass over the whole queue. Each entry is attempted at
    /// most once; failures stay parked and are counted, not retried here.
    pub fn flush(&mut self, link: Link) -> FlushReport {
        let mut report = FlushReport::default();
        if self.cache.pending_count() == 0 {
            return report;
        }
        if let Some(reason) = link.defer_reason() {
            debug!(%reason, pending = self.cache.pending_count(), "flush deferred");
            report.failed = self.cache.pending_count();
            return report;
        }
        let boards: Vec<String> = self.cache.pending_scores.keys().cloned().collect();
        for board in boards {
            let Some(entry) = self.cache.pending_scores.get(&board).cloned() else {
                continue;
            };
            match self.service.submit_score(&entry) {
                Ok(()) => {
                    self.cache.clear_pending_score(&board);
                    info!(leaderboard = %board, value = entry.value, "parked score delivered");
                    report.sent_scores.push(entry);
                }
                Err(err) => {
                    warn!(leaderboard = %board, %err, "parked score still undeliverable");
                    report.failed += 1;
                }
            }
        }
        let ids: Vec<String> = self.cache.pending_achievements.keys().cloned().collect();
        for id in ids {
            let Some(entry) = self.cache.pending_achievements.get(&id).cloned() else {
                continue;
            };
            match self.service.submit_achievement(&entry) {
                Ok(()) => {
                    self.cache.clear_pending_achievement(&id);
                    info!(achievement = %id, percent = entry.percent, "parked progress delivered");
                    report.sent_achievements.push(entry);
                }
                Err(err) => {
                    warn!(achievement = %id, %err, "parked progress still undeliverable");
                    report.failed += 1;
                }
            }
        }
        if report.sent_count() > 0 {
            self.persist();
        }
        report
    }

    /// Pull the platform's view of this player, merge it under the monotonic
    /// rules, drop queue entries the merge subsumed, then flush what is
    /// left.
    pub fn sync(&mut self, link: Link) -> Result<SyncReport> {
        link.require_online()?;
        let player = self.cache.player.clone();
        let scores = self.service.fetch_player_scores(&player)?;
        let achievements = self.service.fetch_player_achievements(&player)?;

        let mut report = SyncReport::default();
        for remote in scores {
            if self
                .cache
                .record_score(&remote.leaderboard, remote.value, remote.sort)
            {
                report.merged_scores += 1;
            }
        }
        for remote in achievements {
            if self.cache.record_progress(&remote.achievement, remote.percent) {
                report.merged_achievements += 1;
            }
        }
        report.pruned = self.cache.prune_subsumed();
        self.persist();
        report.flush = self.flush(link);
        info!(
            merged_scores = report.merged_scores,
            merged_achievements = report.merged_achievements,
            pruned = report.pruned,
            flushed = report.flush.sent_count(),
            "synced with platform"
        );
        Ok(report)
    }

    pub fn challenges(&self, link: Link) -> Result<Vec<Challenge>> {
        link.require_online()?;
        self.service.fetch_challenges(&self.cache.player)
    }

    /// Full-resolution profile image for the active player, as raw bytes.
    pub fn player_photo(&self, link: Link) -> Result<Vec<u8>> {
        link.require_online()?;
        self.service.fetch_player_photo(&self.cache.player)
    }

    /// Wipe achievement progress remotely, then locally. Local state is only
    /// cleared once the platform confirms, so a failed reset loses nothing.
    pub fn reset_achievements(&mut self, link: Link) -> Result<()> {
        link.require_online()?;
        self.service.reset_achievements(&self.cache.player)?;
        self.cache.reset_achievements();
        self.persist();
        info!(player = %self.cache.player, "achievement progress reset");
        Ok(())
    }

    /// Swap the engine onto another player's cache. Saves filed under
    /// [`UNKNOWN_PLAYER`] are folded into any real player signing in and the
    /// orphan blob is dropped. Returns how many entries came across.
    pub fn switch_player(&mut self, key: &str) -> usize {
        if key == self.cache.player {
            return 0;
        }
        self.persist();
        let mut next = self.store.load(key);
        let mut adopted = 0;
        if key != UNKNOWN_PLAYER {
            let orphan = self.store.load(UNKNOWN_PLAYER);
            if !orphan.is_empty() {
                adopted = next.adopt(orphan);
                if let Err(err) = self.store.remove(UNKNOWN_PLAYER) {
                    warn!(%err, "failed to drop orphan cache after adoption");
                }
            }
        }
        self.cache = next;
        if adopted > 0 {
            self.persist();
        }
        info!(player = key, adopted, "switched active player");
        adopted
    }
}
