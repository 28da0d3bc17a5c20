//! The facade application code talks to.
//!
//! A manager owns one worker thread running a [`Reconciler`], so every
//! mutation is serialized. Submits and flushes are fire-and-forget from the
//! caller's side: each returns a receiver that yields the outcome once the
//! worker gets there, and typed [`Event`]s fan out to subscribers as work
//! completes. Reads never touch the worker or the network; they go straight
//! to the store, which the engine keeps current after every mutation.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::cache::PlayerCache;
use crate::challenge::Challenge;
use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::event::{ChannelSink, Event, EventSink, Sinks};
use crate::player::{cache_key, AuthProvider, Player};
use crate::reconcile::{FlushReport, Link, Reconciler, Submission, SyncReport};
use crate::score::SortOrder;
use crate::service::{Connectivity, ScoreService};
use crate::store::CacheStore;

enum Job {
    Score {
        leaderboard: String,
        value: i64,
        sort: SortOrder,
        done: mpsc::Sender<Submission>,
    },
    Achievement {
        achievement: String,
        percent: f64,
        show_banner: bool,
        done: mpsc::Sender<Submission>,
    },
    Flush {
        done: mpsc::Sender<FlushReport>,
    },
    Sync {
        done: mpsc::Sender<Result<SyncReport>>,
    },
    Challenges {
        done: mpsc::Sender<Result<Vec<Challenge>>>,
    },
    Photo {
        done: mpsc::Sender<Result<Vec<u8>>>,
    },
    ResetAchievements {
        done: mpsc::Sender<Result<()>>,
    },
    LinkChanged,
    Shutdown,
}

struct Shared {
    store: Arc<dyn CacheStore + Send + Sync>,
    auth: Arc<dyn AuthProvider + Send + Sync>,
    connectivity: Arc<dyn Connectivity + Send + Sync>,
    sinks: Sinks,
}

impl Shared {
    /// One consistent read of the gate order: capability, identity,
    /// reachability.
    fn snapshot(&self) -> (Link, String) {
        let player = self.auth.current_player();
        let key = cache_key(player.as_ref().map(|p| p.id.as_str()));
        let link = if !self.auth.capability_available() {
            Link::Unavailable
        } else if player.is_none() {
            Link::Unauthenticated
        } else if !self.connectivity.is_online() {
            Link::Offline
        } else {
            Link::Online
        };
        (link, key)
    }
}

pub struct Manager {
    jobs: mpsc::Sender<Job>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl Manager {
    pub fn new(config: ManagerConfig) -> Self {
        let shared = Arc::new(Shared {
            store: config.store,
            auth: config.auth,
            connectivity: config.connectivity,
            sinks: Sinks::new(),
        });
        let (jobs, job_rx) = mpsc::channel();
        let worker = {
            let shared = shared.clone();
            let service = config.service;
            let flush_on_submit = config.flush_on_submit;
            let sync_on_reconnect = config.sync_on_reconnect;
            thread::spawn(move || {
                worker_loop(job_rx, shared, service, flush_on_submit, sync_on_reconnect)
            })
        };
        Self {
            jobs,
            worker: Some(worker),
            shared,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ManagerConfig::default())
    }

    fn enqueue(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            warn!("manager is shut down, dropping request");
        }
    }

    /// Queue a score save. The receiver yields what happened to it; dropping
    /// the receiver is fine, the save goes through either way.
    pub fn submit_score(
        &self,
        leaderboard: &str,
        value: i64,
        sort: SortOrder,
    ) -> mpsc::Receiver<Submission> {
        let (done, rx) = mpsc::channel();
        self.enqueue(Job::Score {
            leaderboard: leaderboard.to_string(),
            value,
            sort,
            done,
        });
        rx
    }

    /// Queue an achievement progress report.
    pub fn submit_achievement(
        &self,
        achievement: &str,
        percent: f64,
        show_banner: bool,
    ) -> mpsc::Receiver<Submission> {
        let (done, rx) = mpsc::channel();
        self.enqueue(Job::Achievement {
            achievement: achievement.to_string(),
            percent,
            show_banner,
            done,
        });
        rx
    }

    /// Ask for one pass over the pending queue.
    pub fn flush(&self) -> mpsc::Receiver<FlushReport> {
        let (done, rx) = mpsc::channel();
        self.enqueue(Job::Flush { done });
        rx
    }

    /// Ask for a full reconcile: pull remote state, merge, flush.
    pub fn sync(&self) -> mpsc::Receiver<Result<SyncReport>> {
        let (done, rx) = mpsc::channel();
        self.enqueue(Job::Sync { done });
        rx
    }

    pub fn challenges(&self) -> mpsc::Receiver<Result<Vec<Challenge>>> {
        let (done, rx) = mpsc::channel();
        self.enqueue(Job::Challenges { done });
        rx
    }

    /// Fetch the signed-in player's profile picture as raw image bytes.
    pub fn player_photo(&self) -> mpsc::Receiver<Result<Vec<u8>>> {
        let (done, rx) = mpsc::channel();
        self.enqueue(Job::Photo { done });
        rx
    }

    pub fn reset_achievements(&self) -> mpsc::Receiver<Result<()>> {
        let (done, rx) = mpsc::channel();
        self.enqueue(Job::ResetAchievements { done });
        rx
    }

    /// Tell the manager the sign-in state may have changed. Orphaned saves
    /// are adopted and, when this lands us online, the queue is replayed.
    pub fn authentication_changed(&self) {
        self.enqueue(Job::LinkChanged);
    }

    /// Tell the manager reachability may have changed.
    pub fn connectivity_changed(&self) {
        self.enqueue(Job::LinkChanged);
    }

    pub fn link(&self) -> Link {
        self.shared.snapshot().0
    }

    pub fn player_key(&self) -> String {
        self.shared.snapshot().1
    }

    /// The signed-in identity, if there is one.
    pub fn player(&self) -> Option<Player> {
        self.shared.auth.current_player()
    }

    /// Best locally known value for a leaderboard, `0` when none. Never
    /// touches the network.
    pub fn high_score(&self, leaderboard: &str) -> i64 {
        self.active_cache().best_score(leaderboard).unwrap_or(0)
    }

    pub fn high_scores(&self) -> BTreeMap<String, i64> {
        self.active_cache()
            .high_scores
            .iter()
            .map(|(board, best)| (board.clone(), best.value))
            .collect()
    }

    /// Locally known achievement progress, `0.0` when none.
    pub fn progress(&self, achievement: &str) -> f64 {
        self.active_cache().progress(achievement)
    }

    pub fn progresses(&self) -> BTreeMap<String, f64> {
        self.active_cache().progress.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.active_cache().pending_count()
    }

    fn active_cache(&self) -> PlayerCache {
        self.shared.store.load(&self.shared.snapshot().1)
    }

    /// Subscribe a channel to every future event.
    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.shared.sinks.add(Box::new(ChannelSink::new(tx)));
        rx
    }

    pub fn add_sink(&self, sink: Box<dyn EventSink>) {
        self.shared.sinks.add(sink);
    }

    /// Stop the worker after it drains what is already queued. Called on
    /// drop as well; safe to call twice.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.jobs.send(Job::Shutdown);
            let _ = worker.join();
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    jobs: mpsc::Receiver<Job>,
    shared: Arc<Shared>,
    service: Arc<dyn ScoreService + Send + Sync>,
    flush_on_submit: bool,
    sync_on_reconnect: bool,
) {
    let initial_key = shared.snapshot().1;
    let mut engine = Reconciler::new(shared.store.clone(), service, &initial_key)
        .with_flush_on_submit(flush_on_submit);

    while let Ok(job) = jobs.recv() {
        let (link, key) = shared.snapshot();
        if key != engine.player_key() {
            engine.switch_player(&key);
        }
        match job {
            Job::Score {
                leaderboard,
                value,
                sort,
                done,
            } => {
                let outcome = engine.submit_score(link, &leaderboard, value, sort);
                publish_delivered(&shared, &outcome.flushed);
                if outcome.submission.is_deferred() {
                    if let Some(entry) = engine.cache().pending_scores.get(&leaderboard) {
                        shared.sinks.broadcast(Event::ScoreQueued {
                            entry: entry.clone(),
                        });
                    }
                }
                shared.sinks.broadcast(Event::ScoreReported {
                    leaderboard,
                    value,
                    submission: outcome.submission.clone(),
                });
                let _ = done.send(outcome.submission);
            }
            Job::Achievement {
                achievement,
                percent,
                show_banner,
                done,
            } => {
                let outcome = engine.submit_achievement(link, &achievement, percent, show_banner);
                publish_delivered(&shared, &outcome.flushed);
                if outcome.submission.is_deferred() {
                    if let Some(entry) = engine.cache().pending_achievements.get(&achievement) {
                        shared.sinks.broadcast(Event::AchievementQueued {
                            entry: entry.clone(),
                        });
                    }
                }
                shared.sinks.broadcast(Event::AchievementReported {
                    achievement,
                    percent,
                    submission: outcome.submission.clone(),
                });
                let _ = done.send(outcome.submission);
            }
            Job::Flush { done } => {
                let report = engine.flush(link);
                publish_delivered(&shared, &report);
                let _ = done.send(report);
            }
            Job::Sync { done } => {
                let result = engine.sync(link);
                match &result {
                    Ok(report) => publish_synced(&shared, report),
                    Err(err) => notify_failure(&shared, "sync", err),
                }
                let _ = done.send(result);
            }
            Job::Challenges { done } => {
                let result = engine.challenges(link);
                if let Err(err) = &result {
                    notify_failure(&shared, "challenges", err);
                }
                let _ = done.send(result);
            }
            Job::Photo { done } => {
                let result = engine.player_photo(link);
                if let Err(err) = &result {
                    notify_failure(&shared, "photo", err);
                }
                let _ = done.send(result);
            }
            Job::ResetAchievements { done } => {
                let result = engine.reset_achievements(link);
                if let Err(err) = &result {
                    notify_failure(&shared, "reset", err);
                }
                let _ = done.send(result);
            }
            Job::LinkChanged => {
                shared
                    .sinks
                    .broadcast(Event::AvailabilityChanged { link });
                if !link.is_online() {
                    continue;
                }
                if sync_on_reconnect {
                    match engine.sync(link) {
                        Ok(report) => publish_synced(&shared, &report),
                        Err(err) => notify_failure(&shared, "sync", &err),
                    }
                } else {
                    let report = engine.flush(link);
                    publish_delivered(&shared, &report);
                }
            }
            Job::Shutdown => break,
        }
    }
    debug!("manager worker stopped");
}

/// Re-announce each parked entry a flush managed to deliver.
fn publish_delivered(shared: &Shared, report: &FlushReport) {
    for entry in &report.sent_scores {
        shared.sinks.broadcast(Event::ScoreReported {
            leaderboard: entry.leaderboard.clone(),
            value: entry.value,
            submission: Submission::Sent,
        });
    }
    for entry in &report.sent_achievements {
        shared.sinks.broadcast(Event::AchievementReported {
            achievement: entry.achievement.clone(),
            percent: entry.percent,
            submission: Submission::Sent,
        });
    }
}

fn publish_synced(shared: &Shared, report: &SyncReport) {
    publish_delivered(shared, &report.flush);
    shared.sinks.broadcast(Event::Synced {
        merged: report.merged_scores + report.merged_achievements,
        flushed: report.flush.sent_count(),
    });
}

fn notify_failure(shared: &Shared, context: &'static str, err: &Error) {
    if err.is_deferrable() {
        debug!(context, %err, "background operation deferred");
    } else {
        warn!(context, %err, "background operation failed");
    }
    shared.sinks.broadcast(Event::Error {
        context,
        message: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::achievement::PendingAchievement;
    use crate::player::ToggleAuth;
    use crate::reconcile::DeferReason;
    use crate::score::PendingScore;
    use crate::service::{RemoteProgress, RemoteScore, ToggleConnectivity};

    const WAIT: Duration = Duration::from_secs(5);

    /// Service that accepts everything and has nothing to report back.
    struct OkService;

    impl ScoreService for OkService {
        fn submit_score(&self, _entry: &PendingScore) -> Result<()> {
            Ok(())
        }

        fn submit_achievement(&self, _entry: &PendingAchievement) -> Result<()> {
            Ok(())
        }

        fn fetch_player_scores(&self, _player: &str) -> Result<Vec<RemoteScore>> {
            Ok(Vec::new())
        }

        fn fetch_player_achievements(&self, _player: &str) -> Result<Vec<RemoteProgress>> {
            Ok(Vec::new())
        }

        fn fetch_challenges(&self, _player: &str) -> Result<Vec<Challenge>> {
            Ok(Vec::new())
        }

        fn fetch_player_photo(&self, _player: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn reset_achievements(&self, _player: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Accepts everything like [`OkService`] but remembers the scores it was
    /// handed; fetches can be told to fail.
    #[derive(Default)]
    struct RecordingService {
        scores: Mutex<Vec<PendingScore>>,
        fail_fetches: bool,
    }

    impl ScoreService for RecordingService {
        fn submit_score(&self, entry: &PendingScore) -> Result<()> {
            self.scores.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn submit_achievement(&self, _entry: &PendingAchievement) -> Result<()> {
            Ok(())
        }

        fn fetch_player_scores(&self, _player: &str) -> Result<Vec<RemoteScore>> {
            if self.fail_fetches {
                return Err(Error::Rejected("fetch refused".into()));
            }
            Ok(Vec::new())
        }

        fn fetch_player_achievements(&self, _player: &str) -> Result<Vec<RemoteProgress>> {
            if self.fail_fetches {
                return Err(Error::Rejected("fetch refused".into()));
            }
            Ok(Vec::new())
        }

        fn fetch_challenges(&self, _player: &str) -> Result<Vec<Challenge>> {
            Ok(Vec::new())
        }

        fn fetch_player_photo(&self, _player: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn reset_achievements(&self, _player: &str) -> Result<()> {
            Ok(())
        }
    }

    fn online_manager() -> Manager {
        Manager::new(
            ManagerConfig::new()
                .with_player(Player::new("p1"))
                .with_service(Arc::new(OkService)),
        )
    }

    #[test]
    fn test_submit_score_round_trip() {
        let manager = online_manager();
        let submission = manager
            .submit_score("points", 120, SortOrder::HighToLow)
            .recv_timeout(WAIT)
            .unwrap();
        assert!(submission.is_sent());
        assert_eq!(manager.high_score("points"), 120);
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(manager.player().map(|p| p.id), Some("p1".to_string()));
    }

    #[test]
    fn test_reads_default_to_zero() {
        let manager = online_manager();
        assert_eq!(manager.high_score("nothing"), 0);
        assert_eq!(manager.progress("nothing"), 0.0);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_offline_submit_parks_then_flush_delivers() {
        let connectivity = Arc::new(ToggleConnectivity::new(false));
        let manager = Manager::new(
            ManagerConfig::new()
                .with_player(Player::new("p1"))
                .with_service(Arc::new(OkService))
                .with_connectivity(connectivity.clone())
                .with_sync_on_reconnect(false),
        );

        let submission = manager
            .submit_score("points", 200, SortOrder::HighToLow)
            .recv_timeout(WAIT)
            .unwrap();
        assert_eq!(submission, Submission::Deferred(DeferReason::Offline));
        assert_eq!(manager.pending_count(), 1);
        assert_eq!(manager.high_score("points"), 200);

        connectivity.set_online(true);
        let report = manager.flush().recv_timeout(WAIT).unwrap();
        assert_eq!(report.sent_scores.len(), 1);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_unauthenticated_saves_adopted_on_sign_in() {
        let auth = Arc::new(ToggleAuth::new());
        let manager = Manager::new(
            ManagerConfig::new()
                .with_auth(auth.clone())
                .with_service(Arc::new(OkService))
                .with_sync_on_reconnect(false),
        );

        let submission = manager
            .submit_score("points", 90, SortOrder::HighToLow)
            .recv_timeout(WAIT)
            .unwrap();
        assert_eq!(
            submission,
            Submission::Deferred(DeferReason::Unauthenticated)
        );
        assert_eq!(manager.pending_count(), 1);

        // No explicit notification: the next job notices the sign-in,
        // rebinds, and the adopted entry goes out under the new identity.
        auth.set_player(Some(Player::new("p1")));
        let report = manager.flush().recv_timeout(WAIT).unwrap();
        assert_eq!(report.sent_scores.len(), 1);
        assert_eq!(report.sent_scores[0].player, "p1");
        assert_eq!(manager.player_key(), "p1");
        assert_eq!(manager.high_score("points"), 90);
    }

    #[test]
    fn test_reconnect_replays_queue_automatically() {
        let connectivity = Arc::new(ToggleConnectivity::new(false));
        let manager = Manager::new(
            ManagerConfig::new()
                .with_player(Player::new("p1"))
                .with_service(Arc::new(OkService))
                .with_connectivity(connectivity.clone())
                .with_sync_on_reconnect(false),
        );
        let events = manager.subscribe();

        manager
            .submit_score("points", 70, SortOrder::HighToLow)
            .recv_timeout(WAIT)
            .unwrap();
        connectivity.set_online(true);
        manager.connectivity_changed();

        // Queued, Reported(Deferred), AvailabilityChanged, then the replay.
        let mut delivered = false;
        for _ in 0..4 {
            match events.recv_timeout(WAIT) {
                Ok(Event::ScoreReported {
                    submission: Submission::Sent,
                    value,
                    ..
                }) => {
                    assert_eq!(value, 70);
                    delivered = true;
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        assert!(delivered);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_reconnect_sync_delivers_parked_entries() {
        let connectivity = Arc::new(ToggleConnectivity::new(false));
        let service = Arc::new(RecordingService::default());
        // sync_on_reconnect is left at its default here: the availability
        // change alone must carry the parked score out.
        let manager = Manager::new(
            ManagerConfig::new()
                .with_player(Player::new("p1"))
                .with_service(service.clone())
                .with_connectivity(connectivity.clone()),
        );
        let events = manager.subscribe();

        manager
            .submit_score("points", 160, SortOrder::HighToLow)
            .recv_timeout(WAIT)
            .unwrap();
        assert_eq!(manager.pending_count(), 1);

        connectivity.set_online(true);
        manager.connectivity_changed();

        let mut synced = false;
        for _ in 0..5 {
            match events.recv_timeout(WAIT) {
                Ok(Event::Synced { flushed, .. }) => {
                    assert_eq!(flushed, 1);
                    synced = true;
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        assert!(synced);
        assert_eq!(manager.pending_count(), 0);
        let delivered = service.scores.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].value, 160);
        assert_eq!(delivered[0].player, "p1");
    }

    #[test]
    fn test_reconnect_sync_failure_reaches_subscribers() {
        let connectivity = Arc::new(ToggleConnectivity::new(false));
        let service = Arc::new(RecordingService {
            fail_fetches: true,
            ..RecordingService::default()
        });
        let manager = Manager::new(
            ManagerConfig::new()
                .with_player(Player::new("p1"))
                .with_service(service)
                .with_connectivity(connectivity.clone()),
        );
        let events = manager.subscribe();

        connectivity.set_online(true);
        manager.connectivity_changed();

        let mut failed = false;
        for _ in 0..2 {
            if let Ok(Event::Error { context, .. }) = events.recv_timeout(WAIT) {
                assert_eq!(context, "sync");
                failed = true;
                break;
            }
        }
        assert!(failed);
    }

    #[test]
    fn test_link_change_emits_availability_event() {
        let manager = Manager::new(
            ManagerConfig::new()
                .with_service(Arc::new(OkService))
                .with_sync_on_reconnect(false),
        );
        let events = manager.subscribe();

        manager.connectivity_changed();
        let event = events.recv_timeout(WAIT).unwrap();
        assert!(matches!(
            event,
            Event::AvailabilityChanged {
                link: Link::Unauthenticated
            }
        ));
    }

    #[test]
    fn test_flush_events_reach_subscribers() {
        let connectivity = Arc::new(ToggleConnectivity::new(false));
        let manager = Manager::new(
            ManagerConfig::new()
                .with_player(Player::new("p1"))
                .with_service(Arc::new(OkService))
                .with_connectivity(connectivity.clone())
                .with_sync_on_reconnect(false),
        );
        let events = manager.subscribe();

        manager
            .submit_score("points", 50, SortOrder::HighToLow)
            .recv_timeout(WAIT)
            .unwrap();
        connectivity.set_online(true);
        manager.flush().recv_timeout(WAIT).unwrap();

        let mut saw_queued = false;
        let mut saw_delivered = false;
        while let Ok(event) = events.try_recv() {
            match event {
                Event::ScoreQueued { entry } => {
                    assert_eq!(entry.value, 50);
                    saw_queued = true;
                }
                Event::ScoreReported {
                    submission: Submission::Sent,
                    value,
                    ..
                } => {
                    assert_eq!(value, 50);
                    saw_delivered = true;
                }
                _ => {}
            }
        }
        assert!(saw_queued);
        assert!(saw_delivered);
    }

    #[test]
    fn test_challenges_round_trip() {
        let manager = online_manager();
        let challenges = manager.challenges().recv_timeout(WAIT).unwrap().unwrap();
        assert!(challenges.is_empty());
    }

    #[test]
    fn test_player_photo_round_trip() {
        let manager = online_manager();
        let photo = manager.player_photo().recv_timeout(WAIT).unwrap().unwrap();
        assert!(photo.is_empty());
    }

    #[test]
    fn test_sync_reports_merges() {
        let manager = online_manager();
        let report = manager.sync().recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(report.merged_scores, 0);
        assert!(report.flush.is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent_and_inert_after() {
        let mut manager = online_manager();
        manager.shutdown();
        manager.shutdown();

        let rx = manager.submit_score("points", 10, SortOrder::HighToLow);
        assert!(rx.recv().is_err());
    }
}
