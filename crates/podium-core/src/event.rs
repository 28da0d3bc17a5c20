//! Typed notifications fanned out as background work completes.
//!
//! Callers either subscribe a channel and drain it at their own pace, or
//! register a sink that runs inline on the worker. A sink that reports
//! itself dead is dropped from the registry on the next broadcast.

use std::sync::mpsc;
use std::sync::Mutex;

use crate::achievement::PendingAchievement;
use crate::reconcile::{Link, Submission};
use crate::score::PendingScore;

#[derive(Debug, Clone)]
pub enum Event {
    /// Capability, sign-in, or reachability changed.
    AvailabilityChanged { link: Link },
    /// A score report finished, one way or another. Fired for direct
    /// submits and again for each parked entry a flush delivers.
    ScoreReported {
        leaderboard: String,
        value: i64,
        submission: Submission,
    },
    /// An achievement report finished.
    AchievementReported {
        achievement: String,
        percent: f64,
        submission: Submission,
    },
    /// A score was saved locally for a later flush.
    ScoreQueued { entry: PendingScore },
    /// An achievement report was saved locally for a later flush.
    AchievementQueued { entry: PendingAchievement },
    /// A full reconcile against the platform finished.
    Synced { merged: usize, flushed: usize },
    /// A background operation failed outside the submit path.
    Error {
        context: &'static str,
        message: String,
    },
}

pub trait EventSink: Send {
    /// Deliver one event. Return `false` to be dropped from the registry.
    fn publish(&self, event: &Event) -> bool;
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send,
{
    fn publish(&self, event: &Event) -> bool {
        self(event);
        true
    }
}

/// Sink that forwards every event into an mpsc channel. Dies with its
/// receiver.
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &Event) -> bool {
        self.tx.send(event.clone()).is_ok()
    }
}

/// Registry of live sinks.
#[derive(Default)]
pub struct Sinks {
    inner: Mutex<Vec<Box<dyn EventSink>>>,
}

impl Sinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sink: Box<dyn EventSink>) {
        self.inner
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(sink);
    }

    pub fn broadcast(&self, event: Event) {
        self.inner
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .retain(|sink| sink.publish(&event));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|err| err.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
