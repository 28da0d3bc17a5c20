use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion mark for an achievement.
pub const COMPLETE_PERCENT: f64 = 100.0;

/// Clamp a reported completion percentage into the `0.0..=100.0` range.
/// NaN counts as no progress.
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, COMPLETE_PERCENT)
}

/// An achievement progress report that has not yet been confirmed by the
/// remote platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAchievement {
    pub achievement: String,
    pub percent: f64,
    /// Show the platform's completion banner when the report lands.
    pub show_banner: bool,
    pub player: String,
    pub recorded_at: DateTime<Utc>,
}

impl PendingAchievement {
    pub fn new(achievement: &str, percent: f64, show_banner: bool, player: &str) -> Self {
        Self {
            achievement: achievement.to_string(),
            percent: clamp_percent(percent),
            show_banner,
            player: player.to_string(),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= COMPLETE_PERCENT
    }
}
