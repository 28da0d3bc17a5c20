use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Ranking direction of a leaderboard, as configured on the platform side.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    EnumString,
    IntoStaticStr,
    Display,
)]
pub enum SortOrder {
    /// Higher values rank better (points, distance).
    #[default]
    #[strum(serialize = "high-to-low")]
    HighToLow,
    /// Lower values rank better (lap times, golf strokes).
    #[strum(serialize = "low-to-high")]
    LowToHigh,
}

impl SortOrder {
    /// Whether `new` is a strictly better score than `old` under this order.
    pub fn is_improvement(&self, new: i64, old: i64) -> bool {
        match self {
            SortOrder::HighToLow => new > old,
            SortOrder::LowToHigh => new < old,
        }
    }

    pub fn short_name(&self) -> &'static str {
        self.into()
    }
}

/// Best value seen for a leaderboard, together with the order it ranks
/// under. The order is kept so later merges compare the same way the value
/// was filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestScore {
    pub value: i64,
    pub sort: SortOrder,
}

impl BestScore {
    pub fn new(value: i64, sort: SortOrder) -> Self {
        Self { value, sort }
    }
}

/// A score save that has not yet been confirmed by the remote platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingScore {
    pub leaderboard: String,
    pub value: i64,
    pub sort: SortOrder,
    pub player: String,
    pub recorded_at: DateTime<Utc>,
}

impl PendingScore {
    pub fn new(leaderboard: &str, value: i64, sort: SortOrder, player: &str) -> Self {
        Self {
            leaderboard: leaderboard.to_string(),
            value,
            sort,
            player: player.to_string(),
            recorded_at: Utc::now(),
        }
    }

    /// Whether this entry would replace `other` in the queue.
    pub fn beats(&self, other: &PendingScore) -> bool {
        self.sort.is_improvement(self.value, other.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_improvement_high_to_low() {
        assert!(SortOrder::HighToLow.is_improvement(100, 50));
        assert!(!SortOrder::HighToLow.is_improvement(50, 100));
        assert!(!SortOrder::HighToLow.is_improvement(100, 100));
    }

    #[test]
    fn test_improvement_low_to_high() {
        assert!(SortOrder::LowToHigh.is_improvement(50, 100));
        assert!(!SortOrder::LowToHigh.is_improvement(100, 50));
        assert!(!SortOrder::LowToHigh.is_improvement(50, 50));
    }

    #[test]
    fn test_sort_order_round_trips_as_string() {
        assert_eq!(SortOrder::HighToLow.short_name(), "high-to-low");
        assert_eq!(
            SortOrder::from_str("low-to-high").unwrap(),
            SortOrder::LowToHigh
        );
    }

    #[test]
    fn test_pending_score_beats() {
        let best = PendingScore::new("board1", 4528, SortOrder::HighToLow, "p1");
        let worse = PendingScore::new("board1", 1200, SortOrder::HighToLow, "p1");
        assert!(best.beats(&worse));
        assert!(!worse.beats(&best));

        let fast = PendingScore::new("laps", 58, SortOrder::LowToHigh, "p1");
        let slow = PendingScore::new("laps", 74, SortOrder::LowToHigh, "p1");
        assert!(fast.beats(&slow));
        assert!(!slow.beats(&fast));
    }
}
