use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

/// Lifecycle state of a player-to-player challenge.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    Display,
    EnumString,
    FromRepr,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum ChallengeState {
    #[default]
    #[strum(serialize = "pending")]
    Pending = 0,
    #[strum(serialize = "completed")]
    Completed = 1,
    #[strum(serialize = "declined")]
    Declined = 2,
}

/// A challenge issued to the local player, as reported by the remote
/// platform. Challenges are read-only here; they are never queued locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub state: ChallengeState,
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_challenge_state_from_repr() {
        assert_eq!(ChallengeState::from_repr(0), Some(ChallengeState::Pending));
        assert_eq!(
            ChallengeState::from_repr(2),
            Some(ChallengeState::Declined)
        );
        assert_eq!(ChallengeState::from_repr(9), None);
    }

    #[test]
    fn test_challenge_state_strings() {
        assert_eq!(ChallengeState::Completed.to_string(), "completed");
        assert_eq!(
            ChallengeState::from_str("pending").unwrap(),
            ChallengeState::Pending
        );
    }
}
