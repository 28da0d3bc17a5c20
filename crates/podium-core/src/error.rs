use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no authenticated player")]
    Unauthenticated,

    #[error("game services are not available on this device")]
    Unavailable,

    #[error("network connection is offline")]
    Offline,

    #[error("remote submission rejected: {0}")]
    Rejected(String),

    #[error("stored state is unreadable: {0}")]
    StorageCorrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check whether a failed submission should be parked in the pending
    /// queue instead of being dropped. Everything that can clear up later
    /// (login, reachability, server recovery) qualifies.
    pub fn is_deferrable(&self) -> bool {
        matches!(
            self,
            Error::Unauthenticated | Error::Unavailable | Error::Offline | Error::Rejected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gating_errors_are_deferrable() {
        assert!(Error::Unauthenticated.is_deferrable());
        assert!(Error::Unavailable.is_deferrable());
        assert!(Error::Offline.is_deferrable());
        assert!(Error::Rejected("503".into()).is_deferrable());
    }

    #[test]
    fn test_local_errors_are_not_deferrable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!Error::Io(io).is_deferrable());
        assert!(!Error::StorageCorrupt("bad header".into()).is_deferrable());
    }
}
