use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Cache key used for state recorded before any player has signed in.
/// Entries filed under this key are adopted by the next authenticated player.
pub const UNKNOWN_PLAYER: &str = "unknownPlayer";

/// Identity of the locally signed-in player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Player {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
        }
    }

    pub fn with_display_name(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: Some(display_name.to_string()),
        }
    }

    /// Name to show in logs and UIs.
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn cache_key(&self) -> String {
        cache_key(Some(&self.id))
    }
}

/// Derive the on-disk cache key for a player identifier. A missing or empty
/// identifier files state under [`UNKNOWN_PLAYER`]. Keys double as file
/// names, so anything path-hostile is flattened to `_`.
pub fn cache_key(player_id: Option<&str>) -> String {
    match player_id {
        Some(id) if !id.is_empty() => sanitize(id),
        _ => UNKNOWN_PLAYER.to_string(),
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Answers the two questions asked before any remote attempt: does this
/// device have the game-services capability at all, and who is signed in
/// right now.
pub trait AuthProvider {
    fn capability_available(&self) -> bool;

    fn current_player(&self) -> Option<Player>;
}

/// Identity fixed at construction time, e.g. from CLI flags.
#[derive(Debug, Clone)]
pub struct StaticAuth {
    capability: bool,
    player: Option<Player>,
}

impl StaticAuth {
    pub fn authenticated(player: Player) -> Self {
        Self {
            capability: true,
            player: Some(player),
        }
    }

    /// Capability present, nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            capability: true,
            player: None,
        }
    }

    /// Game services missing from the device entirely.
    pub fn unavailable() -> Self {
        Self {
            capability: false,
            player: None,
        }
    }
}

impl AuthProvider for StaticAuth {
    fn capability_available(&self) -> bool {
        self.capability
    }

    fn current_player(&self) -> Option<Player> {
        self.player.clone()
    }
}

/// Identity that can change at runtime, for apps that observe the platform's
/// sign-in lifecycle and for tests that script it.
#[derive(Debug, Default)]
pub struct ToggleAuth {
    capability_gone: AtomicBool,
    player: Mutex<Option<Player>>,
}

impl ToggleAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_player(&self, player: Option<Player>) {
        *self.player.lock().unwrap_or_else(|err| err.into_inner()) = player;
    }

    pub fn set_capability(&self, available: bool) {
        self.capability_gone.store(!available, Ordering::SeqCst);
    }
}

impl AuthProvider for ToggleAuth {
    fn capability_available(&self) -> bool {
        !self.capability_gone.load(Ordering::SeqCst)
    }

    fn current_player(&self) -> Option<Player> {
        self.player
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}
