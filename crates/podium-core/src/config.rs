use std::path::PathBuf;
use std::sync::Arc;

use crate::player::{AuthProvider, Player, StaticAuth};
use crate::service::{AlwaysOnline, Connectivity, OfflineService, ScoreService};
use crate::store::{CacheStore, JsonStore, MemoryStore};

/// Wiring for a [`Manager`](crate::Manager). The default configuration is
/// fully self-contained: in-memory state, no remote endpoint, capability
/// present but nobody signed in.
pub struct ManagerConfig {
    pub store: Arc<dyn CacheStore + Send + Sync>,
    pub service: Arc<dyn ScoreService + Send + Sync>,
    pub auth: Arc<dyn AuthProvider + Send + Sync>,
    pub connectivity: Arc<dyn Connectivity + Send + Sync>,
    /// Run a queue pass at the start of every submit.
    pub flush_on_submit: bool,
    /// Run a full sync whenever an availability change lands us online.
    pub sync_on_reconnect: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            service: Arc::new(OfflineService),
            auth: Arc::new(StaticAuth::signed_out()),
            connectivity: Arc::new(AlwaysOnline),
            flush_on_submit: true,
            sync_on_reconnect: true,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn CacheStore + Send + Sync>) -> Self {
        self.store = store;
        self
    }

    /// Persist caches as JSON files under `dir`.
    pub fn with_data_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_store(Arc::new(JsonStore::new(dir)))
    }

    pub fn with_service(mut self, service: Arc<dyn ScoreService + Send + Sync>) -> Self {
        self.service = service;
        self
    }

    /// Submit through the REST endpoint at `endpoint`, optionally with a
    /// bearer token.
    #[cfg(feature = "api")]
    pub fn with_endpoint(self, endpoint: &str, token: Option<&str>) -> Self {
        self.with_service(Arc::new(crate::service::HttpScoreService::new(
            endpoint, token,
        )))
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider + Send + Sync>) -> Self {
        self.auth = auth;
        self
    }

    /// Fixed signed-in identity, e.g. from CLI flags.
    pub fn with_player(self, player: Player) -> Self {
        self.with_auth(Arc::new(StaticAuth::authenticated(player)))
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity + Send + Sync>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_flush_on_submit(mut self, enabled: bool) -> Self {
        self.flush_on_submit = enabled;
        self
    }

    pub fn with_sync_on_reconnect(mut self, enabled: bool) -> Self {
        self.sync_on_reconnect = enabled;
        self
    }
}
