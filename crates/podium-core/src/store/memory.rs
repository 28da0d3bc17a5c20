use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::cache::PlayerCache;
use crate::error::Result;
use crate::store::CacheStore;

/// Store that keeps caches in memory only. Useful for tests and for callers
/// who opt out of persistence.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, PlayerCache>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, PlayerCache>> {
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> PlayerCache {
        self.entries()
            .get(key)
            .cloned()
            .unwrap_or_else(|| PlayerCache::new(key))
    }

    fn save(&self, cache: &PlayerCache) -> Result<()> {
        self.entries()
            .insert(cache.player.clone(), cache.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::SortOrder;

    #[test]
    fn test_memory_store_round_trips() {
        let store = MemoryStore::new();
        let mut cache = PlayerCache::new("p1");
        cache.record_score("points", 10, SortOrder::HighToLow);

        store.save(&cache).unwrap();
        assert_eq!(store.load("p1"), cache);

        store.remove("p1").unwrap();
        assert!(store.load("p1").high_scores.is_empty());
    }
}
