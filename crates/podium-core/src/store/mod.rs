//! Persistence for per-player caches.
//!
//! Stores are deliberately forgiving on the read side: a missing or
//! unreadable blob comes back as an empty [`PlayerCache`] so queued work is
//! the only thing ever lost, never the ability to keep playing. Writes
//! surface their errors normally.

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use crate::cache::PlayerCache;
use crate::error::Result;

/// Backing storage for player caches, keyed by sanitized player id.
pub trait CacheStore {
    /// Load the cache for `key`, or an empty one when nothing readable is
    /// stored under it.
    fn load(&self, key: &str) -> PlayerCache;

    fn save(&self, cache: &PlayerCache) -> Result<()>;

    /// Drop the blob for `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Hook for scrambling cache blobs at rest. The store serializes, then hands
/// the bytes here; callers who want real encryption plug their own
/// implementation in.
pub trait StoreCipher {
    fn seal(&self, plain: Vec<u8>) -> Vec<u8>;

    /// Undo [`StoreCipher::seal`]. Failures are treated as corrupt state by
    /// the store.
    fn open(&self, sealed: Vec<u8>) -> Result<Vec<u8>>;
}

/// Identity cipher, the default: blobs land on disk as plain JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCipher;

impl StoreCipher for PlainCipher {
    fn seal(&self, plain: Vec<u8>) -> Vec<u8> {
        plain
    }

    fn open(&self, sealed: Vec<u8>) -> Result<Vec<u8>> {
        Ok(sealed)
    }
}
