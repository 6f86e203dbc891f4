//! Mute lookup caching seam.
//!
//! Mute checks run on the chat hot path, so the store consults a cache
//! before touching storage. The cache is an external collaborator: the
//! engine only defines the contract and offers results back after a miss.

use crate::punishment::{NetworkAddress, Punishment};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// A cache over "the applicable mute for this identity, if any".
///
/// `get` distinguishes a miss (`None`) from a cached absence
/// (`Some(None)`): knowing a player is unmuted is as valuable as knowing
/// they are muted.
pub trait MuteCache {
    fn get(&self, uuid: Uuid, address: NetworkAddress) -> Option<Option<Punishment>>;

    fn put(&self, uuid: Uuid, address: NetworkAddress, mute: Option<Punishment>);

    /// Drop whatever is cached for this identity, e.g. after a new mute or
    /// a revocation.
    fn invalidate(&self, uuid: Uuid, address: NetworkAddress);
}

/// Cache that never holds anything; every lookup goes to storage.
#[derive(Debug, Default)]
pub struct NoMuteCache;

impl MuteCache for NoMuteCache {
    fn get(&self, _uuid: Uuid, _address: NetworkAddress) -> Option<Option<Punishment>> {
        None
    }

    fn put(&self, _uuid: Uuid, _address: NetworkAddress, _mute: Option<Punishment>) {}

    fn invalidate(&self, _uuid: Uuid, _address: NetworkAddress) {}
}

/// Unbounded in-process map keyed by the exact (uuid, address) pair.
///
/// Expiry of cached mutes is the caller's concern: entries are invalidated
/// on writes, not timed out.
#[derive(Debug, Default)]
pub struct MemoryMuteCache {
    entries: Mutex<HashMap<(Uuid, NetworkAddress), Option<Punishment>>>,
}

impl MemoryMuteCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MuteCache for MemoryMuteCache {
    fn get(&self, uuid: Uuid, address: NetworkAddress) -> Option<Option<Punishment>> {
        self.entries
            .lock()
            .expect("mute cache lock poisoned")
            .get(&(uuid, address))
            .cloned()
    }

    fn put(&self, uuid: Uuid, address: NetworkAddress, mute: Option<Punishment>) {
        self.entries
            .lock()
            .expect("mute cache lock poisoned")
            .insert((uuid, address), mute);
    }

    fn invalidate(&self, uuid: Uuid, address: NetworkAddress) {
        self.entries
            .lock()
            .expect("mute cache lock poisoned")
            .remove(&(uuid, address));
    }
}
