use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per record key.
///
/// Holding the guard serializes every read-validate-write cycle on that
/// record within this process; different keys never contend. An entry lives
/// only while someone holds or waits for it, so the table stays as small as
/// the number of records in flight.
pub struct RecordLocks<K: Eq + Hash + Clone> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> RecordLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub async fn lock(&self, key: &K) -> RecordGuard<'_, K> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        RecordGuard {
            guard: Some(mutex.lock_owned().await),
            key: key.clone(),
            locks: &self.locks,
        }
    }
}

impl<K: Eq + Hash + Clone> Default for RecordLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to one record; dropping it releases the record.
pub struct RecordGuard<'a, K: Eq + Hash + Clone> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> Drop for RecordGuard<'_, K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table's own handle is the only one left when nobody holds or
        // waits; waiters clone under the same shard lock, so this cannot race.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
