//! Per-object mutual exclusion.
//!
//! The updater does not serialize concurrent updates of the same object:
//! two overlapping calls can interleave their chunk writes and prunes and
//! leave a corrupt chunk set. Callers that may update one object from
//! several threads supply a [`KeyLock`] to
//! [`ChunkedBlobUpdater::update_locked`](crate::ChunkedBlobUpdater::update_locked).

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

use rechunk_types::ObjectKey;

use crate::error::{UpdateError, UpdateResult};

/// A lock keyed by object identifier.
///
/// Holding the guard for key `k` excludes every other holder of `k`.
/// Different keys never block each other.
pub trait KeyLock<K: ObjectKey>: Send + Sync {
    type Guard<'a>
    where
        Self: 'a;

    /// Block until `key` is free, then hold it until the guard drops.
    fn acquire<'a>(&'a self, key: &K) -> UpdateResult<Self::Guard<'a>>;
}

/// In-process [`KeyLock`]: a set of held keys plus a condition variable.
pub struct KeyedLocks<K: ObjectKey> {
    held: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K: ObjectKey> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Returns `true` if some caller currently holds `key`.
    pub fn is_held(&self, key: &K) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn release(&self, key: &K) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(key);
        self.released.notify_all();
    }
}

impl<K: ObjectKey> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ObjectKey> KeyLock<K> for KeyedLocks<K> {
    type Guard<'a> = KeyGuard<'a, K> where Self: 'a;

    fn acquire<'a>(&'a self, key: &K) -> UpdateResult<Self::Guard<'a>> {
        let poisoned = |e: String| UpdateError::Lock {
            id: key.to_string(),
            reason: e,
        };

        let mut held = self.held.lock().map_err(|e| poisoned(e.to_string()))?;
        while held.contains(key) {
            held = self
                .released
                .wait(held)
                .map_err(|e| poisoned(e.to_string()))?;
        }
        held.insert(key.clone());

        Ok(KeyGuard {
            locks: self,
            key: key.clone(),
        })
    }
}

impl<K: ObjectKey> std::fmt::Debug for KeyedLocks<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("KeyedLocks").field("held", &held).finish()
    }
}

/// Exclusive hold on one key of a [`KeyedLocks`]; released on drop.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyGuard<'a, K: ObjectKey> {
    locks: &'a KeyedLocks<K>,
    key: K,
}

impl<K: ObjectKey> KeyGuard<'_, K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: ObjectKey> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn guard_releases_on_drop() {
        let locks = KeyedLocks::new();
        {
            let guard = locks.acquire(&"a").unwrap();
            assert_eq!(*guard.key(), "a");
            assert!(locks.is_held(&"a"));
        }
        assert!(!locks.is_held(&"a"));
    }

    #[test]
    fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire(&1u64).unwrap();
        let _b = locks.acquire(&2u64).unwrap();
        assert!(locks.is_held(&1));
        assert!(locks.is_held(&2));
        assert!(format!("{locks:?}").contains("held: 2"));
    }

    #[test]
    fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    let _guard = locks.acquire(&"shared".to_string()).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(!locks.is_held(&"shared".to_string()));
    }
}
