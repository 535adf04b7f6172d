//! Per-profile read/write locking
//!
//! Reconciliation takes a read lock on the master (its collection is
//! only fetched) and a write lock on each mirror it mutates. Restore
//! takes a write lock on its target. Locks are created lazily and kept
//! for the lifetime of the registry.

use crate::collection::ProfileId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Lazily-populated map of per-profile locks
#[derive(Default)]
pub struct ProfileLocks {
    locks: Mutex<HashMap<ProfileId, Arc<RwLock<()>>>>,
}

impl ProfileLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, profile: &ProfileId) -> Arc<RwLock<()>> {
        let mut map = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(profile.clone())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Acquire a shared read lock on a profile
    pub async fn read(&self, profile: &ProfileId) -> OwnedRwLockReadGuard<()> {
        self.lock_for(profile).read_owned().await
    }

    /// Acquire an exclusive write lock on a profile
    pub async fn write(&self, profile: &ProfileId) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(profile).write_owned().await
    }
}
