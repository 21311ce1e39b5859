//! Process-local exclusion for migrations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use stride_core::models::UserId;

/// At most one migration per user, keyed by the owning migration id.
///
/// Backs up the storage-level uniqueness check and rejects conflicting
/// requests before any row is written.
#[derive(Debug, Default)]
pub struct UserLockRegistry {
    held: DashMap<UserId, String>,
}

impl UserLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the user's lock for `migration_id`. Re-acquiring with the same id
    /// succeeds; otherwise the current holder is returned.
    pub fn acquire(&self, user_id: UserId, migration_id: &str) -> Result<(), String> {
        match self.held.entry(user_id) {
            Entry::Occupied(entry) if entry.get() == migration_id => Ok(()),
            Entry::Occupied(entry) => Err(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(migration_id.to_string());
                Ok(())
            }
        }
    }

    /// Release the lock if `migration_id` still holds it.
    pub fn release(&self, user_id: UserId, migration_id: &str) {
        self.held.remove_if(&user_id, |_, holder| holder == migration_id);
    }

    /// Migration currently holding the user's lock, if any.
    pub fn holder(&self, user_id: UserId) -> Option<String> {
        self.held.get(&user_id).map(|entry| entry.value().clone())
    }
}

/// Migrations currently being driven by a worker, with their cancel flags.
#[derive(Debug, Default)]
pub struct ExecutionRegistry {
    executing: DashMap<String, Arc<AtomicBool>>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim exclusive execution of a migration. `None` if a worker already
    /// holds it.
    pub fn claim(&self, migration_id: &str) -> Option<ExecutionGuard<'_>> {
        match self.executing.entry(migration_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let cancel = Arc::new(AtomicBool::new(false));
                entry.insert(Arc::clone(&cancel));
                Some(ExecutionGuard {
                    registry: self,
                    migration_id: migration_id.to_string(),
                    cancel,
                })
            }
        }
    }

    /// Flag an executing migration for cancellation. False if nothing is
    /// executing it.
    pub fn request_cancel(&self, migration_id: &str) -> bool {
        match self.executing.get(migration_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Whether a guard for the job is alive.
    pub fn is_executing(&self, migration_id: &str) -> bool {
        self.executing.contains_key(migration_id)
    }
}

/// Exclusive execution of one migration; released on drop.
#[derive(Debug)]
pub struct ExecutionGuard<'a> {
    registry: &'a ExecutionRegistry,
    migration_id: String,
    cancel: Arc<AtomicBool>,
}

impl ExecutionGuard<'_> {
    /// Set once `cancel` has been called for the guarded job.
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.registry.executing.remove(&self.migration_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_lock_is_exclusive_and_reentrant() {
        let locks = UserLockRegistry::new();
        assert!(locks.acquire(7, "m1").is_ok());
        assert!(locks.acquire(7, "m1").is_ok());
        assert_eq!(locks.acquire(7, "m2"), Err("m1".to_string()));
        assert!(locks.acquire(8, "m2").is_ok());

        locks.release(7, "m2");
        assert_eq!(locks.holder(7).as_deref(), Some("m1"));
        locks.release(7, "m1");
        assert!(locks.holder(7).is_none());
    }

    #[test]
    fn execution_guard_releases_on_drop() {
        let registry = ExecutionRegistry::new();
        let guard = registry.claim("m1").unwrap();
        assert!(registry.claim("m1").is_none());
        assert!(!guard.cancel_requested());

        assert!(registry.request_cancel("m1"));
        assert!(guard.cancel_requested());

        drop(guard);
        assert!(!registry.is_executing("m1"));
        assert!(!registry.request_cancel("m1"));
        assert!(registry.claim("m1").is_some());
    }
}
