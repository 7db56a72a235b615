//! Per-account serialization.
//!
//! Each action's read-modify-write sequence runs while holding its
//! account's mutex. Actions for different accounts do not contend.
//! An entry lives only while some caller holds or waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::game::model::AccountKey;

/// Lazily created mutex per account key.
#[derive(Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<AccountKey, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, account_key: AccountKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(account_key).or_default().clone()
    }

    /// Drop the table entry if `lock` is its last outside handle.
    ///
    /// New handles are only handed out under the table lock, so a count of
    /// two (table plus `lock`) cannot grow while it is held.
    fn release(&self, account_key: AccountKey, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = locks
            .get(&account_key)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2);
        if unused {
            locks.remove(&account_key);
        }
    }

    /// Run `f` while holding the lock for `account_key`.
    ///
    /// The mutex guards no data, so a poisoned lock is still usable.
    pub fn with_account<T>(&self, account_key: AccountKey, f: impl FnOnce() -> T) -> T {
        let held = HeldEntry {
            table: self,
            account_key,
            lock: self.entry(account_key),
        };
        let _guard = held.lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of accounts currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no account is locked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Table entry handle, released on drop (after the mutex guard, which is
/// declared later and so dropped first).
struct HeldEntry<'a> {
    table: &'a AccountLocks,
    account_key: AccountKey,
    lock: Arc<Mutex<()>>,
}

impl Drop for HeldEntry<'_> {
    fn drop(&mut self) {
        self.table.release(self.account_key, &self.lock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    #[test]
    fn test_same_account_serialized() {
        let locks = Arc::new(AccountLocks::new());
        let counter = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        locks.with_account(1, || {
                            // non-atomic read-modify-write under the lock
                            let value = counter.load(Ordering::Relaxed);
                            thread::yield_now();
                            counter.store(value + 1, Ordering::Relaxed);
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 800);
    }

    #[test]
    fn test_entries_released() {
        let locks = AccountLocks::new();
        assert!(locks.is_empty());
        let sum = locks.with_account(1, || 2) + locks.with_account(2, || 3);
        assert_eq!(sum, 5);
        assert!(locks.is_empty());

        let inner = locks.with_account(1, || locks.with_account(2, || locks.len()));
        assert_eq!(inner, 2);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_entry_released_after_panic() {
        let locks = AccountLocks::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locks.with_account(3, || panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(locks.is_empty());
        assert_eq!(locks.with_account(3, || 7), 7);
    }

    #[test]
    fn test_contended_entries_released() {
        let locks = Arc::new(AccountLocks::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = locks.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        locks.with_account(i % 2, thread::yield_now);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(locks.is_empty());
    }
}
