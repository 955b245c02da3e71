//! Per-identifier write serialization
//!
//! Every coordinator that shares one `IdentifierLocks` serializes the
//! lookup → classify → upsert sequence for each identifier. A chunk takes
//! all of its identifiers at once or waits, so two chunks can never hold
//! half of each other's identifiers.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use crate::domain::result::{Error, Result};

/// Registry of identifiers currently being written
#[derive(Default)]
pub struct IdentifierLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl IdentifierLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until none of `identifiers` is held, then hold all of them
    pub fn acquire<'a>(&'a self, identifiers: &[String]) -> Result<IdentifierGuard<'a>> {
        let poisoned = || Error::store("identifier lock registry poisoned");
        let mut held = self.held.lock().map_err(|_| poisoned())?;
        while identifiers.iter().any(|id| held.contains(id)) {
            held = self.released.wait(held).map_err(|_| poisoned())?;
        }

        let mut taken = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            if held.insert(id.clone()) {
                taken.push(id.clone());
            }
        }

        Ok(IdentifierGuard {
            locks: self,
            identifiers: taken,
        })
    }

    /// Number of identifiers currently held
    pub fn held_count(&self) -> usize {
        self.held.lock().map(|h| h.len()).unwrap_or(0)
    }
}

/// Releases its identifiers on drop
pub struct IdentifierGuard<'a> {
    locks: &'a IdentifierLocks,
    identifiers: Vec<String>,
}

impl Drop for IdentifierGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut held) = self.locks.held.lock() {
            for id in &self.identifiers {
                held.remove(id);
            }
        }
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_release_on_drop() {
        let locks = IdentifierLocks::new();
        {
            let _guard = locks.acquire(&ids(&["P1", "P2"])).unwrap();
            assert_eq!(locks.held_count(), 2);
        }
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn test_duplicate_ids_in_one_request() {
        let locks = IdentifierLocks::new();
        let guard = locks.acquire(&ids(&["P1", "P1"])).unwrap();
        assert_eq!(locks.held_count(), 1);
        drop(guard);
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn test_overlapping_acquire_waits() {
        let locks = Arc::new(IdentifierLocks::new());
        let guard = locks.acquire(&ids(&["P1"])).unwrap();
        let entered = Arc::new(AtomicBool::new(false));

        let handle = {
            let locks = Arc::clone(&locks);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _guard = locks.acquire(&ids(&["P2", "P1"])).unwrap();
                entered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));

        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn test_disjoint_acquire_does_not_wait() {
        let locks = IdentifierLocks::new();
        let _a = locks.acquire(&ids(&["P1"])).unwrap();
        let _b = locks.acquire(&ids(&["P2"])).unwrap();
        assert_eq!(locks.held_count(), 2);
    }
}
