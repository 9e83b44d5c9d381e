//! # Per-Record Locking
//!
//! Exclusive, blocking locks keyed by record position. A position is held by
//! at most one caller at a time; the holder is identified by the opaque
//! [`LockCookie`] returned when the lock is granted and must present it to
//! unlock.
//!
//! Waiters on the same position are served in arrival order: each waiter
//! enqueues a ticket and is granted the lock only when its ticket is at the
//! head of the queue and the position is free. Releases broadcast on a single
//! condition variable and every waiter rechecks its own position.
//!
//! The table mutex guards only the table itself. It is never held across file
//! I/O; callers perform I/O between `lock` and `unlock`.
//!
//! Callers never hold two positions at once, so no lock ordering is needed.

use roomdb_core::{Error, Position, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Opaque identity of a lock holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockCookie(u64);

impl LockCookie {
    /// Raw cookie value, for logging
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Table entry for a position that is held or awaited
#[derive(Debug, Default)]
struct LockEntry {
    holder: Option<LockCookie>,
    waiters: VecDeque<u64>,
}

impl LockEntry {
    fn is_idle(&self) -> bool {
        self.holder.is_none() && self.waiters.is_empty()
    }
}

type LockTable = HashMap<Position, LockEntry>;

/// Grants and releases exclusive per-position locks.
#[derive(Debug)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    next_ticket: AtomicU64,
}

impl LockManager {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            released: Condvar::new(),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Block until `position` is free, then take it.
    pub fn lock(&self, position: Position) -> Result<LockCookie> {
        self.lock_until(position, None)
    }

    /// As [`LockManager::lock`], giving up after `timeout`.
    ///
    /// On timeout nothing is granted and `Error::LockTimeout` is returned.
    pub fn lock_timeout(&self, position: Position, timeout: Duration) -> Result<LockCookie> {
        self.lock_until(position, Some(Instant::now() + timeout))
    }

    /// Release `position`, which must be held under `cookie`.
    pub fn unlock(&self, position: Position, cookie: LockCookie) -> Result<()> {
        {
            let mut table = self.table.lock().map_err(|_| Error::LockPoisoned)?;

            let entry = match table.get_mut(&position) {
                Some(entry) if entry.holder == Some(cookie) => entry,
                _ => {
                    warn!(position, cookie = cookie.value(), "Illegal unlock");
                    return Err(Error::IllegalUnlock { position });
                }
            };

            entry.holder = None;
            if entry.is_idle() {
                table.remove(&position);
            }
        }

        self.released.notify_all();
        debug!(position, cookie = cookie.value(), "Unlocked");
        Ok(())
    }

    /// Lock `position` and return a guard that unlocks it on drop.
    ///
    /// `timeout` of `None` waits indefinitely.
    pub fn acquire(&self, position: Position, timeout: Option<Duration>) -> Result<PositionGuard<'_>> {
        let cookie = match timeout {
            Some(timeout) => self.lock_timeout(position, timeout)?,
            None => self.lock(position)?,
        };

        Ok(PositionGuard {
            manager: self,
            position,
            cookie,
        })
    }

    /// Whether `position` is currently held
    pub fn is_locked(&self, position: Position) -> bool {
        self.table
            .lock()
            .map(|table| table.get(&position).map_or(false, |e| e.holder.is_some()))
            .unwrap_or(false)
    }

    /// Number of positions currently held
    pub fn locked_count(&self) -> usize {
        self.table
            .lock()
            .map(|table| table.values().filter(|e| e.holder.is_some()).count())
            .unwrap_or(0)
    }

    fn lock_until(&self, position: Position, deadline: Option<Instant>) -> Result<LockCookie> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let mut table = self.table.lock().map_err(|_| Error::LockPoisoned)?;

        table.entry(position).or_default().waiters.push_back(ticket);

        loop {
            let entry = table.entry(position).or_default();
            if entry.holder.is_none() && entry.waiters.front() == Some(&ticket) {
                entry.waiters.pop_front();
                let cookie = LockCookie(ticket);
                entry.holder = Some(cookie);

                debug!(position, cookie = ticket, "Locked");
                return Ok(cookie);
            }

            let woken = match deadline {
                None => self.released.wait(table),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.withdraw(table, position, ticket);
                        warn!(position, "Timed out waiting for lock");
                        return Err(Error::LockTimeout { position });
                    }

                    self.released
                        .wait_timeout(table, deadline - now)
                        .map(|(table, _)| table)
                        .map_err(|poisoned| PoisonError::new(poisoned.into_inner().0))
                }
            };

            table = match woken {
                Ok(table) => table,
                Err(poisoned) => {
                    self.withdraw(poisoned.into_inner(), position, ticket);
                    warn!(position, "Lock table poisoned while waiting");
                    return Err(Error::LockPoisoned);
                }
            };
        }
    }

    /// Remove `ticket` from the queue of `position` and wake the others,
    /// since the head of the queue may have changed.
    fn withdraw(&self, mut table: MutexGuard<'_, LockTable>, position: Position, ticket: u64) {
        if let Some(entry) = table.get_mut(&position) {
            entry.waiters.retain(|&t| t != ticket);
            if entry.is_idle() {
                table.remove(&position);
            }
        }
        drop(table);

        self.released.notify_all();
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a position lock until dropped.
#[derive(Debug)]
pub struct PositionGuard<'a> {
    manager: &'a LockManager,
    position: Position,
    cookie: LockCookie,
}

impl PositionGuard<'_> {
    /// Locked position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Cookie the lock is held under
    pub fn cookie(&self) -> LockCookie {
        self.cookie
    }
}

impl Drop for PositionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.manager.unlock(self.position, self.cookie) {
            warn!(position = self.position, error = %e, "Failed to release position lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_unlock() {
        let manager = LockManager::new();
        let cookie = manager.lock(3).unwrap();
        assert!(manager.is_locked(3));
        assert!(!manager.is_locked(4));
        assert_eq!(manager.locked_count(), 1);

        manager.unlock(3, cookie).unwrap();
        assert!(!manager.is_locked(3));
        assert_eq!(manager.locked_count(), 0);
    }

    #[test]
    fn test_unlock_unlocked_position() {
        let manager = LockManager::new();
        let cookie = manager.lock(1).unwrap();

        let result = manager.unlock(2, cookie);
        assert!(matches!(result, Err(Error::IllegalUnlock { position: 2 })));
    }

    #[test]
    fn test_unlock_by_other_holder() {
        let manager = LockManager::new();
        let first = manager.lock(1).unwrap();
        let other = manager.lock(2).unwrap();

        let result = manager.unlock(1, other);
        assert!(matches!(result, Err(Error::IllegalUnlock { position: 1 })));
        assert!(manager.is_locked(1));

        manager.unlock(1, first).unwrap();
        // A released cookie cannot be reused
        assert!(manager.unlock(1, first).is_err());
    }

    #[test]
    fn test_distinct_positions_do_not_block() {
        let manager = LockManager::new();
        let a = manager.lock(1).unwrap();
        let b = manager.lock_timeout(2, Duration::from_millis(10)).unwrap();
        assert_ne!(a, b);
        assert_eq!(manager.locked_count(), 2);
    }

    #[test]
    fn test_timeout_grants_nothing() {
        let manager = LockManager::new();
        let cookie = manager.lock(7).unwrap();

        let result = manager.lock_timeout(7, Duration::from_millis(20));
        assert!(matches!(result, Err(Error::LockTimeout { position: 7 })));

        // The holder is unchanged and can still unlock
        manager.unlock(7, cookie).unwrap();
        assert!(manager.lock_timeout(7, Duration::from_millis(20)).is_ok());
    }

    #[test]
    fn test_waiter_blocks_until_release() {
        let manager = Arc::new(LockManager::new());
        let cookie = manager.lock(0).unwrap();
        let acquired = Arc::new(AtomicBool::new(false));

        let handle = {
            let manager = Arc::clone(&manager);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let cookie = manager.lock(0).unwrap();
                acquired.store(true, Ordering::SeqCst);
                manager.unlock(0, cookie).unwrap();
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        manager.unlock(0, cookie).unwrap();
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_fifo_order() {
        let manager = Arc::new(LockManager::new());
        let cookie = manager.lock(0).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let manager = Arc::clone(&manager);
            let order = Arc::clone(&order);
            handles.push(thread::spawn(move || {
                let cookie = manager.lock(0).unwrap();
                order.lock().unwrap().push(i);
                manager.unlock(0, cookie).unwrap();
            }));
            // Let each waiter enqueue before the next one arrives
            thread::sleep(Duration::from_millis(30));
        }

        manager.unlock(0, cookie).unwrap();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_timed_out_waiter_leaves_queue() {
        let manager = Arc::new(LockManager::new());
        let cookie = manager.lock(0).unwrap();

        let impatient = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.lock_timeout(0, Duration::from_millis(20)))
        };
        assert!(impatient.join().unwrap().is_err());

        let patient = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let cookie = manager.lock(0).unwrap();
                manager.unlock(0, cookie).unwrap();
            })
        };

        thread::sleep(Duration::from_millis(20));
        manager.unlock(0, cookie).unwrap();
        patient.join().unwrap();
        assert_eq!(manager.locked_count(), 0);
    }

    #[test]
    fn test_poisoned_wait_withdraws_ticket() {
        let manager = LockManager::new();
        let cookie = manager.lock(0).unwrap();

        thread::scope(|scope| {
            let waiter = scope.spawn(|| manager.lock(0));

            // Wait until the waiter has queued its ticket
            while manager.table.lock().unwrap()[&0].waiters.is_empty() {
                thread::sleep(Duration::from_millis(1));
            }

            let poisoner = scope.spawn(|| {
                let _table = manager.table.lock().unwrap();
                panic!("poison the lock table");
            });
            assert!(poisoner.join().is_err());
            manager.released.notify_all();

            assert!(matches!(waiter.join().unwrap(), Err(Error::LockPoisoned)));
        });

        let table = manager.table.lock().unwrap_err().into_inner();
        assert!(table[&0].waiters.is_empty());
        assert_eq!(table[&0].holder, Some(cookie));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let manager = LockManager::new();
        {
            let guard = manager.acquire(9, None).unwrap();
            assert_eq!(guard.position(), 9);
            assert!(manager.is_locked(9));
        }
        assert!(!manager.is_locked(9));

        let guard = manager.acquire(9, Some(Duration::from_millis(5))).unwrap();
        assert!(manager.unlock(9, guard.cookie()).is_ok());
        // Guard drop now reports the illegal unlock instead of panicking
        drop(guard);
        assert!(!manager.is_locked(9));
    }
}
