//! The spinlock every in-process queue in this crate is guarded by, and the
//! bounded freelist used to recycle fiber stacks.

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::hint;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// A spin-only mutex: `compare_exchange` to acquire, `spin_loop` while
/// contended. Used for every port, sync-object, and freelist lock in this
/// crate — none of them are ever held across a yield or a blocking call, so
/// there is nothing for a spinlock to wait a meaningful amount of time for.
pub struct Spinlock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: `data` is only reachable through a guard obtained while `locked`
// is held, so access is exclusive regardless of which thread holds it.
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    pub fn new(value: T) -> Self {
        Spinlock {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return SpinlockGuard { lock: self };
            }
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }
}

pub struct SpinlockGuard<'a, T> {
    lock: &'a Spinlock<T>,
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: holding the guard means `locked` was successfully acquired.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the guard means `locked` was successfully acquired.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinlockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// A bounded per-category object pool.
///
/// Here this recycles fiber stacks, where pooling has a real payoff (it
/// avoids an `mmap`/`munmap` round trip per fiber). Other kernel object
/// categories (DPCs, messages, ports, sync objects) are served by the
/// ordinary allocator through `Arc`/`Box`; their liveness is tracked by
/// `Host::schob_count` rather than by a dedicated freelist.
pub struct Freelist<T> {
    free: Spinlock<VecDeque<T>>,
    max_count: usize,
}

impl<T> Freelist<T> {
    pub fn new(max_count: usize) -> Self {
        Freelist {
            free: Spinlock::new(VecDeque::new()),
            max_count,
        }
    }

    /// Takes a recycled value if the pool has one on hand.
    pub fn take(&self) -> Option<T> {
        self.free.lock().pop_front()
    }

    /// Returns a value to the pool, dropping it instead if the pool is
    /// already at `max_count`.
    pub fn give(&self, value: T) {
        let mut free = self.free.lock();
        if free.len() < self.max_count {
            free.push_back(value);
        }
    }

    pub fn pooled_count(&self) -> usize {
        self.free.lock().len()
    }
}
