use std::collections::VecDeque;
use std::sync::Arc;

use fiber::YieldReason;

use crate::host::Host;
use crate::pool::Spinlock;
use crate::schob::SchobHandle;
use crate::worker;

struct MutexState {
    locked: bool,
    waiters: VecDeque<SchobHandle>,
}

struct MutexInner {
    host: Host,
    state: Spinlock<MutexState>,
}

/// FIFO-fair, non-handoff mutex: a woken waiter re-checks `locked` rather
/// than being guaranteed the lock, so a racing newcomer can still win it
/// first. That race is harmless because the woken fiber simply loops.
#[derive(Clone)]
pub struct Mutex(Arc<MutexInner>);

pub fn mutex_create(host: &Host) -> Mutex {
    Mutex(Arc::new(MutexInner {
        host: host.clone(),
        state: Spinlock::new(MutexState {
            locked: false,
            waiters: VecDeque::new(),
        }),
    }))
}

pub fn mutex_destroy(mutex: Mutex) {
    let state = mutex.0.state.lock();
    assert!(
        state.waiters.is_empty(),
        "mutex_destroy called on a mutex with waiting fibers"
    );
}

pub fn mutex_lock(mutex: &Mutex) {
    loop {
        let mut state = mutex.0.state.lock();
        if !state.locked {
            state.locked = true;
            return;
        }
        let running = worker::current_fiber_handle("mutex_lock");
        state.waiters.push_back(running);
        drop(state);
        worker::yield_current(YieldReason::Waiting);
        // Resumed because `unlock` popped us; re-check rather than assume
        // we now own the lock, since a racing newcomer may have beaten us.
    }
}

pub fn mutex_unlock(mutex: &Mutex) {
    let mut state = mutex.0.state.lock();
    assert!(state.locked, "mutex_unlock called on an unlocked mutex");
    state.locked = false;
    if let Some(waiter) = state.waiters.pop_front() {
        drop(state);
        mutex.0.host.inner.enqueue(waiter, false);
    }
}
