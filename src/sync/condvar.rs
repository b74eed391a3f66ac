use std::collections::VecDeque;
use std::sync::Arc;

use fiber::YieldReason;

use crate::host::Host;
use crate::pool::Spinlock;
use crate::schob::SchobHandle;
use crate::sync::mutex::{mutex_lock, mutex_unlock, Mutex};
use crate::worker;

struct CondvarInner {
    host: Host,
    waiters: Spinlock<VecDeque<SchobHandle>>,
}

#[derive(Clone)]
pub struct Condvar(Arc<CondvarInner>);

pub fn cond_create(host: &Host) -> Condvar {
    Condvar(Arc::new(CondvarInner {
        host: host.clone(),
        waiters: Spinlock::new(VecDeque::new()),
    }))
}

pub fn cond_destroy(cond: Condvar) {
    assert!(
        cond.0.waiters.lock().is_empty(),
        "cond_destroy called on a condvar with waiting fibers"
    );
}

/// Atomically (with respect to other waiters of this condvar) unlocks `m`
/// and blocks; re-locks `m` before returning. The interval between joining
/// the waiters queue and yielding is safe by the same `running_lock`
/// argument that protects port receive.
pub fn cond_wait(cond: &Condvar, mutex: &Mutex) {
    let running = worker::current_fiber_handle("cond_wait");
    cond.0.waiters.lock().push_back(running);
    mutex_unlock(mutex);
    worker::yield_current(YieldReason::Waiting);
    mutex_lock(mutex);
}

pub fn cond_signal(cond: &Condvar) {
    if let Some(waiter) = cond.0.waiters.lock().pop_front() {
        cond.0.host.inner.enqueue(waiter, false);
    }
}

pub fn cond_broadcast(cond: &Condvar) {
    let woken: Vec<SchobHandle> = cond.0.waiters.lock().drain(..).collect();
    for waiter in woken {
        cond.0.host.inner.enqueue(waiter, false);
    }
}
