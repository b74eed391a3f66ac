use std::collections::VecDeque;
use std::sync::Arc;

use fiber::YieldReason;

use crate::host::Host;
use crate::pool::Spinlock;
use crate::schob::SchobHandle;
use crate::worker;

struct BarrierState {
    count: usize,
    waiters: VecDeque<SchobHandle>,
}

struct BarrierInner {
    host: Host,
    limit: usize,
    state: Spinlock<BarrierState>,
}

/// A fixed-capacity rendezvous point: the `limit`-th arrival releases every
/// fiber that arrived before it, resetting the barrier for its next phase.
#[derive(Clone)]
pub struct Barrier(Arc<BarrierInner>);

pub fn barrier_create(host: &Host, limit: usize) -> Barrier {
    Barrier(Arc::new(BarrierInner {
        host: host.clone(),
        limit,
        state: Spinlock::new(BarrierState {
            count: 0,
            waiters: VecDeque::new(),
        }),
    }))
}

pub fn barrier_destroy(barrier: Barrier) {
    let state = barrier.0.state.lock();
    assert_eq!(
        state.count, 0,
        "barrier_destroy called mid-phase ({} of {} arrived)",
        state.count, barrier.0.limit
    );
    assert!(
        state.waiters.is_empty(),
        "barrier_destroy called with waiting fibers"
    );
}

pub fn barrier_wait(barrier: &Barrier) {
    let running = worker::current_fiber_handle("barrier_wait");
    let mut state = barrier.0.state.lock();
    state.count += 1;
    if state.count < barrier.0.limit {
        state.waiters.push_back(running);
        drop(state);
        worker::yield_current(YieldReason::Waiting);
        return;
    }
    state.count = 0;
    let woken: Vec<SchobHandle> = state.waiters.drain(..).collect();
    drop(state);
    for waiter in woken {
        barrier.0.host.inner.enqueue(waiter, false);
    }
}
