//! The Host: one runtime instance, its ready queue, and its worker pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use log::{debug, info, trace};

use crate::pool::Freelist;
use crate::schob::SchobHandle;
use crate::worker;

/// Recycled fiber stacks are kept up to this count before being returned to
/// the allocator outright. Matches the reference freelist `max_count`.
pub const DEFAULT_FREELIST_MAX: usize = 10_000;

pub(crate) struct HostInner {
    pub(crate) runq: Mutex<VecDeque<SchobHandle>>,
    pub(crate) runq_cond: Condvar,
    pub(crate) schob_count: AtomicUsize,
    pub(crate) shutdown: AtomicBool,
    pub(crate) stack_pool: Freelist<fiber::Stack>,
}

impl HostInner {
    /// Pushes `schob` onto the ready queue and wakes a worker. `is_new`
    /// distinguishes "this schob did not exist before" (counted toward
    /// `schob_count`) from "this schob is simply being made runnable again"
    /// (a resumed wait, or a fiber's own `READY` yield).
    pub(crate) fn enqueue(&self, schob: SchobHandle, is_new: bool) {
        let mut runq = self.runq.lock().unwrap();
        runq.push_back(schob);
        if is_new {
            self.schob_count.fetch_add(1, Ordering::AcqRel);
        }
        self.runq_cond.notify_all();
    }
}

/// One runtime instance: a ready queue, a worker pool, and the object pools
/// that serve it. Cheap to clone — clones share the same underlying state.
#[derive(Clone)]
pub struct Host {
    pub(crate) inner: Arc<HostInner>,
}

/// Creates a new, empty Host. Multiple Hosts may coexist in one process
/// without interacting.
pub fn host_create() -> Host {
    Host {
        inner: Arc::new(HostInner {
            runq: Mutex::new(VecDeque::new()),
            runq_cond: Condvar::new(),
            schob_count: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            stack_pool: Freelist::new(DEFAULT_FREELIST_MAX),
        }),
    }
}

/// Spawns `workers` OS threads and blocks until every one of them exits.
/// A worker exits once it observes `schob_count == 0` or `shutdown` with an
/// empty ready queue. Any schobs still sitting on the ready queue once every
/// worker has exited are dropped without running, per the shutdown
/// semantics: they were never guaranteed to run once shutdown raced ahead
/// of them.
pub fn host_run(host: &Host, workers: usize) {
    info!(target: "nk::host", "starting run loop with {workers} workers");
    let handles: Vec<JoinHandle<()>> = (0..workers)
        .map(|id| {
            let host = host.clone();
            std::thread::Builder::new()
                .name(format!("nk-worker-{id}"))
                .spawn(move || worker::run(host, id))
                .expect("failed to spawn worker thread")
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }

    let leftover: Vec<SchobHandle> = {
        let mut runq = host.inner.runq.lock().unwrap();
        runq.drain(..).collect()
    };
    if !leftover.is_empty() {
        debug!(
            target: "nk::host",
            "destroying {} schob(s) left on the ready queue at shutdown",
            leftover.len()
        );
    }
    drop(leftover);
    info!(target: "nk::host", "run loop exited");
}

/// Sets the sticky shutdown flag and wakes every worker so each observes it
/// on its next scheduling decision. Does not interrupt a schob already
/// running.
pub fn host_shutdown(host: &Host) {
    trace!(target: "nk::host", "shutdown requested");
    let _runq = host.inner.runq.lock().unwrap();
    host.inner.shutdown.store(true, Ordering::Release);
    host.inner.runq_cond.notify_all();
}

/// Consumes the Host. Must be called only after `host_run` has returned and
/// every schob has finished; panics otherwise, since destroying a Host with
/// live schobs would silently leak or corrupt their state.
pub fn host_destroy(host: Host) {
    let live = host.inner.schob_count.load(Ordering::Acquire);
    assert_eq!(live, 0, "host_destroy called with {live} schob(s) still live");
}
