//! The worker loop: one OS thread pulling schobs off the ready queue,
//! running them, and dispatching on how they left off.

use std::cell::{RefCell, UnsafeCell};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use fiber::YieldReason;
use log::{debug, trace};

use crate::host::{Host, HostInner};
use crate::schob::{DpcInner, Schob, SchobHandle};

/// Per-OS-thread state for whichever worker owns this thread. Lives in
/// thread-local storage so fiber-side code (yield, receive, sync-object
/// wait) can reach its owning worker without it being threaded through
/// every call.
pub(crate) struct WorkerContext {
    pub host: Arc<HostInner>,
    /// The worker's own stack-switch resumption token. Passed directly as
    /// the `save_from` slot of whichever `switch_ctx` call enters a fiber,
    /// so it is always current the instant that fiber starts running — no
    /// separate write-back step is needed.
    host_stack: UnsafeCell<*mut u8>,
    running: RefCell<Option<SchobHandle>>,
}

thread_local! {
    static CURRENT: RefCell<Option<WorkerContext>> = const { RefCell::new(None) };
}

fn with_current<R>(f: impl FnOnce(&WorkerContext) -> R) -> R {
    CURRENT.with(|c| {
        let ctx = c.borrow();
        let ctx = ctx
            .as_ref()
            .expect("nk: this operation requires running on a worker (fiber or DPC context)");
        f(ctx)
    })
}

pub(crate) fn current_host() -> Host {
    with_current(|ctx| Host {
        inner: ctx.host.clone(),
    })
}

pub(crate) fn try_current_host() -> Option<Host> {
    CURRENT.with(|c| {
        c.borrow().as_ref().map(|ctx| Host {
            inner: ctx.host.clone(),
        })
    })
}

pub(crate) fn current_running() -> Option<SchobHandle> {
    with_current(|ctx| ctx.running.borrow().clone())
}

/// Like [`current_running`], but returns `None` instead of panicking when
/// called off a worker thread entirely (e.g. `fiber_self` from `main`).
pub(crate) fn try_current_running() -> Option<SchobHandle> {
    CURRENT.with(|c| c.borrow().as_ref().and_then(|ctx| ctx.running.borrow().clone()))
}

/// Yields the currently running fiber with `reason`, switching back to this
/// worker's own stack. Returns once some other party switches back into
/// this fiber. Panics if called from a DPC or off a worker thread.
pub(crate) fn yield_current(reason: YieldReason) {
    let running = current_running().expect("blocking operation used outside a fiber or DPC");
    let fiber = running
        .as_fiber()
        .expect("blocking operation used from a DPC; DPCs cannot suspend");
    let to = host_stack();
    // SAFETY: this fiber is the one currently executing, so it is the sole
    // party permitted to write its own resumption slot.
    unsafe {
        let save_from = fiber.ctx_mut();
        fiber::switch_ctx(save_from, to, reason);
    }
}

/// Yields the currently running fiber as `Zombie` and never returns; the
/// owning worker destroys it once `switch_ctx` returns control there.
pub(crate) fn exit_current() -> ! {
    yield_current(YieldReason::Zombie);
    unreachable!("switched back into an exited fiber")
}

/// Returns the currently running schob, asserting it is a fiber. `op` names
/// the blocking call for the panic message, matching the spec's treatment
/// of blocking-outside-a-fiber as a programmer error.
pub(crate) fn current_fiber_handle(op: &str) -> SchobHandle {
    let running = current_running().unwrap_or_else(|| panic!("{op} called outside a fiber"));
    assert!(
        running.as_fiber().is_some(),
        "{op} called from a DPC; DPCs cannot block"
    );
    running
}

/// Switches the calling worker's stack into `fiber`, returning the reason
/// the fiber yielded with. Must be called only on the worker that currently
/// owns `fiber`'s `running_lock`.
pub(crate) fn switch_into_fiber(fiber_ctx: *mut u8) -> YieldReason {
    with_current(|ctx| {
        // SAFETY: `host_stack` is this thread's own slot, and `fiber_ctx`
        // was produced by `create_ctx` or a prior yield of this same fiber.
        unsafe {
            let save_from = &mut *ctx.host_stack.get();
            fiber::switch_ctx(save_from, fiber_ctx, YieldReason::Ready)
        }
    })
}

/// The worker-side resumption token a fiber must switch to when yielding.
pub(crate) fn host_stack() -> *mut u8 {
    with_current(|ctx| unsafe { *ctx.host_stack.get() })
}

/// Runs one worker's scheduling loop until shutdown or exhaustion.
pub(crate) fn run(host: Host, id: usize) {
    let host_stack = fiber::init_thread();
    CURRENT.with(|c| {
        *c.borrow_mut() = Some(WorkerContext {
            host: host.inner.clone(),
            host_stack: UnsafeCell::new(host_stack),
            running: RefCell::new(None),
        })
    });
    debug!(target: "nk::worker", "worker {id} starting");

    let inner = &*host.inner;
    loop {
        let schob = {
            let mut runq = inner.runq.lock().unwrap();
            loop {
                if inner.shutdown.load(Ordering::Acquire)
                    || inner.schob_count.load(Ordering::Acquire) == 0
                {
                    debug!(target: "nk::worker", "worker {id} exiting");
                    return;
                }
                if let Some(s) = runq.pop_front() {
                    break s;
                }
                runq = inner.runq_cond.wait(runq).unwrap();
            }
        };

        CURRENT.with(|c| {
            *c.borrow().as_ref().unwrap().running.borrow_mut() = Some(schob.clone());
        });

        let destroyed = match &*schob {
            Schob::Dpc(dpc) => {
                run_dpc(dpc);
                true
            }
            Schob::Fiber(fiber) => {
                let _running_lock = fiber.running_lock.lock();
                // SAFETY: `running_lock` is held for exactly the span the
                // fiber's register state is live on this worker.
                let ctx = unsafe { fiber.ctx() };
                let reason = switch_into_fiber(ctx);
                match reason {
                    YieldReason::Ready => {
                        inner.enqueue(schob.clone(), false);
                        false
                    }
                    YieldReason::Waiting => false,
                    YieldReason::Zombie => true,
                }
            }
        };

        CURRENT.with(|c| {
            *c.borrow().as_ref().unwrap().running.borrow_mut() = None;
        });

        if destroyed {
            recycle_if_unique(inner, schob);
            let remaining = inner.schob_count.fetch_sub(1, Ordering::AcqRel) - 1;
            trace!(target: "nk::worker", "schob destroyed, {remaining} remaining");
            if remaining == 0 {
                let _runq = inner.runq.lock().unwrap();
                inner.runq_cond.notify_all();
            }
        }
    }
}

/// Returns a zombie fiber's stack to the pool when this was the last
/// reference to it. If some other handle to the schob is still alive (or it
/// was a DPC, which owns no stack), this is a no-op — ordinary `Drop` still
/// runs when the last reference does go away.
fn recycle_if_unique(host: &HostInner, schob: SchobHandle) {
    if let Ok(Schob::Fiber(fiber)) = Arc::try_unwrap(schob) {
        if fiber.stack.len() == fiber::DEFAULT_STACK_SIZE {
            host.stack_pool.give(fiber.stack);
        }
    }
}

fn run_dpc(dpc: &DpcInner) {
    let run = dpc.run.lock().take();
    if let Some(run) = run {
        run();
    }
}
