//! Fibers: stack-owning schobs that can suspend at well-defined points.

use std::sync::Arc;

use fiber::YieldReason;
use log::trace;

use crate::error::{Error, Result};
use crate::host::Host;
use crate::schob::{FiberHandle, FiberInner, Schob, SchobHeader};
use crate::worker;

pub use fiber::{DEFAULT_STACK_SIZE, MAX_STACK_SIZE, MIN_STACK_SIZE};

/// Optional parameters to `fiber_create`/`fiber_create_ext`. Fields absent
/// from a literal default to [`FiberAttrs::default`]'s values.
#[derive(Clone, Copy, Debug)]
pub struct FiberAttrs {
    pub stack_size: usize,
    /// Carried but never read by the scheduler; FIFO order is always used.
    pub priority: u32,
}

impl Default for FiberAttrs {
    fn default() -> Self {
        FiberAttrs {
            stack_size: DEFAULT_STACK_SIZE,
            priority: 0,
        }
    }
}

unsafe extern "C" fn fiber_trampoline(a: usize, _b: usize, _c: usize) -> ! {
    // SAFETY: `a` was produced by `Box::into_raw` below and is delivered to
    // this trampoline exactly once, by construction of `create_ctx`.
    let boxed: Box<Box<dyn FnOnce() + Send>> = unsafe { Box::from_raw(a as *mut Box<dyn FnOnce() + Send>) };
    let body = *boxed;
    body();
    worker::exit_current()
}

/// Creates a fiber on `host`. Callable from any OS thread, including one not
/// currently running a fiber or DPC.
pub fn fiber_create_ext(
    host: &Host,
    entry: impl FnOnce(usize) + Send + 'static,
    data: usize,
    attrs: FiberAttrs,
) -> Result<FiberHandle> {
    let stack_size = attrs.stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);

    let stack = match host.inner.stack_pool.take() {
        Some(s) if s.len() == stack_size => s,
        _ => fiber::Stack::new(stack_size).map_err(|_| Error::OutOfMemory)?,
    };

    let body: Box<dyn FnOnce() + Send> = Box::new(move || entry(data));
    let arg = Box::into_raw(Box::new(body)) as usize;

    // SAFETY: `fiber_trampoline` reconstructs exactly the box leaked above,
    // calls it once, and exits through `worker::exit_current`, which never
    // returns.
    let ctx = unsafe { fiber::create_ctx(&stack, fiber_trampoline, arg, 0, 0) };

    let inner = Arc::new(Schob::Fiber(FiberInner::new(
        SchobHeader {
            prio: attrs.priority,
        },
        stack,
        ctx,
    )));
    host.inner.enqueue(inner.clone(), true);
    trace!(target: "nk::thd", "fiber created, stack_size={stack_size}");
    Ok(FiberHandle(inner))
}

/// Creates a fiber on the current fiber's or DPC's Host. Panics if not
/// called from within one.
pub fn fiber_create(
    entry: impl FnOnce(usize) + Send + 'static,
    data: usize,
    attrs: FiberAttrs,
) -> Result<FiberHandle> {
    let host = worker::current_host();
    fiber_create_ext(&host, entry, data, attrs)
}

/// Cooperatively yields the currently running fiber back to its worker; the
/// yielded fiber is placed back on the ready queue and resumes at this call
/// site. Panics if called from a DPC.
pub fn fiber_yield() {
    worker::yield_current(YieldReason::Ready);
}

/// Exits the currently running fiber. Never returns; the fiber's stack is
/// destroyed (or recycled) once the owning worker's switch completes.
/// Panics if called from a DPC.
pub fn fiber_exit() -> ! {
    worker::exit_current()
}

/// Returns a handle to the currently running fiber, or `None` if the
/// current schob is a DPC or there is no current schob at all.
pub fn fiber_self() -> Option<FiberHandle> {
    let running = worker::try_current_running()?;
    match &*running {
        Schob::Fiber(_) => Some(FiberHandle(running)),
        Schob::Dpc(_) => None,
    }
}
