//! The common header shared by fibers and DPCs ("schobs" — schedulable
//! objects), modeled as a sum type per the rest of the scheduler, which
//! only ever reads the common header and otherwise dispatches on variant.

use std::cell::UnsafeCell;
use std::sync::Arc;

use fiber::Stack;

use crate::msg::MessageHandle;
use crate::pool::Spinlock;

/// Fields common to every schedulable entity. `prio` is carried but never
/// read by the scheduler — FIFO order is used throughout.
pub(crate) struct SchobHeader {
    pub prio: u32,
}

pub(crate) struct FiberInner {
    pub header: SchobHeader,
    pub stack: Stack,
    /// The fiber's saved resumption point. Only ever touched by the single
    /// worker currently holding `running_lock` for this fiber — either the
    /// worker reading it to resume, or the fiber itself (running on that
    /// worker) writing a fresh one as it yields.
    ctx: UnsafeCell<*mut u8>,
    /// Held by a Worker from the instant it commits to switching into this
    /// fiber until `switch_ctx` returns control to that Worker. A fiber can
    /// place itself on a port's or sync object's wait queue and be observed
    /// (and re-enqueued) by another thread before its own `switch_ctx` call
    /// has actually returned; `running_lock` is what stops a second Worker
    /// from picking the same fiber up and switching into it while the first
    /// Worker's switch is still unwinding. It is a handshake across one
    /// suspension, not an ordinary mutual-exclusion lock over fiber state.
    pub running_lock: Spinlock<()>,
    /// Written directly by a sender delivering to a fiber blocked in
    /// `msg_recv`; read and cleared by that fiber on resumption.
    pub recv_slot: Spinlock<Option<MessageHandle>>,
}

// SAFETY: `ctx` is read/written only by the one OS thread that currently
// holds `running_lock` for this fiber; cross-thread handoff of that
// privilege is itself serialized by `running_lock`.
unsafe impl Send for FiberInner {}
unsafe impl Sync for FiberInner {}

impl FiberInner {
    pub fn new(header: SchobHeader, stack: Stack, ctx: *mut u8) -> FiberInner {
        FiberInner {
            header,
            stack,
            ctx: UnsafeCell::new(ctx),
            running_lock: Spinlock::new(()),
            recv_slot: Spinlock::new(None),
        }
    }

    /// Current resumption pointer. Call only while holding `running_lock`.
    ///
    /// # Safety
    /// The caller must be the sole thread currently permitted to touch this
    /// fiber's register state (i.e. it holds `running_lock`, or is the
    /// fiber itself running under that same lock).
    pub unsafe fn ctx(&self) -> *mut u8 {
        unsafe { *self.ctx.get() }
    }

    /// # Safety
    /// Same requirement as [`FiberInner::ctx`].
    pub unsafe fn set_ctx(&self, value: *mut u8) {
        unsafe {
            *self.ctx.get() = value;
        }
    }

    /// A mutable reference onto the resumption-pointer slot itself, for
    /// passing directly as `switch_ctx`'s `save_from` when this fiber
    /// yields.
    ///
    /// # Safety
    /// Same requirement as [`FiberInner::ctx`].
    pub unsafe fn ctx_mut(&self) -> &mut *mut u8 {
        unsafe { &mut *self.ctx.get() }
    }
}

pub(crate) struct DpcInner {
    pub header: SchobHeader,
    pub run: Spinlock<Option<Box<dyn FnOnce() + Send>>>,
}

impl DpcInner {
    pub fn new(header: SchobHeader, run: Box<dyn FnOnce() + Send>) -> DpcInner {
        DpcInner {
            header,
            run: Spinlock::new(Some(run)),
        }
    }
}

pub(crate) enum Schob {
    Fiber(FiberInner),
    Dpc(DpcInner),
}

impl Schob {
    pub fn header(&self) -> &SchobHeader {
        match self {
            Schob::Fiber(f) => &f.header,
            Schob::Dpc(d) => &d.header,
        }
    }

    pub fn as_fiber(&self) -> Option<&FiberInner> {
        match self {
            Schob::Fiber(f) => Some(f),
            Schob::Dpc(_) => None,
        }
    }
}

/// A schob is always handled through a shared, cheaply-cloned handle —
/// extrusive queues (`VecDeque<SchobHandle>`) move this around instead of
/// threading an intrusive link through the object itself.
pub(crate) type SchobHandle = Arc<Schob>;

/// An opaque handle to a running fiber, returned by `fiber_self`.
#[derive(Clone)]
pub struct FiberHandle(pub(crate) SchobHandle);

/// An opaque handle to a running DPC, returned by `dpc_self`.
#[derive(Clone)]
pub struct DpcHandle(pub(crate) SchobHandle);
