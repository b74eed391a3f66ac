//! `nk`: a user-space cooperative scheduling kernel.
//!
//! A [`Host`] multiplexes fibers and DPCs onto a fixed pool of OS worker
//! threads. Fibers are stack-owning cooperative tasks that suspend at
//! well-defined points (yield, message receive, mutex/condvar/barrier wait,
//! exit); DPCs are one-shot, non-suspending calls that run to completion on
//! whichever worker picks them up. Both are scheduled through the same
//! global FIFO ready queue and interact through the same ports and sync
//! primitives.
//!
//! ```no_run
//! use nk::{host_create, host_destroy, host_run};
//! use nk::dpc::{dpc_create_ext, DpcAttrs};
//!
//! let host = host_create();
//! dpc_create_ext(&host, |_| println!("hello from a dpc"), 0, DpcAttrs::default()).unwrap();
//! host_run(&host, 4);
//! host_destroy(host);
//! ```
//!
//! Protocol violations (blocking in a DPC, receiving on a DPC-mode port,
//! destroying a non-empty port or sync object, unlocking an unlocked mutex)
//! are programmer errors: they panic rather than returning a `Result`, per
//! the kernel's error-handling design.

pub mod dpc;
pub mod error;
mod host;
pub mod msg;
mod pool;
mod schob;
pub mod sync;
pub mod thd;
mod worker;

pub use error::{Error, Result};
pub use host::{host_create, host_destroy, host_run, host_shutdown, Host, DEFAULT_FREELIST_MAX};

pub use dpc::{dpc_create, dpc_create_ext, dpc_self, DpcAttrs};
pub use msg::{
    msg_destroy, msg_recv, msg_send, port_create, port_destroy, port_set_dpc, Message, Port,
    PortKind,
};
pub use schob::{DpcHandle, FiberHandle};
pub use sync::{
    barrier_create, barrier_destroy, barrier_wait, cond_broadcast, cond_create, cond_destroy,
    cond_signal, cond_wait, mutex_create, mutex_destroy, mutex_lock, mutex_unlock, Barrier,
    Condvar, Mutex,
};
pub use thd::{
    fiber_create, fiber_create_ext, fiber_exit, fiber_self, fiber_yield, FiberAttrs,
    DEFAULT_STACK_SIZE, MAX_STACK_SIZE, MIN_STACK_SIZE,
};
