//! Synchronization primitives built on the same queue-plus-yield mechanism
//! as ports: a mutex, a condition variable, and a barrier.

mod barrier;
mod condvar;
mod mutex;

pub use barrier::{barrier_create, barrier_destroy, barrier_wait, Barrier};
pub use condvar::{cond_broadcast, cond_create, cond_destroy, cond_signal, cond_wait, Condvar};
pub use mutex::{mutex_create, mutex_destroy, mutex_lock, mutex_unlock, Mutex};
