//! DPCs: one-shot, non-suspending procedure calls that run to completion on
//! a worker's own stack.

use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::host::Host;
use crate::schob::{DpcHandle, DpcInner, Schob, SchobHeader};
use crate::worker;

/// Optional parameters to `dpc_create`/`dpc_create_ext`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DpcAttrs {
    /// Carried but never read by the scheduler; FIFO order is always used.
    pub priority: u32,
}

/// Creates a DPC on `host`. `func` runs to completion on whichever worker
/// picks it up, with `data` as its argument; it cannot suspend. Callable
/// from any OS thread.
pub fn dpc_create_ext(
    host: &Host,
    func: impl FnOnce(usize) + Send + 'static,
    data: usize,
    attrs: DpcAttrs,
) -> Result<DpcHandle> {
    let inner = Arc::new(Schob::Dpc(DpcInner::new(
        SchobHeader {
            prio: attrs.priority,
        },
        Box::new(move || func(data)),
    )));
    host.inner.enqueue(inner.clone(), true);
    trace!(target: "nk::dpc", "dpc created");
    Ok(DpcHandle(inner))
}

/// Creates a DPC on the current fiber's or DPC's Host. Panics if not called
/// from within one.
pub fn dpc_create(
    func: impl FnOnce(usize) + Send + 'static,
    data: usize,
    attrs: DpcAttrs,
) -> Result<DpcHandle> {
    let host = worker::current_host();
    dpc_create_ext(&host, func, data, attrs)
}

/// Returns a handle to the currently running DPC, or `None` if the current
/// schob is a fiber or there is no current schob at all.
pub fn dpc_self() -> Option<DpcHandle> {
    let running = worker::try_current_running()?;
    match &*running {
        Schob::Dpc(_) => Some(DpcHandle(running)),
        Schob::Fiber(_) => None,
    }
}
