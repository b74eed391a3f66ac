//! Ports and messages: the rendezvous subsystem that both queues messages
//! and hands fibers directly across worker boundaries.

use std::collections::VecDeque;
use std::sync::Arc;

use fiber::YieldReason;
use log::trace;

use crate::dpc::{dpc_create_ext, DpcAttrs};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::pool::Spinlock;
use crate::schob::Schob;
use crate::worker;

/// A port's delivery mode. Fiber-mode ports support blocking receive;
/// DPC-mode ports spawn a DPC per delivered message and never block anyone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortKind {
    Dpc,
    Fiber,
}

type PortHandlerFn = Arc<dyn Fn(Message) + Send + Sync>;

struct PortState {
    msgs: VecDeque<MessageHandle>,
    waiters: VecDeque<Arc<Schob>>,
    handler: Option<(PortHandlerFn, usize)>,
    sent_any: bool,
}

pub(crate) struct PortInner {
    host: Host,
    kind: PortKind,
    state: Spinlock<PortState>,
}

/// A rendezvous object: either a DPC-mode port with an optional handler, or
/// a fiber-mode port fibers can block-receive on.
#[derive(Clone)]
pub struct Port(Arc<PortInner>);

pub(crate) struct MessageInner {
    pub src: Option<Port>,
    pub dest: Port,
    pub data1: usize,
    pub data2: usize,
    /// Filled in from the destination port's DPC handler registration, for
    /// handlers that want to tell ports apart without closing over state.
    pub handler_data: usize,
}

pub(crate) type MessageHandle = Arc<MessageInner>;

/// A delivered message: two opaque payload words plus the ports it moved
/// between.
#[derive(Clone)]
pub struct Message(pub(crate) MessageHandle);

impl Message {
    pub fn src(&self) -> Option<Port> {
        self.0.src.clone()
    }

    pub fn dest(&self) -> Port {
        self.0.dest.clone()
    }

    pub fn data1(&self) -> usize {
        self.0.data1
    }

    pub fn data2(&self) -> usize {
        self.0.data2
    }

    pub fn handler_data(&self) -> usize {
        self.0.handler_data
    }
}

/// Creates a port of the given kind on `host`.
pub fn port_create(host: &Host, kind: PortKind) -> Port {
    Port(Arc::new(PortInner {
        host: host.clone(),
        kind,
        state: Spinlock::new(PortState {
            msgs: VecDeque::new(),
            waiters: VecDeque::new(),
            handler: None,
            sent_any: false,
        }),
    }))
}

/// Destroys a port. The caller must ensure no sender or receiver is still
/// using it; a non-empty port is a protocol violation and aborts.
pub fn port_destroy(port: Port) {
    let state = port.0.state.lock();
    assert!(
        state.msgs.is_empty() && state.waiters.is_empty(),
        "port_destroy called on a port with pending messages or waiters"
    );
}

/// Installs a DPC handler on a DPC-mode port. Only legal before any message
/// has been sent through the port; calling it on a fiber-mode port, or
/// after a first send, is `Error::InvalidState`.
pub fn port_set_dpc(
    port: &Port,
    func: impl Fn(Message) + Send + Sync + 'static,
    data: usize,
) -> Result<()> {
    if port.0.kind != PortKind::Dpc {
        return Err(Error::InvalidState);
    }
    let mut state = port.0.state.lock();
    if state.sent_any {
        return Err(Error::InvalidState);
    }
    state.handler = Some((Arc::new(func), data));
    Ok(())
}

/// Sends a message to `dest`. `src` may be omitted (the receiver then
/// observes `src: None`). On a fiber-mode port, delivers directly to a
/// waiting receiver if one exists, otherwise queues. On a DPC-mode port,
/// spawns a DPC running the installed handler, or fails with
/// `Error::NoReceiver` if none is installed.
pub fn msg_send(dest: &Port, src: Option<&Port>, data1: usize, data2: usize) -> Result<()> {
    let mut state = dest.0.state.lock();
    state.sent_any = true;

    match dest.0.kind {
        PortKind::Fiber => {
            let msg: MessageHandle = Arc::new(MessageInner {
                src: src.cloned(),
                dest: dest.clone(),
                data1,
                data2,
                handler_data: 0,
            });
            if let Some(waiter) = state.waiters.pop_front() {
                drop(state);
                let fiber = waiter
                    .as_fiber()
                    .expect("only fibers are ever pushed onto a port's waiters queue");
                *fiber.recv_slot.lock() = Some(msg);
                dest.0.host.inner.enqueue(waiter, false);
            } else {
                state.msgs.push_back(msg);
            }
            Ok(())
        }
        PortKind::Dpc => {
            let handler = state.handler.clone();
            drop(state);
            match handler {
                Some((func, handler_data)) => {
                    let msg = Message(Arc::new(MessageInner {
                        src: src.cloned(),
                        dest: dest.clone(),
                        data1,
                        data2,
                        handler_data,
                    }));
                    dpc_create_ext(&dest.0.host, move |_| func(msg), 0, DpcAttrs::default())?;
                    Ok(())
                }
                None => Err(Error::NoReceiver),
            }
        }
    }
}

/// Blocks the current fiber until a message arrives on `port`. `port` must
/// be fiber-mode; calling this on a DPC-mode port, or off a fiber, is a
/// protocol violation and aborts.
pub fn msg_recv(port: &Port) -> Message {
    assert_eq!(
        port.0.kind,
        PortKind::Fiber,
        "msg_recv called on a DPC-mode port"
    );
    let running = worker::current_running().expect("msg_recv called outside a fiber");
    let fiber = running
        .as_fiber()
        .expect("msg_recv called from a DPC; DPCs cannot block");

    let mut state = port.0.state.lock();
    if let Some(msg) = state.msgs.pop_front() {
        return Message(msg);
    }
    // The interval between pushing `running` here and actually yielding is
    // not a race: once this fiber yields `Waiting`, its owning worker will
    // not re-enqueue it, so the only way it becomes runnable again is a
    // sender delivering into `recv_slot` and enqueuing it itself. Even if
    // that happens concurrently with the yield below, `running_lock` (held
    // by this fiber's worker for the whole switch) prevents any other
    // worker from resuming this fiber before the yield completes.
    state.waiters.push_back(running.clone());
    drop(state);
    worker::yield_current(YieldReason::Waiting);

    let msg = fiber
        .recv_slot
        .lock()
        .take()
        .expect("fiber resumed from msg_recv without a message in its recv_slot");
    trace!(target: "nk::msg", "fiber received message");
    Message(msg)
}

/// Destroys a message. Provided for symmetry with the rest of the external
/// interface; a `Message` is otherwise an ordinary owned value.
pub fn msg_destroy(_msg: Message) {}
