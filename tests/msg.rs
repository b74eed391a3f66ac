//! Mirrors `examples/original_source/test/test_msg.c`'s cross-ping scenario,
//! plus a ring-of-fibers scenario exercising the same send/receive path at
//! larger fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nk::dpc::{dpc_create_ext, DpcAttrs};
use nk::msg::{msg_recv, msg_send, port_create, PortKind};
use nk::thd::{fiber_create_ext, FiberAttrs};
use nk::{host_create, host_destroy, host_run};

/// Two fibers each hold a port, send their own value to the other's port,
/// then receive; the final values are the peer's, swapped.
#[test]
fn cross_ping_swaps_values() {
    let _ = env_logger::try_init();

    let host = host_create();
    let port_a = port_create(&host, PortKind::Fiber);
    let port_b = port_create(&host, PortKind::Fiber);

    let result_a = Arc::new(AtomicUsize::new(0));
    let result_b = Arc::new(AtomicUsize::new(0));

    {
        let (port_a, port_b, result_a) = (port_a.clone(), port_b.clone(), result_a.clone());
        fiber_create_ext(
            &host,
            move |_| {
                msg_send(&port_b, Some(&port_a), 42, 0).expect("send from a");
                let msg = msg_recv(&port_a);
                result_a.store(msg.data1(), Ordering::SeqCst);
            },
            0,
            FiberAttrs::default(),
        )
        .expect("fiber a");
    }
    {
        let (port_a, port_b, result_b) = (port_a.clone(), port_b.clone(), result_b.clone());
        fiber_create_ext(
            &host,
            move |_| {
                msg_send(&port_a, Some(&port_b), 84, 0).expect("send from b");
                let msg = msg_recv(&port_b);
                result_b.store(msg.data1(), Ordering::SeqCst);
            },
            0,
            FiberAttrs::default(),
        )
        .expect("fiber b");
    }

    host_run(&host, 2);

    // Each fiber receives what the *other* sent.
    assert_eq!(result_a.load(Ordering::SeqCst), 84);
    assert_eq!(result_b.load(Ordering::SeqCst), 42);
    host_destroy(host);
}

/// A ring of `N` fibers passes a token, each receiving, forwarding, and
/// counting its own visits. A fiber marks itself done on its `ITERS`-th
/// visit; the last fiber in the ring additionally stops forwarding there,
/// which is what brings the whole ring to a halt.
#[test]
fn ring_of_fibers_terminates_after_n_laps() {
    let _ = env_logger::try_init();

    const N: usize = 100;
    const ITERS: usize = 100;

    let host = host_create();
    let ports: Vec<_> = (0..N).map(|_| port_create(&host, PortKind::Fiber)).collect();
    let done_flags: Arc<Vec<AtomicUsize>> =
        Arc::new((0..N).map(|_| AtomicUsize::new(0)).collect());

    for i in 0..N {
        let my_port = ports[i].clone();
        let next_port = ports[(i + 1) % N].clone();
        let done_flags = done_flags.clone();
        fiber_create_ext(
            &host,
            move |_| {
                let mut count = 0usize;
                loop {
                    msg_recv(&my_port);
                    count += 1;
                    if count == ITERS {
                        done_flags[i].store(1, Ordering::SeqCst);
                        if i != N - 1 {
                            msg_send(&next_port, None, count, 0).expect("forward final hop");
                        }
                        break;
                    }
                    msg_send(&next_port, None, count, 0).expect("forward");
                }
            },
            0,
            FiberAttrs::default(),
        )
        .expect("fiber");
    }

    let start_port = ports[0].clone();
    dpc_create_ext(
        &host,
        move |_| msg_send(&start_port, None, 0, 0).expect("inject first token"),
        0,
        DpcAttrs::default(),
    )
    .expect("start dpc");

    host_run(&host, 8);

    for (i, flag) in done_flags.iter().enumerate() {
        assert_eq!(flag.load(Ordering::SeqCst), 1, "fiber {i} never finished");
    }
    host_destroy(host);
}
