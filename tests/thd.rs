//! Mirrors `examples/original_source/test/test_thd.c`: a lone DPC, then a
//! DPC that spawns fibers of its own.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use nk::dpc::{dpc_create_ext, DpcAttrs};
use nk::thd::{fiber_create, FiberAttrs};
use nk::{host_create, host_destroy, host_run};

#[test]
fn single_dpc_writes_shared_int() {
    let _ = env_logger::try_init();

    let host = host_create();
    let flag = Arc::new(AtomicI32::new(0));
    let flag2 = flag.clone();
    dpc_create_ext(&host, move |_| flag2.store(42, Ordering::SeqCst), 0, DpcAttrs::default())
        .expect("dpc_create_ext");
    host_run(&host, 4);

    assert_eq!(flag.load(Ordering::SeqCst), 42);
    host_destroy(host);
}

#[test]
fn dpc_spawns_two_fibers() {
    let _ = env_logger::try_init();

    let host = host_create();
    let dpc_ran = Arc::new(AtomicI32::new(0));
    let flag1 = Arc::new(AtomicI32::new(0));
    let flag2 = Arc::new(AtomicI32::new(0));

    let (d, f1, f2) = (dpc_ran.clone(), flag1.clone(), flag2.clone());
    dpc_create_ext(
        &host,
        move |_| {
            fiber_create(move |_| f1.store(1, Ordering::SeqCst), 0, FiberAttrs::default())
                .expect("fiber_create 1");
            fiber_create(move |_| f2.store(1, Ordering::SeqCst), 0, FiberAttrs::default())
                .expect("fiber_create 2");
            d.store(1, Ordering::SeqCst);
        },
        0,
        DpcAttrs::default(),
    )
    .expect("dpc_create_ext");

    host_run(&host, 4);

    assert_eq!(dpc_ran.load(Ordering::SeqCst), 1);
    assert_eq!(flag1.load(Ordering::SeqCst), 1);
    assert_eq!(flag2.load(Ordering::SeqCst), 1);
    host_destroy(host);
}
