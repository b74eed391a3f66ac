//! Mirrors `examples/original_source/test/test_sync.c`'s mutex and barrier
//! scenarios.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use nk::sync::{
    barrier_create, barrier_destroy, barrier_wait, mutex_create, mutex_destroy, mutex_lock,
    mutex_unlock,
};
use nk::thd::{fiber_create_ext, fiber_yield, FiberAttrs};
use nk::{host_create, host_destroy, host_run};

/// Ten fibers each increment a shared counter 1,000 times under a mutex,
/// yielding between the read and the write to maximize interleaving. The
/// mutex must make the final total exact despite the yield.
#[test]
fn mutex_serializes_concurrent_increments() {
    let _ = env_logger::try_init();

    let host = host_create();
    let mutex = mutex_create(&host);
    let counter = Arc::new(AtomicI32::new(0));

    for _ in 0..10 {
        let (mutex, counter) = (mutex.clone(), counter.clone());
        fiber_create_ext(
            &host,
            move |_| {
                for _ in 0..1000 {
                    mutex_lock(&mutex);
                    let v = counter.load(Ordering::SeqCst);
                    fiber_yield();
                    counter.store(v + 1, Ordering::SeqCst);
                    mutex_unlock(&mutex);
                }
            },
            0,
            FiberAttrs::default(),
        )
        .expect("fiber");
    }

    host_run(&host, 10);

    assert_eq!(counter.load(Ordering::SeqCst), 10_000);
    mutex_destroy(mutex);
    host_destroy(host);
}

/// One hundred worker fibers plus one master fiber run 100 phases: workers
/// increment a shared counter (under a mutex) between two barriers; the
/// master checks that all 100 workers had arrived by the time it crosses the
/// second barrier, then the counter resets for the next phase.
#[test]
fn barrier_synchronizes_phases() {
    let _ = env_logger::try_init();

    const THD_COUNT: usize = 100;
    const ITERS: usize = 100;

    let host = host_create();
    let mutex = mutex_create(&host);
    let b1 = barrier_create(&host, THD_COUNT + 1);
    let b2 = barrier_create(&host, THD_COUNT + 1);
    let done_count = Arc::new(AtomicI32::new(0));
    let ok_iters = Arc::new(AtomicI32::new(0));

    for _ in 0..THD_COUNT {
        let (mutex, b1, b2, done_count) =
            (mutex.clone(), b1.clone(), b2.clone(), done_count.clone());
        fiber_create_ext(
            &host,
            move |_| {
                for _ in 0..ITERS {
                    barrier_wait(&b1);
                    mutex_lock(&mutex);
                    done_count.fetch_add(1, Ordering::SeqCst);
                    mutex_unlock(&mutex);
                    barrier_wait(&b2);
                }
            },
            0,
            FiberAttrs::default(),
        )
        .expect("worker fiber");
    }

    {
        let (b1, b2, done_count, ok_iters) =
            (b1.clone(), b2.clone(), done_count.clone(), ok_iters.clone());
        fiber_create_ext(
            &host,
            move |_| {
                for _ in 0..ITERS {
                    barrier_wait(&b1);
                    barrier_wait(&b2);
                    if done_count.load(Ordering::SeqCst) == THD_COUNT as i32 {
                        ok_iters.fetch_add(1, Ordering::SeqCst);
                    }
                    done_count.store(0, Ordering::SeqCst);
                }
            },
            0,
            FiberAttrs::default(),
        )
        .expect("master fiber");
    }

    host_run(&host, 100);

    assert_eq!(ok_iters.load(Ordering::SeqCst), ITERS as i32);
    barrier_destroy(b2);
    barrier_destroy(b1);
    mutex_destroy(mutex);
    host_destroy(host);
}
