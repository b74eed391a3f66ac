use std::sync::atomic::{AtomicUsize, Ordering};

use fiber::{create_ctx, init_thread, switch_ctx, Stack, YieldReason};

static SEEN: AtomicUsize = AtomicUsize::new(0);
static mut HOST_SLOT: *mut u8 = std::ptr::null_mut();

unsafe extern "C" fn adder(a: usize, b: usize, c: usize) -> ! {
    SEEN.store(a + b + c, Ordering::SeqCst);
    let mut me = std::ptr::null_mut();
    // SAFETY: `HOST_SLOT` was set by `init_thread` on this same OS thread
    // before the context was created, and this entry runs on that thread.
    unsafe {
        switch_ctx(&mut me, HOST_SLOT, YieldReason::Zombie);
    }
    unreachable!("switching to a dead host stack");
}

#[test]
fn basic_usage() {
    let stack = Stack::new(fiber::MIN_STACK_SIZE).expect("stack allocation");
    let host = init_thread();
    // SAFETY: single-threaded test; `HOST_SLOT` is only touched here and by
    // `adder`, which runs strictly after this write and before the test
    // thread reads `SEEN`.
    unsafe {
        HOST_SLOT = host;
    }

    // SAFETY: `adder` never returns; it switches away with `Zombie`.
    let ctx = unsafe { create_ctx(&stack, adder, 1, 2, 3) };

    let mut save = host;
    // SAFETY: `ctx` was just created by `create_ctx`, has not run yet, and
    // is not active on any other thread.
    let reason = unsafe { switch_ctx(&mut save, ctx, YieldReason::Ready) };

    assert_eq!(reason, YieldReason::Zombie);
    assert_eq!(SEEN.load(Ordering::SeqCst), 6);
}
