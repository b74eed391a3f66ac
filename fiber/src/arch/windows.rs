//! Windows backend: the native Fiber API already knows how to manage a
//! stack and its guard page, so this module is mostly glue between that
//! API's void-returning `SwitchToFiber` and the reason-tag-returning
//! [`crate::switch_ctx`] contract the rest of the crate relies on.
//!
//! Modeled on the teacher's `lib/fiber/src/platform/windows.rs`
//! (`ConvertThreadToFiber`/`CreateFiber`/`SwitchToFiber`), ported from
//! `kernel32-sys`/`winapi` to `windows-sys`.

use std::cell::Cell;
use std::ffi::c_void;

use windows_sys::Win32::System::Threading::{
    ConvertThreadToFiber, CreateFiber, SwitchToFiber,
};

use crate::Entry;

// A fiber handle only ever runs on the OS thread that owns it; nothing here
// is shared across threads concurrently.
thread_local! {
    static CURRENT_FIBER: Cell<*mut c_void> = const { Cell::new(std::ptr::null_mut()) };
    static PENDING_REASON: Cell<usize> = const { Cell::new(0) };
}

pub(crate) struct PlatformStack {
    requested_len: usize,
    fiber: Cell<*mut c_void>,
}

unsafe impl Send for PlatformStack {}

impl PlatformStack {
    pub(crate) fn new(len: usize) -> std::io::Result<PlatformStack> {
        Ok(PlatformStack {
            requested_len: len,
            fiber: Cell::new(std::ptr::null_mut()),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.requested_len
    }
}

impl Drop for PlatformStack {
    fn drop(&mut self) {
        let fiber = self.fiber.get();
        if !fiber.is_null() {
            // SAFETY: `fiber` was returned by `CreateFiber` in `create_ctx`
            // and is not the currently running fiber (a schob's stack is
            // only dropped once it has exited or never run).
            unsafe {
                windows_sys::Win32::System::Threading::DeleteFiber(fiber);
            }
        }
    }
}

struct StartParams {
    entry: Entry,
    a: usize,
    b: usize,
    c: usize,
}

unsafe extern "system" fn fiber_trampoline(param: *mut c_void) {
    // SAFETY: `param` was produced from `Box::into_raw` in `create_ctx` and
    // is only ever delivered to this trampoline once.
    let params = unsafe { Box::from_raw(param as *mut StartParams) };
    let StartParams { entry, a, b, c } = *params;
    // SAFETY: `entry` never returns, per its contract.
    unsafe { entry(a, b, c) };
}

pub(crate) unsafe fn create_ctx(
    stack: &PlatformStack,
    entry: Entry,
    a: usize,
    b: usize,
    c: usize,
) -> *mut u8 {
    let params = Box::into_raw(Box::new(StartParams { entry, a, b, c }));
    // SAFETY: `stack.requested_len` is a caller-validated stack size;
    // `fiber_trampoline` matches `LPFIBER_START_ROUTINE`.
    let handle = unsafe {
        CreateFiber(
            stack.requested_len,
            Some(fiber_trampoline),
            params as *mut c_void,
        )
    };
    assert!(!handle.is_null(), "CreateFiber failed");
    stack.fiber.set(handle);
    handle as *mut u8
}

pub(crate) fn init_thread() -> *mut u8 {
    // SAFETY: converts the calling thread into a fiber so it can be a
    // switch target/source; must run once per OS thread before any switch.
    let handle = unsafe { ConvertThreadToFiber(std::ptr::null_mut()) };
    assert!(!handle.is_null(), "ConvertThreadToFiber failed");
    CURRENT_FIBER.with(|c| c.set(handle));
    handle as *mut u8
}

pub(crate) unsafe fn switch_ctx(save_from: *mut *mut u8, to: *mut u8, reason: usize) -> usize {
    // SAFETY: `save_from` is a valid out-pointer per `switch_ctx`'s contract.
    unsafe {
        *save_from = CURRENT_FIBER.with(|c| c.get()) as *mut u8;
    }
    PENDING_REASON.with(|c| c.set(reason));
    CURRENT_FIBER.with(|c| c.set(to as *mut c_void));
    // SAFETY: `to` is a fiber handle previously returned by `create_ctx` or
    // `init_thread`, as required by `switch_ctx`'s contract.
    unsafe {
        SwitchToFiber(to as *mut c_void);
    }
    PENDING_REASON.with(|c| c.get())
}
