//! Unix backend: a plain `mmap`-backed stack with a guard page at the low
//! end, and a hand-rolled callee-saved-register context switch.
//!
//! Mirrors the stack allocation in `examples/original_source/src/thd.c`
//! (`mmap` + `mprotect` of the first page), adapted to `rustix` the way
//! `wasmtime-internal-fiber`'s `cfg(unix)` dependency set does.

use std::io;
use std::ptr::NonNull;

use rustix::mm::{MapFlags, MprotectFlags, ProtFlags};

use crate::Entry;

pub(crate) struct PlatformStack {
    base: NonNull<u8>,
    map_len: usize,
}

// SAFETY: the mapping is only ever read/written through raw pointers handed
// to a context switch; ownership transfers cleanly across threads the same
// way a fiber itself does.
unsafe impl Send for PlatformStack {}

const GUARD_LEN: usize = 4096;

impl PlatformStack {
    pub(crate) fn new(len: usize) -> io::Result<PlatformStack> {
        let page = GUARD_LEN;
        let usable = len.div_ceil(page) * page;
        let map_len = usable + GUARD_LEN;

        // SAFETY: fixed-size anonymous, non-file-backed mapping.
        let base = unsafe {
            rustix::mm::mmap_anonymous(
                std::ptr::null_mut(),
                map_len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::PRIVATE,
            )
        }
        .map_err(io::Error::from)?;

        // SAFETY: `base` is a fresh mapping of at least `GUARD_LEN` bytes.
        unsafe {
            rustix::mm::mprotect(base, GUARD_LEN, MprotectFlags::empty())
        }
        .map_err(io::Error::from)?;

        Ok(PlatformStack {
            base: NonNull::new(base.cast()).expect("mmap returned null on success"),
            map_len,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.map_len - GUARD_LEN
    }

    fn top(&self) -> *mut u8 {
        // SAFETY: within the mapped region.
        unsafe { self.base.as_ptr().add(self.map_len) }
    }
}

impl Drop for PlatformStack {
    fn drop(&mut self) {
        // SAFETY: `base`/`map_len` describe exactly the mapping created in `new`.
        unsafe {
            let _ = rustix::mm::munmap(self.base.as_ptr().cast(), self.map_len);
        }
    }
}

pub(crate) unsafe fn create_ctx(
    stack: &PlatformStack,
    entry: Entry,
    a: usize,
    b: usize,
    c: usize,
) -> *mut u8 {
    unsafe { super::create_ctx_raw(stack.top(), entry as usize, a, b, c) }
}

pub(crate) fn init_thread() -> *mut u8 {
    std::ptr::null_mut()
}

pub(crate) unsafe fn switch_ctx(save_from: *mut *mut u8, to: *mut u8, reason: usize) -> usize {
    unsafe { super::switch_ctx_raw(save_from, to, reason) }
}
