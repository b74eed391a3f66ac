//! x86_64 SysV context switch: six callee-saved GPRs plus the return
//! address, symmetric save/restore so the same code path handles both a
//! genuinely suspended stack and a freshly synthesized one.
//!
//! Does not preserve the callee-saved XMM state (there is none in the SysV
//! ABI) — ordinary SysV code never needs it, so this is a non-issue here.

use std::arch::global_asm;

global_asm!(
    ".pushsection .text",
    ".global nk_fiber_switch_x86_64",
    ".align 16",
    "nk_fiber_switch_x86_64:",
    "sub rsp, 48",
    "mov [rsp], rbx",
    "mov [rsp+8], rbp",
    "mov [rsp+16], r12",
    "mov [rsp+24], r13",
    "mov [rsp+32], r14",
    "mov [rsp+40], r15",
    "mov [rdi], rsp",
    "mov rsp, rsi",
    "mov rbx, [rsp]",
    "mov rbp, [rsp+8]",
    "mov r12, [rsp+16]",
    "mov r13, [rsp+24]",
    "mov r14, [rsp+32]",
    "mov r15, [rsp+40]",
    "add rsp, 48",
    "mov rax, rdx",
    "ret",
    ".popsection",
);

global_asm!(
    ".pushsection .text",
    ".global nk_fiber_trampoline_x86_64",
    ".align 16",
    "nk_fiber_trampoline_x86_64:",
    "mov rdi, rbx",
    "mov rsi, rbp",
    "mov rdx, r12",
    "call r13",
    "ud2",
    ".popsection",
);

unsafe extern "C" {
    fn nk_fiber_switch_x86_64(save_from: *mut *mut u8, to: *mut u8, reason: usize) -> usize;
    fn nk_fiber_trampoline_x86_64();
}

/// Memory layout a freshly built stack must have so that
/// `nk_fiber_switch_x86_64`'s restore sequence loads `entry`/`a`/`b`/`c` into
/// registers and returns straight into the trampoline, which forwards them
/// to `entry` as an ordinary SysV call.
#[repr(C)]
struct InitialFrame {
    rbx: u64, // a
    rbp: u64, // b
    r12: u64, // c
    r13: u64, // entry
    r14: u64, // unused
    r15: u64, // unused
    return_addr: u64, // trampoline
}

pub(crate) unsafe fn create_ctx_raw(
    stack_top: *mut u8,
    entry: usize,
    a: usize,
    b: usize,
    c: usize,
) -> *mut u8 {
    let aligned = (stack_top as usize) & !0xf;
    let frame_ptr = (aligned - std::mem::size_of::<InitialFrame>()) as *mut InitialFrame;
    // SAFETY: `frame_ptr` sits within the caller-provided stack, below
    // `aligned`, and is sized and aligned for `InitialFrame`.
    unsafe {
        frame_ptr.write(InitialFrame {
            rbx: a as u64,
            rbp: b as u64,
            r12: c as u64,
            r13: entry as u64,
            r14: 0,
            r15: 0,
            return_addr: nk_fiber_trampoline_x86_64 as usize as u64,
        });
    }
    frame_ptr as *mut u8
}

pub(crate) unsafe fn switch_ctx_raw(save_from: *mut *mut u8, to: *mut u8, reason: usize) -> usize {
    unsafe { nk_fiber_switch_x86_64(save_from, to, reason) }
}
