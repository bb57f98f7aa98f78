//! Ring0 -> ring3 transition.
//!
//! `enter_usermode` builds an IRET frame on the current stack and never
//! returns to its caller: control resumes, if ever, only through a later
//! interrupt into the process it just started.

use core::arch::asm;

use super::{USER_CS, USER_DS};

/// Transfers control to `entry_point` in ring 3, running on `user_stack`.
///
/// # Safety
/// `entry_point` must be a valid, executable, user-mapped address and
/// `user_stack` a valid, mapped, user-writable stack top in the
/// currently-loaded page directory. Interrupts are enabled (`EFLAGS.IF`)
/// in the pushed frame, matching user-mode's expectation of preemption.
pub unsafe fn enter_usermode(entry_point: u32, user_stack: u32) -> ! {
    const EFLAGS_IF: u32 = 0x200;
    asm!(
        "mov ax, {ds:x}",
        "mov ds, ax",
        "mov es, ax",
        "mov fs, ax",
        "mov gs, ax",
        "push {ds:e}",
        "push {esp}",
        "push {eflags}",
        "push {cs:e}",
        "push {eip}",
        "iretd",
        ds = in(reg) USER_DS as u32,
        esp = in(reg) user_stack,
        eflags = in(reg) EFLAGS_IF,
        cs = in(reg) USER_CS as u32,
        eip = in(reg) entry_point,
        options(noreturn)
    );
}
