//! Round-robin scheduler driven by the PIT.
//!
//! Every suspended kernel stack was suspended at exactly the same point
//! -- right after the inline asm that captures ESP/EBP in [`resume`]'s
//! caller -- so restoring a process's saved ESP/EBP and executing
//! `leave; ret` resumes it there, from which it falls straight through to
//! its own IRET back into user mode. The three boot shells start with
//! hand-synthesized stacks built to look as if they had already made that
//! call once; see `synthesize_boot_stack`.

use crate::{
    arch::x86::{gdt, pic, USER_CS, USER_DS},
    config::USER_STACK_TOP,
    mm, process,
};

/// Called from the PIT interrupt handler (vector 0x20) on every tick.
///
/// Finds the next schedulable leaf process after the current one, saves
/// the current process's stack pointers, then switches to it via
/// [`resume`]. If no other leaf process is runnable this returns normally
/// and the caller (the interrupt handler) simply falls through to its own
/// IRET.
#[inline(never)]
pub fn on_tick() {
    let current = process::current_pid();
    let next = match process::next_leaf_after(current) {
        Some(id) => id,
        None => return,
    };

    let (esp, ebp): (u32, u32);
    unsafe {
        core::arch::asm!("mov {0}, esp", out(reg) esp, options(nostack, preserves_flags));
        core::arch::asm!("mov {0}, ebp", out(reg) ebp, options(nostack, preserves_flags));
    }
    let current_pcb = process::current_pcb();
    current_pcb.saved_esp = esp;
    current_pcb.saved_ebp = ebp;

    resume(next);
}

/// Switches address space and `tss.esp0` to `pid`, then restores its
/// saved (ESP, EBP) and executes `leave; ret`. Never returns: this jumps
/// into whatever that process was suspended inside of, or, for a boot
/// shell that has never run yet, into [`bootstrap_trampoline`].
///
/// Relies on `#[inline(never)]` at every call site that captures a
/// (ESP, EBP) pair fed back into this function, plus the platform's
/// standard ebp-based stack frame, so that `leave; ret` unwinds exactly
/// one call level.
pub fn resume(pid: u8) -> ! {
    process::set_current_pid(pid);
    gdt::set_kernel_stack(process::kernel_stack_top(pid) - 4);
    mm::switch_to(pid);

    let pcb = process::pcb_mut(pid);
    let esp = pcb.saved_esp;
    let ebp = pcb.saved_ebp;

    unsafe {
        core::arch::asm!(
            "mov esp, {esp}",
            "mov ebp, {ebp}",
            "leave",
            "ret",
            esp = in(reg) esp,
            ebp = in(reg) ebp,
            options(noreturn),
        );
    }
}

/// Entered via `ret`, never `call`: acknowledges the timer IRQ the
/// synthesized boot stacks pretend to have been suspended inside (a real
/// suspension would have reached this same `iretd` by returning out of
/// `on_tick` into the PIT handler's own epilogue instead), then IRETs
/// through the frame [`synthesize_boot_stack`] builds directly below it
/// on the same stack.
#[unsafe(naked)]
unsafe extern "C" fn bootstrap_trampoline() {
    core::arch::naked_asm!("call {ack}", "iretd", ack = sym ack_pit);
}

extern "C" fn ack_pit() {
    pic::send_eoi(0);
}

unsafe fn write_u32(addr: u32, value: u32) {
    *(addr as *mut u32) = value;
}

/// Builds a kernel stack for `pid` that looks, to [`resume`], exactly
/// like a process that was interrupted by the PIT handler and is about to
/// `iretd` into `entry` at the top of its program-image page. Used once
/// at boot to start the three terminal shells without a real timer tick
/// ever having fired for them.
///
/// # Safety
/// `pid`'s kernel stack must not yet be in use by anything else.
pub unsafe fn synthesize_boot_stack(pid: u8, entry: u32) {
    let stack_top = process::kernel_stack_top(pid);
    let frame_base = stack_top - 20;
    let ebp_synth = frame_base - 8;

    write_u32(ebp_synth, 0);
    write_u32(ebp_synth + 4, bootstrap_trampoline as usize as u32);
    write_u32(frame_base, entry);
    write_u32(frame_base + 4, USER_CS as u32);
    write_u32(frame_base + 8, 0x200); // EFLAGS.IF
    write_u32(frame_base + 12, USER_STACK_TOP);
    write_u32(frame_base + 16, USER_DS as u32);

    let pcb = process::pcb_mut(pid);
    pcb.saved_esp = ebp_synth;
    pcb.saved_ebp = ebp_synth;
}
