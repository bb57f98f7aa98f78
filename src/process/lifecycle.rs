//! `execute` and `halt`: the only two operations that create or destroy
//! a process.
//!
//! Both run on the calling process's own kernel stack and use the same
//! save-stack / switch-directory / restore-stack primitive the
//! scheduler does, just triggered synchronously instead of by a timer
//! tick. `execute` captures its own (ESP, EBP) into the new child's PCB
//! before handing off to it; `halt` later restores them, so `leave; ret`
//! resumes `execute`'s own stack frame with the child's exit status
//! already sitting in eax -- exactly as if `execute` had returned it.

use crate::{
    arch::{
        self,
        x86::{gdt, usermode},
    },
    config::{
        ARG_BUF_LEN, NUM_TERMINALS, PROGRAM_IMG_FILE_OFFSET, PROGRAM_LOAD_ADDR, USER_STACK_TOP,
    },
    elf, fs,
    process::{
        self,
        fd::{FdFlags, FileDescriptor, OperationsVector},
        Pcb,
    },
};

const SHELL_NAME: &[u8] = b"shell";
const PROGRAM_IMAGE_PAGE: usize = 4 * 1024 * 1024;

fn trim(mut s: &[u8]) -> &[u8] {
    while let Some((&b' ', rest)) = s.split_first() {
        s = rest;
    }
    while let Some((&b' ', rest)) = s.split_last() {
        s = rest;
    }
    s
}

/// Splits a shell command line into a program name (<=32 bytes, no
/// embedded space) and the remaining argument bytes.
fn split_command(cmd: &[u8]) -> (&[u8], &[u8]) {
    let cmd = trim(cmd);
    match cmd.iter().position(|&b| b == b' ') {
        Some(i) => (&cmd[..i], trim(&cmd[i + 1..])),
        None => (cmd, &[] as &[u8]),
    }
}

pub(crate) fn stream_fd(ops: OperationsVector, terminal_id: u8) -> FileDescriptor {
    let mut name = [0u8; 32];
    name[0] = terminal_id;
    FileDescriptor {
        ops: Some(ops),
        inode: 0,
        file_offset: 0,
        flags: FdFlags::InUse,
        name,
        name_len: 1,
    }
}

/// Program-image destination slice: the part of the process's 4 MiB
/// image page that follows `PROGRAM_LOAD_ADDR`.
///
/// # Safety
/// The caller must already have switched CR3 to the directory that maps
/// this range (its own, for a root-shell restart, or a freshly built
/// child directory for `execute`).
unsafe fn image_dest() -> &'static mut [u8] {
    core::slice::from_raw_parts_mut(
        PROGRAM_LOAD_ADDR as *mut u8,
        PROGRAM_IMAGE_PAGE - PROGRAM_IMG_FILE_OFFSET,
    )
}

/// Parses the command line, validates the named executable, builds a
/// new process to run it, and switches to it. Returns -1 without
/// disturbing the caller on any failure up to and including a corrupt
/// or missing image; from that point on this function does not return
/// to its own caller at all -- a later `halt` resumes it (see module
/// docs).
#[inline(never)]
pub fn execute(cmd: &[u8]) -> i32 {
    let (parent_esp, parent_ebp): (u32, u32);
    unsafe {
        core::arch::asm!("mov {0}, esp", out(reg) parent_esp, options(nostack, preserves_flags));
        core::arch::asm!("mov {0}, ebp", out(reg) parent_ebp, options(nostack, preserves_flags));
    }

    let (name, args) = split_command(cmd);
    if name.is_empty() || name.len() > 32 {
        return -1;
    }

    let dentry = match fs::read_dentry_by_name(name) {
        Some(d) => d,
        None => return -1,
    };

    let mut header = [0u8; 28];
    let header_len = match fs::read_data(dentry.inode, 0, &mut header) {
        Ok(n) => n,
        Err(_) => return -1,
    };
    let entry = match elf::validate(&header[..header_len]) {
        Some(e) => e,
        None => return -1,
    };

    let pid = match process::alloc_slot() {
        Some(p) => p,
        None => return -1,
    };
    let caller_pid = process::current_pid();
    let caller_terminal = process::current_pcb().terminal_id;
    if crate::mm::setup_new_task(pid, caller_terminal).is_err() {
        return -1;
    }

    // Safe to switch now: the kernel's own 4 MiB mapping (directory
    // entry 1) is global and identical in every directory, so code
    // running out of it keeps executing the same instructions.
    crate::mm::switch_to(pid);

    let dest = unsafe { image_dest() };
    if fs::load(name, dest).is_err() {
        crate::mm::switch_to(caller_pid);
        return -1;
    }

    let pcb = process::pcb_mut(pid);
    *pcb = Pcb::empty();
    pcb.pid = pid;
    pcb.parent_pid = caller_pid;
    pcb.terminal_id = caller_terminal;
    pcb.parent_esp = parent_esp;
    pcb.parent_ebp = parent_ebp;
    pcb.has_child = false;
    pcb.fds[0] = stream_fd(fs::file::stdin_ops(), caller_terminal);
    pcb.fds[1] = stream_fd(fs::file::stdout_ops(), caller_terminal);

    let arg_len = args.len().min(ARG_BUF_LEN - 1);
    pcb.argbuf[..arg_len].copy_from_slice(&args[..arg_len]);
    pcb.arg_len = arg_len as u8;

    process::pcb_mut(caller_pid).has_child = true;

    unsafe {
        arch::x86::disable_interrupts();
    }
    process::set_live(pid);
    process::set_current_pid(pid);
    gdt::set_kernel_stack(process::kernel_stack_top(pid) - 4);

    unsafe { usermode::enter_usermode(entry, USER_STACK_TOP) }
}

/// Terminates the calling process with `status`, handing control back
/// to its parent. Never returns to its own caller in the Rust sense:
/// either it jumps back into the parent's suspended `execute` call (see
/// module docs), or, for a root shell, straight into a freshly loaded
/// `shell` image on the same process id.
#[inline(never)]
pub fn halt(status: u8) -> ! {
    let pid = process::current_pid();
    let pcb = process::current_pcb();

    for fd in pcb.fds.iter_mut() {
        if !fd.is_free() {
            let _ = fs::file::close(fd);
        }
    }

    if pcb.parent_pid == 0 {
        restart_root_shell(pid);
    }

    let parent_pid = pcb.parent_pid;
    let parent_esp = pcb.parent_esp;
    let parent_ebp = pcb.parent_ebp;

    unsafe {
        arch::x86::disable_interrupts();
    }
    process::clear_live(pid);
    process::pcb_mut(parent_pid).has_child = false;
    process::set_current_pid(parent_pid);
    gdt::set_kernel_stack(process::kernel_stack_top(parent_pid) - 4);
    crate::mm::switch_to(parent_pid);

    unsafe {
        core::arch::asm!(
            "mov esp, {esp}",
            "mov ebp, {ebp}",
            "mov eax, {status:e}",
            "leave",
            "ret",
            esp = in(reg) parent_esp,
            ebp = in(reg) parent_ebp,
            status = in(reg) status as u32,
            options(noreturn),
        );
    }
}

/// A root shell (parent-id 0) has no parent to resume; the kernel just
/// reloads `shell` into the same slot and re-enters it. Its page
/// directory and kernel stack are the ones `bootup` synthesized and are
/// never touched by anything else, so reusing them without rebuilding
/// is sound only for these three ids.
fn restart_root_shell(pid: u8) -> ! {
    debug_assert!(
        pid >= 1 && (pid as usize) <= NUM_TERMINALS,
        "only the boot shells have parent_pid 0"
    );

    let terminal_id = process::pcb_mut(pid).terminal_id;
    let pcb = process::pcb_mut(pid);
    *pcb = Pcb::empty();
    pcb.pid = pid;
    pcb.parent_pid = 0;
    pcb.terminal_id = terminal_id;
    pcb.fds[0] = stream_fd(fs::file::stdin_ops(), terminal_id);
    pcb.fds[1] = stream_fd(fs::file::stdout_ops(), terminal_id);

    let dest = unsafe { image_dest() };
    let len = fs::load(SHELL_NAME, dest).expect("boot shell image missing from fs image");
    let entry = elf::validate(&dest[..len]).expect("boot shell image is not a valid executable");

    unsafe {
        arch::x86::disable_interrupts();
        usermode::enter_usermode(entry, USER_STACK_TOP)
    }
}
