//! `trident-kernel` boot binary.
//!
//! Everything except the boot entry point and Multiboot2 plumbing lives
//! in the library crate; this file supplies only what GRUB hands
//! control to directly: the Multiboot2 header, the naked `_start` that
//! captures its two registers, and `bootup()`'s staged initialization.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(trident_kernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::{arch::global_asm, panic::PanicInfo};

use trident_kernel::{
    arch, config, elf, fs,
    fs::file,
    logger, mm, multiboot,
    process::{
        self,
        fd::{FdFlags, FileDescriptor},
    },
    sched, serial, terminal,
};

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log::error!("{}", info);
    arch::x86::halt();
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    trident_kernel::test_panic_handler(info)
}

// GRUB looks for this exact byte pattern within the first 32 KiB of the
// image. `multiboot_header_end - multiboot_header_start` and the
// checksum are computed by the assembler, not hardcoded, so the header
// stays correct if a tag is ever added here.
global_asm!(
    r#"
.section .multiboot_header, "aw"
.align 8
multiboot_header_start:
    .long 0xe85250d6
    .long 0
    .long multiboot_header_end - multiboot_header_start
    .long -(0xe85250d6 + 0 + (multiboot_header_end - multiboot_header_start))
    .word 0
    .word 0
    .long 8
multiboot_header_end:
"#
);

/// GRUB jumps here with `eax` = the multiboot2 magic and `ebx` = the
/// physical address of the multiboot2 info structure, neither pushed
/// per the i686 `cdecl` convention -- so, like `arch::x86::idt`'s
/// `syscall_entry`, this has to be a naked trampoline rather than an
/// ordinary Rust function.
#[unsafe(naked)]
#[no_mangle]
unsafe extern "C" fn _start() {
    core::arch::naked_asm!(
        "push ebx",
        "push eax",
        "call {bootup}",
        bootup = sym bootup,
    );
}

const SHELL_NAME: &[u8] = b"shell";

/// Brings up every subsystem in dependency order, starts the three
/// terminal shells, and falls into the scheduler on the first one. Never
/// returns.
extern "C" fn bootup(magic: u32, info_addr: u32) -> ! {
    serial::init();
    logger::init();
    log::info!(
        "trident-kernel {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    if magic != multiboot::MAGIC {
        panic!(
            "not loaded by a multiboot2-compliant loader (eax={:#010x})",
            magic
        );
    }
    let (fs_start, fs_end) = unsafe { multiboot::find_module(info_addr) }
        .expect("no multiboot module supplied for the file-system image");
    fs::init(fs_start as *const u8, (fs_end - fs_start) as usize);
    log::info!(
        "file-system image: {} bytes at {:#010x}",
        fs_end - fs_start,
        fs_start
    );

    arch::x86::init();

    log::info!("paging: initializing");
    mm::init();
    log::info!("paging: initialized");

    #[cfg(test)]
    test_main();

    let video_frame =
        unsafe { &*(config::VIDEO_MEMORY as *const [u8; config::VIDEO_FRAME_SIZE]) };
    terminal::init_from_physical_frame(video_frame);

    for terminal_id in 0..config::NUM_TERMINALS as u8 {
        boot_shell(terminal_id + 1, terminal_id);
    }
    log::info!(
        "boot shells synthesized on terminals 0..{}",
        config::NUM_TERMINALS
    );

    unsafe {
        arch::x86::disable_interrupts();
    }
    sched::resume(1)
}

fn stream_fd(terminal_id: u8, ops: process::OperationsVector) -> FileDescriptor {
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

/// Loads `shell` into process `pid`'s dedicated 4 MiB image page and
/// builds a kernel stack for it that looks, to the scheduler, exactly
/// like a process suspended mid-tick and about to `iretd` into that
/// image. See `sched::synthesize_boot_stack`.
fn boot_shell(pid: u8, terminal_id: u8) {
    mm::setup_new_task(pid, terminal_id)
        .expect("program-image directory slot available for a boot shell");
    mm::switch_to(pid);

    let dest = unsafe {
        core::slice::from_raw_parts_mut(
            config::PROGRAM_LOAD_ADDR as *mut u8,
            4 * 1024 * 1024 - config::PROGRAM_IMG_FILE_OFFSET,
        )
    };
    let len = fs::load(SHELL_NAME, dest).expect("shell missing from the file-system image");
    let entry = elf::validate(&dest[..len]).expect("shell image is not a valid executable");

    let pcb = process::pcb_mut(pid);
    pcb.pid = pid;
    pcb.parent_pid = 0;
    pcb.terminal_id = terminal_id;
    pcb.has_child = false;
    pcb.fds[0] = stream_fd(terminal_id, file::stdin_ops());
    pcb.fds[1] = stream_fd(terminal_id, file::stdout_ops());

    process::set_live(pid);
    unsafe {
        sched::synthesize_boot_stack(pid, entry);
    }
}
