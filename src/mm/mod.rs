//! Page directories and tables.
//!
//! One page directory per process slot plus the kernel's own initial
//! directory at index 0. Every directory shares entry 0 (a 4 KiB page
//! table covering the first 4 MiB, the video frame among its pages) and
//! entry 1 (a global 4 MiB page mapping the kernel itself); the
//! program-image entry at virtual 128 MiB and the `vidmap` entry (pointing
//! at the owning process's own terminal back-buffer page) both differ
//! between processes.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::{
    config::{
        KERNEL_PAGE_ENTRY, MAX_PROCESSES, NUM_TERMINALS, PROGRAM_IMG_ENTRY, TERM_BUFFER_ENTRY,
        VIDEO_PAGE_TABLE_ENTRY,
    },
    error::{KernelError, KernelResult, SyscallError},
    terminal,
};

const ENTRIES: usize = 1024;

/// A present, 4 KiB page-table entry pointing at physical frame `frame`.
fn kb_page_entry(frame: u32, user: bool) -> u32 {
    let mut entry = (frame << 12) | 0x01; // present
    entry |= 0x02; // read/write
    if user {
        entry |= 0x04;
    }
    if frame == 0 {
        entry &= !0x01; // page 0 stays absent, matching the original driver
    }
    entry
}

/// A present, 4 MiB (PSE) page-directory entry for physical frame number
/// `frame_number` (frame_number * 4 MiB is the physical base).
fn mb_dir_entry(frame_number: u32, user: bool, global: bool) -> u32 {
    let mut entry = (frame_number << 22) | 0x01 | 0x02 | 0x80; // present, rw, page_size=1
    if user {
        entry |= 0x04;
    }
    if global {
        entry |= 0x100;
    }
    entry
}

/// A present page-directory entry pointing at a 4 KiB page table.
fn kb_dir_entry(table_addr: u32, user: bool) -> u32 {
    let mut entry = (table_addr & 0xFFFF_F000) | 0x01 | 0x02;
    if user {
        entry |= 0x04;
    }
    entry
}

#[repr(align(4096))]
struct PageTable([u32; ENTRIES]);

#[repr(align(4096))]
struct PageDirectory([u32; ENTRIES]);

static mut KERNEL_PAGE_TABLE: PageTable = PageTable([0; ENTRIES]);
static mut USER_PAGE_TABLES: [PageTable; MAX_PROCESSES + 1] =
    [const { PageTable([0; ENTRIES]) }; MAX_PROCESSES + 1];
static mut DIRECTORIES: [PageDirectory; MAX_PROCESSES + 1] =
    [const { PageDirectory([0; ENTRIES]) }; MAX_PROCESSES + 1];

/// One single-entry page table per terminal, each mapping `TERM_BUFFER_ENTRY`'s
/// virtual page to that terminal's own back-buffer frame. Installed into a
/// process's directory at `setup_new_task` time according to its
/// `terminal_id`, so `vidmap` can hand back a fixed virtual address that
/// resolves to a different, isolated physical page per terminal.
static mut VIDMAP_PAGE_TABLES: [PageTable; NUM_TERMINALS] =
    [const { PageTable([0; ENTRIES]) }; NUM_TERMINALS];

static CURRENT_DIRECTORY: AtomicU32 = AtomicU32::new(0);

fn fill_identity_table(table: &mut PageTable, user: bool) {
    for (i, entry) in table.0.iter_mut().enumerate() {
        *entry = kb_page_entry(i as u32, user);
    }
}

/// Builds the kernel's own directory (slot 0, supervisor-only) and loads
/// it, enabling PSE then paging. Called once at boot before any process
/// directory is built.
pub fn init() {
    unsafe {
        fill_identity_table(&mut KERNEL_PAGE_TABLE, false);

        for id in 0..NUM_TERMINALS {
            let frame = terminal::back_buffer_physical_addr(id) >> 12;
            VIDMAP_PAGE_TABLES[id].0[0] = kb_page_entry(frame, true);
        }

        let dir = &mut DIRECTORIES[0];
        dir.0[VIDEO_PAGE_TABLE_ENTRY] =
            kb_dir_entry(KERNEL_PAGE_TABLE.0.as_ptr() as u32, false);
        dir.0[KERNEL_PAGE_ENTRY] = mb_dir_entry(1, false, true);
        for entry in dir.0.iter_mut().skip(2) {
            *entry = 0;
        }

        load_directory(0, dir.0.as_ptr() as u32);
        enable_paging();
    }
}

/// Builds the page directory for process slot `pid`: a user-accessible
/// identity page table for the first 4 MiB (so the video frame is
/// reachable from user mode), the shared kernel 4 MiB mapping, a
/// dedicated 4 MiB program-image frame at virtual 128 MiB, and (keyed by
/// `terminal_id`) the one-page mapping `vidmap` hands back.
pub fn setup_new_task(pid: u8, terminal_id: u8) -> KernelResult<()> {
    if pid as usize > MAX_PROCESSES || terminal_id as usize >= NUM_TERMINALS {
        return Err(KernelError::Syscall(SyscallError::InvalidArgument));
    }
    unsafe {
        let table = &mut USER_PAGE_TABLES[pid as usize];
        fill_identity_table(table, true);

        let dir = &mut DIRECTORIES[pid as usize];
        dir.0[VIDEO_PAGE_TABLE_ENTRY] = kb_dir_entry(table.0.as_ptr() as u32, true);
        dir.0[KERNEL_PAGE_ENTRY] = mb_dir_entry(1, false, true);
        dir.0[PROGRAM_IMG_ENTRY] = mb_dir_entry(pid as u32 + 1, true, false);
        dir.0[TERM_BUFFER_ENTRY] = kb_dir_entry(
            VIDMAP_PAGE_TABLES[terminal_id as usize].0.as_ptr() as u32,
            true,
        );
    }
    Ok(())
}

/// Switches CR3 to process `pid`'s directory, preserving PSE/paging in
/// CR4/CR0 (they are set once in `init` and never cleared).
pub fn switch_to(pid: u8) {
    unsafe {
        let addr = DIRECTORIES[pid as usize].0.as_ptr() as u32;
        load_directory(pid as u32, addr);
    }
}

unsafe fn load_directory(id: u32, phys_addr: u32) {
    CURRENT_DIRECTORY.store(id, Ordering::Release);
    core::arch::asm!("mov cr3, {0}", in(reg) phys_addr, options(nostack, preserves_flags));
}

unsafe fn enable_paging() {
    core::arch::asm!(
        "mov eax, cr4",
        "or eax, 0x10", // PSE
        "mov cr4, eax",
        "mov eax, cr0",
        "or eax, 0x80000000", // PG
        "mov cr0, eax",
        out("eax") _,
        options(nostack, preserves_flags),
    );
}

/// Physical base address of process slot `pid`'s dedicated program-image
/// frame (`(pid + 1) * 4 MiB`) -- where the loader copies the file image.
pub fn program_frame_base(pid: u8) -> u32 {
    (pid as u32 + 1) * 4 * 1024 * 1024
}
