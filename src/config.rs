//! Kernel-wide layout constants.
//!
//! Centralizes the magic numbers spec'd by the original ABI (kernel stack
//! layout, program load address, tick rates) instead of scattering them
//! across the modules that consume them.

/// Number of concurrent user process slots, plus the sentinel at id 0.
pub const MAX_PROCESSES: usize = 7;

/// Total kernel stack / PCB arena size: 8 MiB.
pub const KERNEL_STACK_ARENA: usize = 8 * 1024 * 1024;

/// Per-process kernel stack size: 8 KiB. The PCB lives at the base
/// (lowest address) of this stack.
pub const KERNEL_STACK_SIZE: usize = 8 * 1024;

/// Number of file descriptors per process.
pub const MAX_OPEN_FILES: usize = 8;

/// Length of a process's argument buffer.
pub const ARG_BUF_LEN: usize = 100;

/// Number of virtual terminals.
pub const NUM_TERMINALS: usize = 3;

/// Virtual address at which a program image is mapped and executed.
pub const PROGRAM_LOAD_ADDR: u32 = 0x0804_8000;

/// File offset of the 4-byte little-endian entry point in an executable.
pub const ENTRY_POINT_OFFSET: usize = 24;

/// Offset within the process's 4 MiB image page at which the loader
/// places the file contents copied from `PROGRAM_LOAD_ADDR`'s backing page.
pub const PROGRAM_IMG_FILE_OFFSET: usize = 0x4_8000;

/// Page-directory index covering virtual address 128 MiB, where each
/// process's 4 MiB program image is mapped.
pub const PROGRAM_IMG_ENTRY: usize = 32;

/// Initial user ESP: top of the program-image page, growing down into
/// the same 4 MiB mapping the image is loaded into.
pub const USER_STACK_TOP: u32 = 0x0840_0000 - 4;

/// Page-directory index covering the first 4 MiB (video + low memory).
pub const VIDEO_PAGE_TABLE_ENTRY: usize = 0;

/// Page-directory index covering the 4 MiB kernel mapping at virtual 4 MiB.
pub const KERNEL_PAGE_ENTRY: usize = 1;

/// Page-directory index used for `vidmap`'s mapping of the caller's own
/// terminal back-buffer page. Distinct from the kernel entry so only that
/// one page, not the whole kernel image, is exposed to user mode.
pub const TERM_BUFFER_ENTRY: usize = 2;

/// Virtual address `vidmap` hands back: the base of `TERM_BUFFER_ENTRY`'s
/// 4 MiB region, where the caller's own terminal back-buffer page is
/// mapped by `mm::setup_new_task`.
pub const TERM_BUFFER_VADDR: u32 = (TERM_BUFFER_ENTRY as u32) * 4 * 1024 * 1024;

/// Physical address of the VGA text-mode frame buffer.
pub const VIDEO_MEMORY: u32 = 0xB_8000;

/// Size in bytes of one 80x25x2 text-mode frame.
pub const VIDEO_FRAME_SIZE: usize = 80 * 25 * 2;

/// Command buffer capacity per terminal (the spec caps content at 1023
/// characters plus the trailing byte reserved for newline/NUL).
pub const COMMAND_BUF_LEN: usize = 1024;

/// PIT interrupt rate driving the scheduler, in Hz.
pub const PIT_HZ: u32 = 33;

/// RTC interrupt rate driving the video mirror, in Hz.
pub const RTC_HZ: u32 = 32;

/// PIT base oscillator frequency.
pub const PIT_BASE_HZ: u32 = 1_193_180;
