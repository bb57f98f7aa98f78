//! Process Control Blocks, the kernel-stack arena they live at the base
//! of, and the running-set bitmap that tracks which process ids are live.

pub mod fd;
pub mod lifecycle;

use core::sync::atomic::{AtomicU8, Ordering};

use fd::FileDescriptor;

use crate::config::{ARG_BUF_LEN, KERNEL_STACK_SIZE, MAX_OPEN_FILES, MAX_PROCESSES};

pub use fd::OperationsVector;
pub use lifecycle::{execute, halt};
pub(crate) use lifecycle::stream_fd;

/// Process Control Block. Placed at the base (lowest address) of its
/// kernel stack so that `current_pid()` plus a stack-slot lookup recovers
/// it without needing to mask the live stack pointer.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct Pcb {
    pub fds: [FileDescriptor; MAX_OPEN_FILES],
    pub parent_esp: u32,
    pub parent_ebp: u32,
    pub saved_esp: u32,
    pub saved_ebp: u32,
    pub pid: u8,
    pub parent_pid: u8,
    pub terminal_id: u8,
    pub has_child: bool,
    pub argbuf: [u8; ARG_BUF_LEN],
    pub arg_len: u8,
}

impl Pcb {
    pub const fn empty() -> Self {
        Self {
            fds: [FileDescriptor::empty(); MAX_OPEN_FILES],
            parent_esp: 0,
            parent_ebp: 0,
            saved_esp: 0,
            saved_ebp: 0,
            pid: 0,
            parent_pid: 0,
            terminal_id: 0,
            has_child: false,
            argbuf: [0; ARG_BUF_LEN],
            arg_len: 0,
        }
    }
}

#[repr(C, align(4096))]
#[derive(Clone, Copy)]
struct KernelStackSlot {
    pcb: Pcb,
    _stack: [u8; KERNEL_STACK_SIZE - core::mem::size_of::<Pcb>()],
}

impl KernelStackSlot {
    const fn empty() -> Self {
        Self {
            pcb: Pcb::empty(),
            _stack: [0; KERNEL_STACK_SIZE - core::mem::size_of::<Pcb>()],
        }
    }
}

/// One slot per process id, 0..=MAX_PROCESSES. Slot 0 is reserved for the
/// sentinel and never holds a real PCB.
static mut STACKS: [KernelStackSlot; MAX_PROCESSES + 1] =
    [KernelStackSlot::empty(); MAX_PROCESSES + 1];

/// Running-set bitmap. Bit `7 - id` is set iff process id is live; bit 7
/// (id 0, the sentinel) is always set.
static RUNNING: AtomicU8 = AtomicU8::new(0x80);

static CURRENT: AtomicU8 = AtomicU8::new(1);

fn bit_for(id: u8) -> u8 {
    0x80u8 >> id
}

pub fn is_live(id: u8) -> bool {
    RUNNING.load(Ordering::Acquire) & bit_for(id) != 0
}

pub fn set_live(id: u8) {
    RUNNING.fetch_or(bit_for(id), Ordering::AcqRel);
}

pub fn clear_live(id: u8) {
    RUNNING.fetch_and(!bit_for(id), Ordering::AcqRel);
}

pub fn current_pid() -> u8 {
    CURRENT.load(Ordering::Acquire)
}

pub fn set_current_pid(id: u8) {
    CURRENT.store(id, Ordering::Release);
}

/// Mutable access to the PCB of a given process id. `id` must be in
/// `[1, MAX_PROCESSES]`; the sentinel slot is never handed out.
pub fn pcb_mut(id: u8) -> &'static mut Pcb {
    debug_assert!(id >= 1 && id as usize <= MAX_PROCESSES);
    unsafe { &mut (*core::ptr::addr_of_mut!(STACKS[id as usize])).pcb }
}

pub fn current_pcb() -> &'static mut Pcb {
    pcb_mut(current_pid())
}

/// Top of the kernel stack for `id` — the value `tss.esp0` must hold
/// while that process runs, and where the scheduler synthesizes or
/// restores a suspended (ESP, EBP) pair.
pub fn kernel_stack_top(id: u8) -> u32 {
    debug_assert!(id >= 1 && id as usize <= MAX_PROCESSES);
    unsafe {
        let slot = core::ptr::addr_of!(STACKS[id as usize]);
        slot as u32 + KERNEL_STACK_SIZE as u32 - 4
    }
}

/// Lowest process id (1..=MAX_PROCESSES) whose running-set bit is clear.
pub fn alloc_slot() -> Option<u8> {
    for id in 1..=MAX_PROCESSES as u8 {
        if !is_live(id) {
            return Some(id);
        }
    }
    None
}

/// Lowest process id whose running-set bit is set, id != 0, and whose
/// `has_child` flag is false — a schedulable leaf process. Search starts
/// at `(after + 1) mod (MAX_PROCESSES + 1)` and wraps circularly, per the
/// scheduler's tie-break rule (lowest id after the circular search wins).
pub fn next_leaf_after(after: u8) -> Option<u8> {
    let n = (MAX_PROCESSES + 1) as u8;
    let mut candidate = (after + 1) % n;
    while candidate != after {
        if candidate != 0 && is_live(candidate) && !pcb_mut(candidate).has_child {
            return Some(candidate);
        }
        candidate = (candidate + 1) % n;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_for_matches_original_encoding() {
        assert_eq!(bit_for(0), 0x80);
        assert_eq!(bit_for(1), 0x40);
        assert_eq!(bit_for(7), 0x01);
    }

    #[test]
    fn sentinel_is_always_live() {
        assert!(is_live(0));
    }
}
