//! Global Descriptor Table and Task State Segment.
//!
//! A flat GDT: one non-conforming code and one read/write data segment
//! per privilege level, plus the TSS. `tss.esp0` is the kernel stack the
//! CPU loads on every ring3->ring0 transition (interrupt, exception, or
//! `int 0x80`); the scheduler rewrites it on every context switch.

use core::mem::size_of;

use lazy_static::lazy_static;
use x86::{
    dtables::{lgdt, DescriptorTablePointer},
    segmentation::SegmentSelector,
    Ring,
};

const NUM_GDT_ENTRIES: usize = 6;

/// Raw 8-byte GDT descriptor, built by hand rather than through a crate
/// builder: a flat 32-bit kernel only ever needs a handful of fixed flat
/// segments, so the field layout is simpler to see written out directly.
#[derive(Clone, Copy)]
#[repr(transparent)]
struct RawDescriptor(u64);

impl RawDescriptor {
    const fn null() -> Self {
        Self(0)
    }

    /// A flat (base 0, limit 4 GiB) code or data segment.
    const fn flat(executable: bool, writable_or_readable: bool, dpl: u8) -> Self {
        let limit_low = 0xFFFFu64;
        let limit_high = 0xFu64;
        let access = 0x90u64 // present, S=1 (code/data)
            | ((dpl as u64) << 5)
            | if executable { 0x08 } else { 0 }
            | if writable_or_readable { 0x02 } else { 0 };
        let flags = 0xCu64; // granularity=4K, 32-bit
        Self(
            limit_low
                | (access << 40)
                | (limit_high << 48)
                | (flags << 52)
                | (0xFF << 56), // base bits 24..31 = 0, kept 0
        )
    }

    const fn tss(base: u32, limit: u32) -> Self {
        let access = 0x89u64; // present, DPL0, 32-bit TSS (available)
        Self(
            (limit as u64 & 0xFFFF)
                | ((base as u64 & 0xFFFFFF) << 16)
                | (access << 40)
                | (((limit as u64 >> 16) & 0xF) << 48)
                | ((base as u64 >> 24) << 56),
        )
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TaskStateSegment {
    prev_task: u16,
    _res0: u16,
    pub esp0: u32,
    pub ss0: u16,
    _res1: u16,
    esp1: u32,
    ss1: u16,
    _res2: u16,
    esp2: u32,
    ss2: u16,
    _res3: u16,
    cr3: u32,
    eip: u32,
    eflags: u32,
    eax: u32,
    ecx: u32,
    edx: u32,
    ebx: u32,
    esp: u32,
    ebp: u32,
    esi: u32,
    edi: u32,
    es: u16,
    _res4: u16,
    cs: u16,
    _res5: u16,
    ss: u16,
    _res6: u16,
    ds: u16,
    _res7: u16,
    fs: u16,
    _res8: u16,
    gs: u16,
    _res9: u16,
    ldt: u16,
    _res10: u16,
    trap: u16,
    iomap_base: u16,
}

impl TaskStateSegment {
    const fn new() -> Self {
        // SAFETY: a TSS of all-zero fields is valid; only esp0/ss0 and
        // iomap_base are meaningful for our ring0<->ring3 use.
        unsafe { core::mem::zeroed() }
    }
}

pub const KERNEL_CS: SegmentSelector = SegmentSelector::new(1, Ring::Ring0);
pub const KERNEL_DS: SegmentSelector = SegmentSelector::new(2, Ring::Ring0);
pub const TSS_SELECTOR: SegmentSelector = SegmentSelector::new(3, Ring::Ring0);
pub const USER_DS: SegmentSelector = SegmentSelector::new(4, Ring::Ring3);
pub const USER_CS: SegmentSelector = SegmentSelector::new(5, Ring::Ring3);

// A bare static, not a `Mutex<TaskStateSegment>`: the GDT's TSS descriptor
// must point at the `TaskStateSegment` itself, and a lock wrapper would
// put its own lock word and padding in front of it.
static mut TSS: TaskStateSegment = TaskStateSegment::new();

lazy_static! {
    static ref GDT: [RawDescriptor; NUM_GDT_ENTRIES] = {
        let tss_addr = unsafe { core::ptr::addr_of!(TSS) } as u32;
        [
            RawDescriptor::null(),
            RawDescriptor::flat(true, true, 0),  // 0x08 kernel code
            RawDescriptor::flat(false, true, 0), // 0x10 kernel data
            RawDescriptor::tss(tss_addr, size_of::<TaskStateSegment>() as u32 - 1), // 0x18
            RawDescriptor::flat(false, true, 3), // 0x20(+3) user data
            RawDescriptor::flat(true, true, 3),  // 0x28(+3) user code
        ]
    };
}

pub fn init() {
    let ptr = DescriptorTablePointer::new_from_slice(&*GDT);
    unsafe {
        lgdt(&ptr);
        x86::segmentation::load_cs(KERNEL_CS);
        x86::segmentation::load_ds(KERNEL_DS);
        x86::segmentation::load_es(KERNEL_DS);
        x86::segmentation::load_ss(KERNEL_DS);
        x86::task::load_tr(TSS_SELECTOR);
    }
}

/// Rewrites `tss.esp0`: the stack the CPU switches to on the next
/// ring3->ring0 transition. Called by the scheduler immediately before
/// resuming a process, and by `execute` before the first IRET into it.
pub fn set_kernel_stack(esp0: u32) {
    unsafe {
        TSS.esp0 = esp0;
    }
}
