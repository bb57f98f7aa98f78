//! Interrupt Descriptor Table.
//!
//! Exception vectors 0x00-0x13 report the fault and halt. 0x20 (PIT),
//! 0x21 (keyboard), and 0x28 (RTC) route to their device handlers. 0x80
//! is a trap gate with DPL=3 so user-mode `int 0x80` can reach the
//! syscall dispatcher without a general protection fault.

use core::mem::size_of;

use log::{debug, error};
use x86::dtables::{lidt, DescriptorTablePointer};

use crate::error::KernelError;

const NUM_VECTORS: usize = 256;
const GATE_INTERRUPT32: u8 = 0x0E;
const GATE_TRAP32: u8 = 0x0F;

#[derive(Clone, Copy)]
#[repr(C, packed)]
struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl GateDescriptor {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    fn new(handler: u32, gate_type: u8, dpl: u8) -> Self {
        Self {
            offset_low: handler as u16,
            selector: super::gdt::KERNEL_CS.bits(),
            zero: 0,
            type_attr: 0x80 | (dpl << 5) | gate_type,
            offset_high: (handler >> 16) as u16,
        }
    }
}

static mut IDT: [GateDescriptor; NUM_VECTORS] = [GateDescriptor::missing(); NUM_VECTORS];

extern "x86-interrupt" fn divide_by_zero() {
    report_fatal("divide-by-zero", 0x00);
}
extern "x86-interrupt" fn debug_exception() {
    report_fatal("debug", 0x01);
}
extern "x86-interrupt" fn nmi() {
    report_fatal("non-maskable interrupt", 0x02);
}
extern "x86-interrupt" fn breakpoint() {
    debug!("breakpoint");
}
extern "x86-interrupt" fn overflow() {
    report_fatal("overflow", 0x04);
}
extern "x86-interrupt" fn bound_range() {
    report_fatal("bound-range exceeded", 0x05);
}
extern "x86-interrupt" fn invalid_opcode() {
    report_fatal("invalid opcode", 0x06);
}
extern "x86-interrupt" fn device_not_available() {
    report_fatal("device not available", 0x07);
}
extern "x86-interrupt" fn double_fault() {
    report_fatal("double fault", 0x08);
}
extern "x86-interrupt" fn invalid_tss() {
    report_fatal("invalid TSS", 0x0A);
}
extern "x86-interrupt" fn segment_not_present() {
    report_fatal("segment not present", 0x0B);
}
extern "x86-interrupt" fn stack_segment_fault() {
    report_fatal("stack-segment fault", 0x0C);
}
extern "x86-interrupt" fn general_protection_fault() {
    report_fatal("general protection fault", 0x0D);
}
extern "x86-interrupt" fn page_fault() {
    let fault_addr: u32;
    unsafe {
        core::arch::asm!("mov {}, cr2", out(reg) fault_addr);
    }
    error!("page fault at {:#010x}", fault_addr);
    crate::arch::x86::halt();
}
extern "x86-interrupt" fn x87_fp_exception() {
    report_fatal("x87 floating-point exception", 0x10);
}
extern "x86-interrupt" fn alignment_check() {
    report_fatal("alignment check", 0x11);
}
extern "x86-interrupt" fn machine_check() {
    report_fatal("machine check", 0x12);
}
extern "x86-interrupt" fn simd_fp_exception() {
    report_fatal("SIMD floating-point exception", 0x13);
}

fn report_fatal(name: &'static str, code: u32) -> ! {
    error!(
        "{}",
        KernelError::FatalException { name, code }
    );
    crate::arch::x86::halt();
}

extern "x86-interrupt" fn pit_interrupt() {
    crate::sched::on_tick();
    super::pic::send_eoi(0);
}

extern "x86-interrupt" fn keyboard_interrupt() {
    crate::terminal::keyboard::on_scancode();
    super::pic::send_eoi(1);
}

extern "x86-interrupt" fn rtc_interrupt() {
    super::rtc::on_tick();
    super::pic::send_eoi(8);
}

/// `int 0x80` entry point. Unlike the exception/IRQ handlers above this
/// cannot use `extern "x86-interrupt"`: that ABI gives no access to the
/// general-purpose registers the syscall ABI passes arguments in (eax =
/// number, ebx/ecx/edx = args 1-3). A naked function saves exactly
/// those three, calls the dispatcher with the cdecl convention, and
/// restores them before `iretd`, leaving the dispatcher's return value
/// in eax for the caller.
#[unsafe(naked)]
unsafe extern "C" fn syscall_entry() {
    core::arch::naked_asm!(
        "push ebx",
        "push ecx",
        "push edx",
        "push edx",
        "push ecx",
        "push ebx",
        "push eax",
        "call {handler}",
        "add esp, 16",
        "pop edx",
        "pop ecx",
        "pop ebx",
        "iretd",
        handler = sym crate::syscall::dispatch,
    );
}

fn set(vector: usize, handler: extern "x86-interrupt" fn(), gate_type: u8, dpl: u8) {
    unsafe {
        IDT[vector] = GateDescriptor::new(handler as usize as u32, gate_type, dpl);
    }
}

fn set_raw(vector: usize, handler: unsafe extern "C" fn(), gate_type: u8, dpl: u8) {
    unsafe {
        IDT[vector] = GateDescriptor::new(handler as usize as u32, gate_type, dpl);
    }
}

pub fn init() {
    set(0x00, divide_by_zero, GATE_INTERRUPT32, 0);
    set(0x01, debug_exception, GATE_INTERRUPT32, 0);
    set(0x02, nmi, GATE_INTERRUPT32, 0);
    set(0x03, breakpoint, GATE_TRAP32, 0);
    set(0x04, overflow, GATE_INTERRUPT32, 0);
    set(0x05, bound_range, GATE_INTERRUPT32, 0);
    set(0x06, invalid_opcode, GATE_INTERRUPT32, 0);
    set(0x07, device_not_available, GATE_INTERRUPT32, 0);
    set(0x08, double_fault, GATE_INTERRUPT32, 0);
    set(0x0A, invalid_tss, GATE_INTERRUPT32, 0);
    set(0x0B, segment_not_present, GATE_INTERRUPT32, 0);
    set(0x0C, stack_segment_fault, GATE_INTERRUPT32, 0);
    set(0x0D, general_protection_fault, GATE_INTERRUPT32, 0);
    set(0x0E, page_fault, GATE_INTERRUPT32, 0);
    set(0x10, x87_fp_exception, GATE_INTERRUPT32, 0);
    set(0x11, alignment_check, GATE_INTERRUPT32, 0);
    set(0x12, machine_check, GATE_INTERRUPT32, 0);
    set(0x13, simd_fp_exception, GATE_INTERRUPT32, 0);

    set(0x20, pit_interrupt, GATE_INTERRUPT32, 0);
    set(0x21, keyboard_interrupt, GATE_INTERRUPT32, 0);
    set(0x28, rtc_interrupt, GATE_INTERRUPT32, 0);

    // Trap gate, DPL=3: the only vector user-mode code may `int` into.
    set_raw(0x80, syscall_entry, GATE_TRAP32, 3);

    unsafe {
        let ptr = DescriptorTablePointer {
            base: IDT.as_ptr(),
            limit: (size_of::<[GateDescriptor; NUM_VECTORS]>() - 1) as u16,
        };
        lidt(&ptr);
    }
}
