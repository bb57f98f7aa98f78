//! 32-bit x86 architecture support: GDT/TSS, IDT, the 8259 PIC, the PIT,
//! the RTC, VGA text output, and the ring0<->ring3 transition trampoline.

pub mod gdt;
pub mod idt;
pub mod pic;
pub mod pit;
pub mod rtc;
pub mod usermode;
pub mod vga;

/// Selector for the ring-3 code segment (GDT index 5, RPL 3).
pub const USER_CS: u16 = 0x2B;
/// Selector for the ring-3 data segment (GDT index 3, RPL 3).
pub const USER_DS: u16 = 0x23;

/// Writes a byte to an I/O port.
///
/// # Safety
/// The caller must ensure `port` names a device register where writing
/// `value` is well-defined.
pub unsafe fn outb(port: u16, value: u8) {
    x86::io::outb(port, value);
}

/// Reads a byte from an I/O port.
///
/// # Safety
/// The caller must ensure `port` names a device register safe to read.
pub unsafe fn inb(port: u16) -> u8 {
    x86::io::inb(port)
}

/// Runs `f` with interrupts disabled, restoring the prior interrupt-enable
/// state (not unconditionally re-enabling) on return.
pub fn without_interrupts<F: FnOnce() -> R, R>(f: F) -> R {
    let were_enabled = interrupts_enabled();
    unsafe {
        x86::irq::disable();
    }
    let result = f();
    if were_enabled {
        unsafe {
            x86::irq::enable();
        }
    }
    result
}

/// Disables interrupts without saving/restoring prior state. For call
/// sites that hand off to `iretd` immediately after, which restores
/// EFLAGS (and so IF) from the frame it was given.
///
/// # Safety
/// Caller must ensure interrupts are re-enabled by some other path
/// (typically the next `iretd`); otherwise the kernel never reschedules.
pub unsafe fn disable_interrupts() {
    x86::irq::disable();
}

fn interrupts_enabled() -> bool {
    const IF: u32 = 1 << 9;
    unsafe { x86::bits32::eflags::eflags().bits() & IF != 0 }
}

/// Parks the CPU, waking only on interrupt, forever.
pub fn halt() -> ! {
    loop {
        unsafe {
            x86::halt();
        }
    }
}

/// Brings up every architecture subsystem in the order the rest of the
/// kernel depends on: segmentation before interrupts, interrupts before
/// the PIC is unmasked, PIC before PIT/RTC/keyboard can usefully fire.
pub fn init() {
    log::info!("gdt: initializing");
    gdt::init();
    log::info!("gdt: installed");

    log::info!("idt: initializing");
    idt::init();
    log::info!("idt: installed");

    log::info!("pic: initializing");
    pic::init();
    log::info!("pic: initialized");

    log::info!("pit: initializing");
    pit::init();
    log::info!("pit: initialized");

    log::info!("keyboard: initializing");
    pic::enable_irq(1); // PIT and RTC enable their own IRQ from init()
    log::info!("keyboard: initialized");

    log::info!("rtc: initializing");
    rtc::init();
    log::info!("rtc: initialized");
}
