//! Real-Time Clock, at a single global interrupt rate shared by every
//! process. `rtc_open`/`read`/`write` in the spec's RTC file type let a
//! process rate-limit itself against this one shared tick, not run its
//! own independent virtual clock — the original driver never stores a
//! per-process rate.

use spin::Mutex;

use super::outb;
use crate::error::{KernelError, KernelResult, SyscallError};

const RTC_PORT: u16 = 0x70;
const CMOS_PORT: u16 = 0x71;
const REG_A: u8 = 0x8A;
const REG_B: u8 = 0x8B;
const REG_C: u8 = 0x8C;

const KILL_DV_RS: u8 = 0x80;
const DV_RS: u8 = 0x2F;
const KILL_SET_PIE_AIE_UIE: u8 = 0x0F;
const SET_PIE_AIE_UIE: u8 = 0x40;

const IRQ: u32 = 8;

static INTERRUPT_OCCURRED: Mutex<bool> = Mutex::new(false);

fn inb(port: u16) -> u8 {
    unsafe { super::inb(port) }
}

fn rate_selector(hz: u32) -> Option<u8> {
    Some(match hz {
        1024 => 0x06,
        512 => 0x07,
        256 => 0x08,
        128 => 0x09,
        64 => 0x0A,
        32 => 0x0B,
        16 => 0x0C,
        8 => 0x0D,
        4 => 0x0E,
        2 => 0x0F,
        _ => return None,
    })
}

/// Sets the shared RTC interrupt rate. 8192/4096/2048 Hz are refused, as
/// in the original driver (they would starve the PIT-driven scheduler).
pub fn set_rate(hz: u32) -> KernelResult<()> {
    let rs = rate_selector(hz).ok_or(KernelError::Syscall(SyscallError::InvalidArgument))?;
    unsafe {
        outb(RTC_PORT, REG_A);
        let a_old = inb(CMOS_PORT);
        outb(RTC_PORT, REG_A);
        outb(CMOS_PORT, (0xF0 & a_old) | rs);
    }
    Ok(())
}

pub fn init() {
    unsafe {
        outb(RTC_PORT, REG_A);
        let a_old = inb(CMOS_PORT);
        outb(RTC_PORT, REG_B);
        let b_old = inb(CMOS_PORT);

        outb(RTC_PORT, REG_A);
        outb(CMOS_PORT, (KILL_DV_RS & a_old) | DV_RS);

        outb(RTC_PORT, REG_B);
        outb(CMOS_PORT, (KILL_SET_PIE_AIE_UIE & b_old) | SET_PIE_AIE_UIE);
    }
    set_rate(32).expect("32 Hz is a valid RTC rate");
    super::pic::enable_irq(IRQ);
}

/// Called from the IDT's vector-0x28 handler. Acknowledges the RTC by
/// reading Register C, raises the shared tick flag, then drives the
/// visible terminal's back-buffer onto the physical frame.
pub fn on_tick() {
    unsafe {
        outb(RTC_PORT, REG_C);
        inb(CMOS_PORT);
    }
    *INTERRUPT_OCCURRED.lock() = true;
    crate::terminal::mirror_active_terminal();
}

/// Busy-waits for the next tick, then clears the flag. Used by the RTC
/// file type's `read` operation.
pub fn wait_for_tick() {
    loop {
        let mut occurred = INTERRUPT_OCCURRED.lock();
        if *occurred {
            *occurred = false;
            return;
        }
        drop(occurred);
        core::hint::spin_loop();
    }
}
