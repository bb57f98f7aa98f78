//! Programmable Interval Timer, driving the round-robin scheduler's
//! preemption tick at a fixed ~33 Hz.

use super::outb;
use crate::config::PIT_HZ;

const CMD_REG: u16 = 0x43;
const CHANNEL0: u16 = 0x40;
const MODE3_SQUARE_WAVE: u8 = 0x36;
const IRQ: u32 = 0;

/// Divisor for ~33 Hz, rounded to the nearest integer divisor of the
/// 1.193182 MHz PIT oscillator (matches the original driver's fixed
/// constant rather than computing it from `PIT_BASE_HZ / PIT_HZ`, which
/// rounds to a slightly different value).
const DIVISOR_33HZ: u16 = 36157;

pub fn init() {
    debug_assert_eq!(PIT_HZ, 33, "divisor constant assumes 33 Hz");
    unsafe {
        outb(CMD_REG, MODE3_SQUARE_WAVE);
        outb(CHANNEL0, (DIVISOR_33HZ & 0xFF) as u8);
        outb(CHANNEL0, (DIVISOR_33HZ >> 8) as u8);
    }
    super::pic::enable_irq(IRQ);
}
