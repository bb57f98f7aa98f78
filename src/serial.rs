//! Serial port output, used for the boot-trace logger and for QEMU test
//! reporting (neither rides on the VGA text screen, which the first shell
//! overwrites immediately after boot).

use core::fmt;

use spin::Mutex;
use uart_16550::SerialPort;

const COM1: u16 = 0x3F8;

static SERIAL1: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(COM1) });

/// Initialize the serial port. Must run before the first `serial_print!`.
pub fn init() {
    SERIAL1.lock().init();
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_serial_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => {
        $crate::serial_print!("{}\n", format_args!($($arg)*))
    };
}

#[doc(hidden)]
pub fn _serial_print(args: fmt::Arguments) {
    use fmt::Write;
    crate::arch::x86::without_interrupts(|| {
        SERIAL1.lock().write_fmt(args).ok();
    });
}
