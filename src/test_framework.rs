//! Custom `#[test_case]` harness for on-target (QEMU) integration tests,
//! following the same host/bare-metal split used for `#[cfg(test)]` unit
//! tests of pure-logic modules.

use core::panic::PanicInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

pub trait Testable {
    fn run(&self);
}

impl<T> Testable for T
where
    T: Fn(),
{
    fn run(&self) {
        crate::serial_print!("{}...\t", core::any::type_name::<T>());
        self();
        crate::serial_println!("[ok]");
    }
}

pub fn test_runner(tests: &[&dyn Testable]) {
    crate::serial_println!("Running {} tests", tests.len());
    for test in tests {
        test.run();
    }
    exit_qemu(QemuExitCode::Success);
}

pub fn test_panic_handler(info: &PanicInfo) -> ! {
    crate::serial_println!("[failed]\n");
    crate::serial_println!("Error: {}\n", info);
    exit_qemu(QemuExitCode::Failed);
}

/// Exit QEMU via the isa-debug-exit device at port 0xf4.
pub fn exit_qemu(exit_code: QemuExitCode) -> ! {
    use crate::arch::x86::outb;
    unsafe {
        outb(0xf4, exit_code as u32 as u8);
    }
    loop {
        core::hint::spin_loop();
    }
}

#[macro_export]
macro_rules! kernel_assert {
    ($cond:expr) => {
        if !$cond {
            $crate::serial_println!("Assertion failed: {}", stringify!($cond));
            panic!("assertion failed");
        }
    };
}

#[macro_export]
macro_rules! kernel_assert_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            $crate::serial_println!(
                "Assertion failed: {} != {}\n  left: {:?}\n right: {:?}",
                stringify!($left),
                stringify!($right),
                $left,
                $right
            );
            panic!("assertion failed: not equal");
        }
    };
}
