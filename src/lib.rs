//! `trident-kernel` library crate.
//!
//! Holds every module except the boot entry point and Multiboot2
//! plumbing, which live only in the binary (`main.rs`) -- they have
//! nothing to offer a host-side `cargo test` run. Splitting this way
//! lets the pure-logic modules (ELF validation, file-system decoding,
//! the process bitmap) run their `#[cfg(test)]` unit tests with the
//! ordinary host target and `std`'s test harness, while `tests/
//! boot_smoke.rs` exercises the real boot sequence under QEMU with the
//! custom no_std target and the harness below.

#![no_std]
#![cfg_attr(all(test, target_os = "none"), no_main)]
#![feature(custom_test_frameworks)]
#![feature(abi_x86_interrupt)]
#![cfg_attr(target_os = "none", test_runner(crate::test_runner))]
#![cfg_attr(target_os = "none", reexport_test_harness_main = "test_main")]

// On host, pull in std so `cargo test`'s own harness/panic runtime link
// against it; the bare no_std target never takes this branch.
#[cfg(not(target_os = "none"))]
extern crate std;

#[macro_use]
pub mod print;

pub mod arch;
pub mod config;
pub mod elf;
pub mod error;
pub mod fs;
pub mod logger;
pub mod mm;
pub mod multiboot;
pub mod process;
pub mod sched;
pub mod serial;
mod syscall;
pub mod terminal;

mod test_framework;

pub use test_framework::{exit_qemu, test_panic_handler, test_runner, QemuExitCode, Testable};

#[cfg(all(test, target_os = "none"))]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    test_main();
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(all(test, target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    test_framework::test_panic_handler(info)
}
