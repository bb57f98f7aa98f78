//! Kernel log backend.
//!
//! Wires the `log` facade to the serial port so every subsystem can use
//! `log::info!`/`log::warn!`/etc. instead of calling `serial_println!`
//! directly. Registered once from `bootup()`.

use log::{Level, Metadata, Record};

struct SerialLogger;

static LOGGER: SerialLogger = SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            crate::serial_println!("[{:>5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the serial-backed logger. Safe to call only once; subsequent
/// calls are no-ops (mirrors `log::set_logger`'s own idempotence contract).
pub fn init() {
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Info));
}
