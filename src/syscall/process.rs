//! `halt`/`execute`/`getargs`/`vidmap` and the unimplemented signal stubs.

use crate::{
    config::{COMMAND_BUF_LEN, TERM_BUFFER_VADDR},
    process,
};

use super::{copy_user_cstr, user_slice_mut};

pub fn sys_halt(status: u32) -> i32 {
    process::halt(status as u8)
}

pub fn sys_execute(cmd_ptr: u32) -> i32 {
    let mut cmd = [0u8; COMMAND_BUF_LEN];
    match copy_user_cstr(cmd_ptr, &mut cmd) {
        Some(len) => process::execute(&cmd[..len]),
        None => -1,
    }
}

/// Copies the calling process's argument buffer into `buf` if it
/// (including a trailing NUL) fits in `n` bytes.
pub fn sys_getargs(buf_ptr: u32, n: u32) -> i32 {
    let pcb = process::current_pcb();
    let arg_len = pcb.arg_len as usize;
    if arg_len + 1 > n as usize {
        return -1;
    }
    let buf = match user_slice_mut(buf_ptr, n) {
        Some(b) => b,
        None => return -1,
    };
    buf[..arg_len].copy_from_slice(&pcb.argbuf[..arg_len]);
    buf[arg_len] = 0;
    0
}

/// Writes the address of the caller's own terminal back-buffer into
/// `*screen_start`. `mm::setup_new_task` already installed a mapping at
/// `TERM_BUFFER_VADDR` backed by this process's own `terminal_id`'s
/// back-buffer page, so the address is the same fixed virtual constant
/// for every process -- what differs is what it resolves to once the
/// page tables are walked.
pub fn sys_vidmap(screen_start_ptr: u32) -> i32 {
    const RANGE_START: u32 = 0x0800_0000;
    const RANGE_END: u32 = 0x0840_0000;
    if screen_start_ptr < RANGE_START || screen_start_ptr > RANGE_END - 4 {
        return -1;
    }
    let out = match user_slice_mut(screen_start_ptr, 4) {
        Some(b) => b,
        None => return -1,
    };
    out.copy_from_slice(&TERM_BUFFER_VADDR.to_le_bytes());
    0
}

pub fn sys_set_handler(_signum: u32, _handler_ptr: u32) -> i32 {
    0
}

pub fn sys_sigreturn() -> i32 {
    0
}
