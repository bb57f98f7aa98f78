//! `open`/`close`/`read`/`write`: dispatch through the calling process's
//! fd table and the operations vector bound to each entry at `open` time.

use crate::{
    config::MAX_OPEN_FILES,
    error::to_syscall_result,
    fs::{self, file, FileType},
    process::{self, fd::FdFlags},
};

use super::{copy_user_cstr, user_slice, user_slice_mut};

/// `stdin`/`stdout` reinstall fds 0/1 with their stream vectors; any other
/// name is looked up in the directory and bound to the lowest free fd in
/// `[2, MAX_OPEN_FILES)`.
pub fn sys_open(name_ptr: u32) -> i32 {
    let mut name_buf = [0u8; 32];
    let name_len = match copy_user_cstr(name_ptr, &mut name_buf) {
        Some(n) if n <= 32 => n,
        _ => return -1,
    };
    let name = &name_buf[..name_len];
    let pcb = process::current_pcb();

    if name == b"stdin" {
        pcb.fds[0] = process::stream_fd(file::stdin_ops(), pcb.terminal_id);
        return 0;
    }
    if name == b"stdout" {
        pcb.fds[1] = process::stream_fd(file::stdout_ops(), pcb.terminal_id);
        return 1;
    }

    let dentry = match fs::read_dentry_by_name(name) {
        Some(d) => d,
        None => return -1,
    };
    let ops = match dentry.file_type {
        FileType::Rtc => file::rtc_ops(),
        FileType::Directory => file::directory_ops(),
        FileType::Regular => file::regular_ops(),
    };

    let fd_num = match (2..MAX_OPEN_FILES).find(|&i| pcb.fds[i].is_free()) {
        Some(i) => i,
        None => return -1,
    };
    if (ops.open)(dentry.inode).is_err() {
        return -1;
    }
    pcb.fds[fd_num] = crate::process::fd::FileDescriptor {
        ops: Some(ops),
        inode: dentry.inode,
        file_offset: 0,
        flags: FdFlags::InUse,
        name: dentry.name,
        name_len: dentry.name_len,
    };
    fd_num as i32
}

pub fn sys_close(fd: u32) -> i32 {
    if fd < 2 || fd as usize >= MAX_OPEN_FILES {
        return -1;
    }
    let entry = &mut process::current_pcb().fds[fd as usize];
    if entry.is_free() {
        return -1;
    }
    match file::close(entry) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

pub fn sys_read(fd: u32, buf_ptr: u32, n: u32) -> i32 {
    if fd as usize >= MAX_OPEN_FILES {
        return -1;
    }
    let buf = match user_slice_mut(buf_ptr, n) {
        Some(b) => b,
        None => return -1,
    };
    let entry = &mut process::current_pcb().fds[fd as usize];
    if entry.is_free() {
        return -1;
    }
    let ops = match entry.ops {
        Some(o) => o,
        None => return -1,
    };
    to_syscall_result((ops.read)(entry, buf))
}

pub fn sys_write(fd: u32, buf_ptr: u32, n: u32) -> i32 {
    if fd as usize >= MAX_OPEN_FILES {
        return -1;
    }
    let buf = match user_slice(buf_ptr, n) {
        Some(b) => b,
        None => return -1,
    };
    let entry = &mut process::current_pcb().fds[fd as usize];
    if entry.is_free() {
        return -1;
    }
    let ops = match entry.ops {
        Some(o) => o,
        None => return -1,
    };
    to_syscall_result((ops.write)(entry, buf))
}
