//! Operations vectors bound to a file descriptor at `open` time.
//!
//! Each vector dispatches `open`/`read`/`write`/`close` for one file
//! type (regular, directory, rtc) or one special stream (stdin/stdout)
//! without the caller needing to branch on type.

use super::{read_data, DirCursor};
use crate::{
    arch::x86::rtc,
    error::{FsError, KernelError, KernelResult, SyscallError},
    process::fd::{FileDescriptor, OperationsVector},
    terminal,
};

pub fn stdin_ops() -> OperationsVector {
    OperationsVector {
        open: |_inode| Ok(()),
        read: |fd, buf| terminal::terminal_read(fd.name[0] as usize, buf),
        write: |_fd, _buf| Err(KernelError::Syscall(SyscallError::InvalidArgument)),
        close: |_fd| Ok(()),
    }
}

pub fn stdout_ops() -> OperationsVector {
    OperationsVector {
        open: |_inode| Ok(()),
        read: |_fd, _buf| Err(KernelError::Syscall(SyscallError::InvalidArgument)),
        write: |fd, buf| terminal::terminal_write(fd.name[0] as usize, buf),
        close: |_fd| Ok(()),
    }
}

pub fn regular_ops() -> OperationsVector {
    OperationsVector {
        open: |_inode| Ok(()),
        read: |fd, buf| {
            let n = read_data(fd.inode, fd.file_offset, buf)?;
            fd.file_offset += n as u32;
            Ok(n)
        },
        write: |_fd, _buf| Err(KernelError::Fs(FsError::NotFound)),
        close: |_fd| Ok(()),
    }
}

/// A directory fd stores its `DirCursor` state packed into `file_offset`
/// (the index of the next entry to yield); `name` is otherwise unused.
pub fn directory_ops() -> OperationsVector {
    OperationsVector {
        open: |_inode| Ok(()),
        read: |fd, buf| {
            if fd.file_offset as usize >= super::num_dentries() {
                fd.file_offset = 0;
                return Ok(0);
            }
            let mut cursor = DirCursor::new();
            // file_offset tracks how many entries have been consumed so far.
            for _ in 0..fd.file_offset {
                let mut discard = [0u8; 32];
                cursor.read_next(&mut discard);
            }
            let n = cursor.read_next(buf);
            fd.file_offset += 1;
            Ok(n)
        },
        write: |_fd, _buf| Err(KernelError::Fs(FsError::NotFound)),
        close: |_fd| Ok(()),
    }
}

pub fn rtc_ops() -> OperationsVector {
    OperationsVector {
        open: |_inode| {
            rtc::set_rate(2);
            Ok(())
        },
        read: |_fd, _buf| {
            rtc::wait_for_tick();
            Ok(0)
        },
        write: |_fd, buf| {
            if buf.len() != 4 {
                return Err(KernelError::Syscall(SyscallError::InvalidArgument));
            }
            let hz = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
            rtc::set_rate(hz)?;
            Ok(4)
        },
        close: |_fd| Ok(()),
    }
}

/// Marks `fd` free and runs its operations vector's `close`, if any.
pub fn close(fd: &mut FileDescriptor) -> KernelResult<()> {
    if let Some(ops) = fd.ops {
        (ops.close)(fd)?;
    }
    *fd = FileDescriptor::empty();
    Ok(())
}
