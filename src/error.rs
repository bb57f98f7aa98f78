//! Kernel error taxonomy.
//!
//! Four buckets, matching the error-handling design: argument errors,
//! resource exhaustion, file-system corruption, and fatal CPU exceptions.
//! Every fallible kernel-internal function returns `Result<T, KernelError>`;
//! only the syscall dispatch boundary collapses this to the ABI's `isize`.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    /// Null pointer where forbidden, out-of-range fd, bad argument count,
    /// name too long, and similar caller mistakes.
    Syscall(SyscallError),
    /// No free process slot, fd table full, file-system image saturated.
    ResourceExhausted { resource: &'static str },
    /// Inode size inconsistent with its data-block indices, or a block
    /// index referenced by an inode is out of range.
    Fs(FsError),
    /// Not recoverable: reported, then the CPU halts.
    FatalException { name: &'static str, code: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    BadFd,
    NullPointer,
    InvalidArgument,
    NameTooLong,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    CorruptInode,
    BlockIndexOutOfRange { index: u32 },
}

pub type KernelResult<T> = Result<T, KernelError>;

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syscall(e) => write!(f, "syscall error: {:?}", e),
            Self::ResourceExhausted { resource } => write!(f, "resource exhausted: {}", resource),
            Self::Fs(e) => write!(f, "file-system error: {:?}", e),
            Self::FatalException { name, code } => {
                write!(f, "fatal CPU exception: {} (code 0x{:x})", name, code)
            }
        }
    }
}

impl From<SyscallError> for KernelError {
    fn from(err: SyscallError) -> Self {
        Self::Syscall(err)
    }
}

impl From<FsError> for KernelError {
    fn from(err: FsError) -> Self {
        Self::Fs(err)
    }
}

/// Collapse a kernel result to the syscall ABI's convention: the value on
/// success, -1 on any error.
pub fn to_syscall_result(result: KernelResult<usize>) -> i32 {
    match result {
        Ok(v) => v as i32,
        Err(_) => -1,
    }
}
