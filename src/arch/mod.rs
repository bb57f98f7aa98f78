//! Architecture support. Only 32-bit x86 is implemented.

pub mod x86;
