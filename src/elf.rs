//! ELF-like executable validation.
//!
//! The kernel does not implement a full ELF loader: a program image is
//! simply copied whole to `PROGRAM_LOAD_ADDR` and entered at the 32-bit
//! little-endian word found at a fixed file offset. The only thing that
//! gets validated is the four-byte magic.

use crate::config::ENTRY_POINT_OFFSET;

pub const MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// Checks the magic and extracts the entry point. Does not copy or map
/// anything; the caller (execute) is responsible for that.
pub fn validate(image: &[u8]) -> Option<u32> {
    if image.len() < ENTRY_POINT_OFFSET + 4 {
        return None;
    }
    if image[0..4] != MAGIC {
        return None;
    }
    let entry = u32::from_le_bytes([
        image[ENTRY_POINT_OFFSET],
        image[ENTRY_POINT_OFFSET + 1],
        image[ENTRY_POINT_OFFSET + 2],
        image[ENTRY_POINT_OFFSET + 3],
    ]);
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with_entry(entry: u32) -> [u8; 32] {
        let mut img = [0u8; 32];
        img[0..4].copy_from_slice(&MAGIC);
        img[ENTRY_POINT_OFFSET..ENTRY_POINT_OFFSET + 4].copy_from_slice(&entry.to_le_bytes());
        img
    }

    #[test]
    fn accepts_valid_magic_and_reads_entry_point() {
        let img = image_with_entry(0x0804_8018);
        assert_eq!(validate(&img), Some(0x0804_8018));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut img = image_with_entry(0x1000);
        img[0] = 0x00;
        assert_eq!(validate(&img), None);
    }

    #[test]
    fn rejects_truncated_image() {
        let img = [0x7F, b'E', b'L', b'F'];
        assert_eq!(validate(&img), None);
    }
}
