//! Read-only, memory-mapped file system.
//!
//! The image is a contiguous region of physical memory handed to the
//! kernel at boot: a 64-byte boot block, a 63-entry directory-entry
//! array, one inode block per inode, then the data blocks. Every block
//! is 4 KiB. There is no write path — programs and the shell binary are
//! baked into the image by the build that produces it.

pub mod file;

use core::{mem, slice};

use crate::error::{FsError, KernelError, KernelResult};

pub const BLOCK_SIZE: usize = 4096;
pub const MAX_DENTRIES: usize = 63;
pub const MAX_DATA_BLOCKS_PER_INODE: usize = 1023;
const NAME_LEN: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileType {
    Rtc,
    Directory,
    Regular,
}

impl FileType {
    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Rtc),
            1 => Some(Self::Directory),
            2 => Some(Self::Regular),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
pub struct DirEntry {
    pub name: [u8; NAME_LEN],
    pub name_len: u8,
    pub file_type: FileType,
    pub inode: u32,
}

impl DirEntry {
    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }
}

#[repr(C)]
struct RawDentry {
    filename: [u8; NAME_LEN],
    filetype: u32,
    inode: u32,
    reserved: [u8; 24],
}

#[repr(C)]
struct RawBootBlock {
    num_dentries: u32,
    num_inodes: u32,
    num_data_blocks: u32,
    reserved: [u8; 52],
    dentries: [RawDentry; MAX_DENTRIES],
}

struct Image {
    base: *const u8,
    len: usize,
}

unsafe impl Sync for Image {}

static mut IMAGE: Image = Image {
    base: core::ptr::null(),
    len: 0,
};

/// Binds the decoder to the physical image location handed to the kernel
/// by the bootloader. Must be called once before any other `fs::` call.
pub fn init(base: *const u8, len: usize) {
    unsafe {
        IMAGE = Image { base, len };
    }
}

fn image() -> &'static [u8] {
    unsafe { slice::from_raw_parts(IMAGE.base, IMAGE.len) }
}

fn boot_block() -> &'static RawBootBlock {
    let img = image();
    debug_assert!(img.len() >= mem::size_of::<RawBootBlock>());
    unsafe { &*(img.as_ptr() as *const RawBootBlock) }
}

fn block(index: usize) -> &'static [u8; BLOCK_SIZE] {
    let img = image();
    let start = index * BLOCK_SIZE;
    debug_assert!(start + BLOCK_SIZE <= img.len());
    unsafe { &*(img.as_ptr().add(start) as *const [u8; BLOCK_SIZE]) }
}

fn num_dentries() -> usize {
    (boot_block().num_dentries as usize).min(MAX_DENTRIES)
}

fn num_inodes() -> usize {
    boot_block().num_inodes as usize
}

fn num_data_blocks() -> usize {
    boot_block().num_data_blocks as usize
}

fn decode_dentry(raw: &RawDentry) -> Option<DirEntry> {
    let file_type = FileType::from_raw(raw.filetype)?;
    let name_len = raw
        .filename
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(NAME_LEN) as u8;
    Some(DirEntry {
        name: raw.filename,
        name_len,
        file_type,
        inode: raw.inode,
    })
}

pub fn read_dentry_by_index(index: usize) -> Option<DirEntry> {
    if index >= num_dentries() {
        return None;
    }
    decode_dentry(&boot_block().dentries[index])
}

pub fn read_dentry_by_name(name: &[u8]) -> Option<DirEntry> {
    for i in 0..num_dentries() {
        let raw = &boot_block().dentries[i];
        let raw_len = raw
            .filename
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LEN);
        if &raw.filename[..raw_len] == name {
            return decode_dentry(raw);
        }
    }
    None
}

struct Inode {
    size: u32,
    data_blocks: [u32; MAX_DATA_BLOCKS_PER_INODE],
}

fn inode(inode_num: u32) -> KernelResult<&'static Inode> {
    if inode_num as usize >= num_inodes() {
        return Err(KernelError::Fs(FsError::NotFound));
    }
    let block_index = 1 + inode_num as usize;
    let bytes = block(block_index);
    Ok(unsafe { &*(bytes.as_ptr() as *const Inode) })
}

/// Reads up to `buf.len()` bytes from `inode_num` starting at `offset`.
/// Returns `Ok(0)` at end of file, never partial-reads past EOF, and
/// fails distinctly if the inode references a data block beyond the
/// image's data-block count (a corrupt file system).
pub fn read_data(inode_num: u32, offset: u32, buf: &mut [u8]) -> KernelResult<usize> {
    let ino = inode(inode_num)?;
    if offset >= ino.size {
        return Ok(0);
    }
    let remaining_in_file = (ino.size - offset) as usize;
    let to_read = buf.len().min(remaining_in_file);
    let data_blocks_base = 1 + num_inodes();

    let mut written = 0;
    while written < to_read {
        let file_pos = offset as usize + written;
        let block_in_file = file_pos / BLOCK_SIZE;
        let block_offset = file_pos % BLOCK_SIZE;

        let data_block_index = *ino
            .data_blocks
            .get(block_in_file)
            .ok_or(KernelError::Fs(FsError::CorruptInode))?;
        if data_block_index as usize >= num_data_blocks() {
            return Err(KernelError::Fs(FsError::BlockIndexOutOfRange {
                index: data_block_index,
            }));
        }

        let src = block(data_blocks_base + data_block_index as usize);
        let chunk = (to_read - written).min(BLOCK_SIZE - block_offset);
        buf[written..written + chunk]
            .copy_from_slice(&src[block_offset..block_offset + chunk]);
        written += chunk;
    }
    Ok(written)
}

/// Copies the entire contents of `name` to `dest`. Used by `execute` to
/// load a program image; the caller is responsible for `dest` being large
/// enough (the image format guarantees no user program exceeds one 4 MiB
/// page).
pub fn load(name: &[u8], dest: &mut [u8]) -> KernelResult<usize> {
    let dentry = read_dentry_by_name(name).ok_or(KernelError::Fs(FsError::NotFound))?;
    let mut total = 0;
    loop {
        let n = read_data(dentry.inode, total as u32, &mut dest[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Stateful directory iterator: each call yields the next entry's name
/// until the last has been returned, then returns 0 and resets to the
/// first entry again.
pub struct DirCursor {
    next: usize,
}

impl DirCursor {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    pub fn read_next(&mut self, buf: &mut [u8]) -> usize {
        let total = num_dentries();
        if self.next >= total {
            self.next = 0;
            return 0;
        }
        let entry = read_dentry_by_index(self.next);
        self.next += 1;
        match entry {
            Some(d) => {
                let n = d.name().len().min(buf.len());
                buf[..n].copy_from_slice(&d.name()[..n]);
                n
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_image() -> ([u8; BLOCK_SIZE * 3], DirEntry) {
        let mut img = [0u8; BLOCK_SIZE * 3];
        img[0..4].copy_from_slice(&1u32.to_le_bytes());
        img[4..8].copy_from_slice(&1u32.to_le_bytes());
        img[8..12].copy_from_slice(&1u32.to_le_bytes());

        let dentry_off = 64;
        img[dentry_off..dentry_off + 4].copy_from_slice(b"cat\0");
        img[dentry_off + 32..dentry_off + 36].copy_from_slice(&2u32.to_le_bytes());
        img[dentry_off + 36..dentry_off + 40].copy_from_slice(&0u32.to_le_bytes());

        let inode_off = BLOCK_SIZE;
        img[inode_off..inode_off + 4].copy_from_slice(&5u32.to_le_bytes());
        img[inode_off + 4..inode_off + 8].copy_from_slice(&0u32.to_le_bytes());

        let data_off = BLOCK_SIZE * 2;
        img[data_off..data_off + 5].copy_from_slice(b"hello");

        (
            img,
            DirEntry {
                name: *b"cat\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
                name_len: 3,
                file_type: FileType::Regular,
                inode: 0,
            },
        )
    }

    #[test]
    fn reads_whole_small_file() {
        let (img, _) = build_image();
        init(img.as_ptr(), img.len());
        let mut buf = [0u8; 16];
        let n = read_data(0, 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn lookup_by_name_finds_entry() {
        let (img, _) = build_image();
        init(img.as_ptr(), img.len());
        let d = read_dentry_by_name(b"cat").unwrap();
        assert_eq!(d.inode, 0);
        assert_eq!(d.file_type, FileType::Regular);
    }

    #[test]
    fn eof_returns_zero() {
        let (img, _) = build_image();
        init(img.as_ptr(), img.len());
        let mut buf = [0u8; 4];
        assert_eq!(read_data(0, 5, &mut buf).unwrap(), 0);
    }
}
