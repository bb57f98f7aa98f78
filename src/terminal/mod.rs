//! Three independent virtual terminals, each with its own back-buffer
//! and line editor. Only the active terminal's back-buffer is blitted to
//! physical video memory; the other two keep accepting keystrokes and
//! stdout writes invisibly in the background.

pub mod keyboard;

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use crate::{
    arch::x86::vga,
    config::{COMMAND_BUF_LEN, NUM_TERMINALS, VIDEO_FRAME_SIZE},
    error::{KernelError, KernelResult, SyscallError},
};

bitflags::bitflags! {
    #[derive(Clone, Copy, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CAPS  = 0b0010;
        const CTRL  = 0b0100;
        const ALT   = 0b1000;
    }
}

/// One back-buffer per terminal, each pinned to its own physical page so
/// `vidmap` (see `back_buffer_physical_addr`) can hand a process exactly
/// its own terminal's frame and nothing else nearby in kernel memory.
#[repr(C, align(4096))]
struct BackBufferPage([u8; VIDEO_FRAME_SIZE]);

static mut BACK_BUFFERS: [BackBufferPage; NUM_TERMINALS] =
    [const { BackBufferPage([0; VIDEO_FRAME_SIZE]) }; NUM_TERMINALS];

/// Physical (== virtual, kernel memory is identity-mapped) address of
/// `id`'s back-buffer page.
pub fn back_buffer_physical_addr(id: usize) -> u32 {
    unsafe { core::ptr::addr_of!(BACK_BUFFERS[id]) as u32 }
}

fn back_buffer_mut(id: usize) -> &'static mut [u8; VIDEO_FRAME_SIZE] {
    unsafe { &mut BACK_BUFFERS[id].0 }
}

pub struct Terminal {
    command_buf: [u8; COMMAND_BUF_LEN],
    command_len: usize,
    cursor_col: usize,
    origin_row: usize,
    origin_col: usize,
    modifiers: Modifiers,
    read_enabled: bool,
}

impl Terminal {
    const fn new() -> Self {
        Self {
            command_buf: [0; COMMAND_BUF_LEN],
            command_len: 0,
            cursor_col: 0,
            origin_row: 0,
            origin_col: 0,
            modifiers: Modifiers::empty(),
            read_enabled: false,
        }
    }

    fn row_col_offset(row: usize, col: usize) -> usize {
        (row * vga::WIDTH + col) * 2
    }

    fn putc(&mut self, id: usize, row: usize, col: usize, byte: u8) {
        let off = Self::row_col_offset(row, col);
        let buf = back_buffer_mut(id);
        buf[off] = byte;
        buf[off + 1] = 0x07;
    }

    /// Inserts `byte` into the command buffer at the cursor, shifting
    /// trailing bytes right. No-op once the buffer is full.
    fn insert(&mut self, id: usize, byte: u8) {
        if self.command_len >= COMMAND_BUF_LEN - 1 {
            return;
        }
        for i in (self.cursor_col..self.command_len).rev() {
            self.command_buf[i + 1] = self.command_buf[i];
        }
        self.command_buf[self.cursor_col] = byte;
        self.command_len += 1;
        self.cursor_col += 1;
        self.redraw(id);
    }

    /// Backspace/Delete: shifts trailing bytes left over the character
    /// immediately before the cursor.
    fn backspace(&mut self, id: usize) {
        if self.cursor_col == 0 {
            return;
        }
        for i in self.cursor_col..self.command_len {
            self.command_buf[i - 1] = self.command_buf[i];
        }
        self.command_len -= 1;
        self.cursor_col -= 1;
        self.redraw(id);
    }

    fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        }
    }

    fn move_cursor_right(&mut self) {
        if self.cursor_col < self.command_len {
            self.cursor_col += 1;
        }
    }

    fn redraw(&mut self, id: usize) {
        for (i, &byte) in self.command_buf[..self.command_len].iter().enumerate() {
            let col = self.origin_col + i;
            let row = self.origin_row + col / vga::WIDTH;
            self.putc(id, row % vga::HEIGHT, col % vga::WIDTH, byte);
        }
        let trailing_col = self.origin_col + self.command_len;
        self.putc(
            id,
            (self.origin_row + trailing_col / vga::WIDTH) % vga::HEIGHT,
            trailing_col % vga::WIDTH,
            b' ',
        );
    }

    fn set_enter(&mut self) {
        self.read_enabled = true;
    }

    fn clear(&mut self, id: usize) {
        let buf = back_buffer_mut(id);
        let mut i = 0;
        while i < VIDEO_FRAME_SIZE {
            buf[i] = b' ';
            buf[i + 1] = 0x07;
            i += 2;
        }
        self.command_len = 0;
        self.cursor_col = 0;
        self.origin_row = 0;
        self.origin_col = 0;
        self.read_enabled = true;
    }
}

static TERMINALS: [Mutex<Terminal>; NUM_TERMINALS] =
    [const { Mutex::new(Terminal::new()) }; NUM_TERMINALS];
static ACTIVE: AtomicUsize = AtomicUsize::new(0);

pub fn active_terminal() -> usize {
    ACTIVE.load(Ordering::Acquire)
}

/// Switches the visible terminal and immediately blits its back-buffer
/// to physical video memory, per Alt+F1/F2/F3.
pub fn switch_active(id: usize) {
    if id >= NUM_TERMINALS {
        return;
    }
    ACTIVE.store(id, Ordering::Release);
    mirror_active_terminal();
}

/// Called by the RTC tick handler: copies the active terminal's
/// back-buffer onto the physical frame.
pub fn mirror_active_terminal() {
    let id = active_terminal();
    let term = TERMINALS[id].lock();
    vga::present(back_buffer_mut(id));
    let trailing_col = term.origin_col + term.cursor_col;
    vga::set_cursor(
        (term.origin_row + trailing_col / vga::WIDTH) % vga::HEIGHT,
        trailing_col % vga::WIDTH,
    );
}

/// Copies from the current physical frame into all three back-buffers,
/// used once at boot so the three synthesized shells start from
/// whatever the bootloader left on screen.
pub fn init_from_physical_frame(frame: &[u8; VIDEO_FRAME_SIZE]) {
    for id in 0..NUM_TERMINALS {
        back_buffer_mut(id).copy_from_slice(frame);
    }
}

/// Current Shift/Caps/Ctrl/Alt state of the active terminal.
pub fn active_modifiers() -> Modifiers {
    TERMINALS[active_terminal()].lock().modifiers
}

/// Called by the keyboard IRQ handler after every scancode: only the
/// active terminal can be receiving physical key events, so its modifier
/// byte is the one that gets updated.
pub fn set_active_modifiers(modifiers: Modifiers) {
    TERMINALS[active_terminal()].lock().modifiers = modifiers;
}

/// Inserts a visible character into the active terminal's line editor.
pub fn active_insert(byte: u8) {
    let id = active_terminal();
    TERMINALS[id].lock().insert(id, byte);
}

pub fn active_backspace() {
    let id = active_terminal();
    TERMINALS[id].lock().backspace(id);
}

pub fn active_cursor_left() {
    TERMINALS[active_terminal()].lock().move_cursor_left();
}

pub fn active_cursor_right() {
    TERMINALS[active_terminal()].lock().move_cursor_right();
}

pub fn active_enter() {
    TERMINALS[active_terminal()].lock().set_enter();
}

/// Ctrl+L: clears the screen, the command buffer, and releases any
/// reader currently blocked in `terminal_read` on this terminal.
pub fn active_clear() {
    let id = active_terminal();
    TERMINALS[id].lock().clear(id);
}

/// Busy-waits (interrupts enabled) until `terminal_id`'s _read-enabled_
/// flag is set, then copies up to `buf.len()` bytes of its command
/// buffer out and resets cursor, command length, and the flag.
pub fn terminal_read(terminal_id: usize, buf: &mut [u8]) -> KernelResult<usize> {
    if terminal_id >= NUM_TERMINALS {
        return Err(KernelError::Syscall(SyscallError::InvalidArgument));
    }
    loop {
        {
            let mut term = TERMINALS[terminal_id].lock();
            if term.read_enabled {
                let n = term.command_len.min(buf.len());
                buf[..n].copy_from_slice(&term.command_buf[..n]);
                term.command_len = 0;
                term.cursor_col = 0;
                term.read_enabled = false;
                return Ok(n);
            }
        }
        core::hint::spin_loop();
    }
}

/// Writes `buf` into `terminal_id`'s back-buffer starting at its current
/// write cursor (tracked as the command origin's trailing edge).
pub fn terminal_write(terminal_id: usize, buf: &[u8]) -> KernelResult<usize> {
    if terminal_id >= NUM_TERMINALS {
        return Err(KernelError::Syscall(SyscallError::InvalidArgument));
    }
    let mut term = TERMINALS[terminal_id].lock();
    for &byte in buf {
        if byte == b'\n' {
            term.origin_row = (term.origin_row + 1) % vga::HEIGHT;
            term.origin_col = 0;
            continue;
        }
        let col = term.origin_col;
        let row = term.origin_row;
        term.putc(terminal_id, row, col, byte);
        term.origin_col += 1;
        if term.origin_col >= vga::WIDTH {
            term.origin_col = 0;
            term.origin_row = (term.origin_row + 1) % vga::HEIGHT;
        }
    }
    Ok(buf.len())
}
