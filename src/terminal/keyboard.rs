//! Keyboard IRQ handler: drains the controller's output queue, decodes
//! scan codes with `pc-keyboard`, and edits the active terminal's line
//! buffer.

use lazy_static::lazy_static;
use pc_keyboard::{layouts::Us104Key, DecodedKey, HandleControl, KeyCode, Keyboard, ScancodeSet1};
use spin::Mutex;

use super::{
    active_backspace, active_clear, active_cursor_left, active_cursor_right, active_enter,
    active_insert, set_active_modifiers, switch_active, Modifiers,
};

const DATA_PORT: u16 = 0x60;

lazy_static! {
    static ref KEYBOARD: Mutex<Keyboard<Us104Key, ScancodeSet1>> = Mutex::new(Keyboard::new(
        ScancodeSet1::new(),
        Us104Key,
        HandleControl::Ignore,
    ));
}

/// Called from the IDT's vector-0x21 handler after the PIC has
/// delivered a keyboard interrupt.
pub fn on_scancode() {
    let scancode = unsafe { super::super::arch::x86::inb(DATA_PORT) };

    // Alt+F1/F2/F3 switch the active terminal directly off the raw
    // scancode set, ahead of the full keyboard-state-machine decode:
    // function-key+modifier chords are awkward to express as a single
    // DecodedKey and the terminal switch must happen even mid-chord.
    if let Some(slot) = function_key_slot(scancode) {
        if alt_is_held() {
            switch_active(slot);
            return;
        }
    }

    let mut keyboard = KEYBOARD.lock();
    if let Ok(Some(event)) = keyboard.add_byte(scancode) {
        // Only the visible terminal can be receiving physical key events,
        // so its modifier byte is the one to update -- and it has to
        // happen before `process_keyevent` consumes `event`.
        sync_active_modifiers(keyboard.get_modifiers());

        if let Some(key) = keyboard.process_keyevent(event) {
            match key {
                DecodedKey::Unicode(c) if c == '\u{8}' => active_backspace(),
                DecodedKey::Unicode('\n') => active_enter(),
                DecodedKey::Unicode(c) if (c as u32) < 0x80 => active_insert(c as u8),
                DecodedKey::RawKey(KeyCode::ArrowLeft) => active_cursor_left(),
                DecodedKey::RawKey(KeyCode::ArrowRight) => active_cursor_right(),
                DecodedKey::RawKey(KeyCode::L) if ctrl_is_held() => active_clear(),
                _ => {}
            }
        }
    }
}

fn function_key_slot(scancode: u8) -> Option<usize> {
    match scancode {
        0x3B => Some(0), // F1
        0x3C => Some(1), // F2
        0x3D => Some(2), // F3
        _ => None,
    }
}

fn sync_active_modifiers(pc: &pc_keyboard::Modifiers) {
    let mut bits = Modifiers::empty();
    if pc.lshift || pc.rshift {
        bits |= Modifiers::SHIFT;
    }
    if pc.caps_lock {
        bits |= Modifiers::CAPS;
    }
    if pc.lctrl || pc.rctrl {
        bits |= Modifiers::CTRL;
    }
    if pc.lalt || pc.alt_gr {
        bits |= Modifiers::ALT;
    }
    set_active_modifiers(bits);
}

fn alt_is_held() -> bool {
    super::active_modifiers().contains(Modifiers::ALT)
}

fn ctrl_is_held() -> bool {
    super::active_modifiers().contains(Modifiers::CTRL)
}
