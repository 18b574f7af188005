//! Boot-protocol keyboard report.
//!
//! Payload layout (8 bytes):
//! ```text
//! Byte 0:   Modifier bitfield (LCtrl..RMeta)
//! Byte 1:   Reserved (always zero)
//! Byte 2-7: Up to 6 concurrently pressed key usage codes, zero padded
//! ```

/// Keyboard report payload size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

// Modifier bits
pub const MOD_LEFT_CTRL: u8 = 0x01;
pub const MOD_LEFT_SHIFT: u8 = 0x02;
pub const MOD_LEFT_ALT: u8 = 0x04;
pub const MOD_LEFT_META: u8 = 0x08;
pub const MOD_RIGHT_CTRL: u8 = 0x10;
pub const MOD_RIGHT_SHIFT: u8 = 0x20;
pub const MOD_RIGHT_ALT: u8 = 0x40;
pub const MOD_RIGHT_META: u8 = 0x80;

// Key usage codes (USB HID usage table, keyboard page)
pub const KEY_C: u8 = 0x06;
pub const KEY_V: u8 = 0x19;
pub const KEY_3: u8 = 0x20;
pub const KEY_4: u8 = 0x21;
pub const KEY_RIGHT: u8 = 0x4F;
pub const KEY_LEFT: u8 = 0x50;
pub const KEY_DOWN: u8 = 0x51;
pub const KEY_UP: u8 = 0x52;

/// Standard boot-protocol keyboard report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// All keys up.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [0; 6],
        }
    }

    /// A single-key chord, e.g. Meta+Shift+3.
    pub const fn shortcut(modifier: u8, keycode: u8) -> Self {
        Self {
            modifier,
            reserved: 0,
            keycodes: [keycode, 0, 0, 0, 0, 0],
        }
    }

    /// Serialise the payload into a byte slice.
    /// Returns the number of bytes written (always 8 on success).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..8].copy_from_slice(&self.keycodes);
        KEYBOARD_REPORT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes == [0; 6]
    }
}
