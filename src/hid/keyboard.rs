//! Boot protocol keyboard reports (HID 1.11, Appendix B.1)

use bitflags::bitflags;

use crate::error::{Result, UsbError};
use crate::hid::BOOT_REPORT_LEN;

/// Raw boot keyboard report as moved through the report ring
pub type RawReport = [u8; BOOT_REPORT_LEN];

/// Decoded boot keyboard report
///
/// - Byte 0: modifier bitmap
/// - Byte 1: reserved
/// - Bytes 2-7: up to six usage IDs of pressed keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardReport {
    /// Modifier key states
    pub modifiers: KeyModifiers,
    keycodes: [u8; 6],
}

impl KeyboardReport {
    /// Usage ID reported in every slot when too many keys are held
    pub const ERROR_ROLL_OVER: u8 = 0x01;

    /// Decode a report; needs at least 8 bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BOOT_REPORT_LEN {
            return Err(UsbError::ShortTransfer);
        }
        let mut keycodes = [0u8; 6];
        keycodes.copy_from_slice(&data[2..8]);
        Ok(Self {
            modifiers: KeyModifiers::from_bits_retain(data[0]),
            keycodes,
        })
    }

    /// Usage IDs of pressed keys, empty slots skipped
    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keycodes
            .iter()
            .filter(|&&code| code != 0)
            .map(|&code| KeyCode(code))
    }

    /// Keyboard signalled phantom state
    pub fn is_rollover(&self) -> bool {
        self.keycodes.iter().all(|&code| code == Self::ERROR_ROLL_OVER)
    }

    /// `key` is held
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.keycodes.contains(&key.0)
    }
}

bitflags! {
    /// Modifier byte of a boot keyboard report
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyModifiers: u8 {
        /// Left Control
        const LEFT_CTRL = 1 << 0;
        /// Left Shift
        const LEFT_SHIFT = 1 << 1;
        /// Left Alt
        const LEFT_ALT = 1 << 2;
        /// Left GUI
        const LEFT_GUI = 1 << 3;
        /// Right Control
        const RIGHT_CTRL = 1 << 4;
        /// Right Shift
        const RIGHT_SHIFT = 1 << 5;
        /// Right Alt
        const RIGHT_ALT = 1 << 6;
        /// Right GUI
        const RIGHT_GUI = 1 << 7;
    }
}

impl KeyModifiers {
    /// Either Shift
    pub fn shift(&self) -> bool {
        self.intersects(Self::LEFT_SHIFT | Self::RIGHT_SHIFT)
    }

    /// Either Control
    pub fn ctrl(&self) -> bool {
        self.intersects(Self::LEFT_CTRL | Self::RIGHT_CTRL)
    }
}

/// Keyboard usage ID (HID Usage Tables, page 0x07)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyCode(pub u8);

impl KeyCode {
    /// a / A
    pub const A: Self = Self(0x04);
    /// z / Z
    pub const Z: Self = Self(0x1D);
    /// Return
    pub const ENTER: Self = Self(0x28);
    /// Escape
    pub const ESCAPE: Self = Self(0x29);
    /// Backspace
    pub const BACKSPACE: Self = Self(0x2A);
    /// Space
    pub const SPACE: Self = Self(0x2C);
}
