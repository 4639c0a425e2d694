//! LED-backed buttons of one strip

use crate::midi::{VELOCITY_OFF, VELOCITY_ON};

/// Buttons per strip (REC, SOLO, MUTE, SELECT on the X-Touch)
pub const BUTTONS_PER_STRIP: usize = 4;

/// Note distance between two buttons of the same strip
const BUTTON_ROW_STRIDE: u8 = 8;

/// The four buttons of one strip and their LED messages
///
/// Button `b` of strip `i` is note `(i - 1) + 8 * b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSet {
    index: u8,
    status: [bool; BUTTONS_PER_STRIP],
    encoded: [[u8; 3]; BUTTONS_PER_STRIP],
}

impl ButtonSet {
    pub fn new(index: u8, note_on: u8) -> Self {
        let note_offset = index.saturating_sub(1);
        let mut encoded = [[note_on, 0, VELOCITY_OFF]; BUTTONS_PER_STRIP];
        for (button, message) in encoded.iter_mut().enumerate() {
            message[1] = note_offset.wrapping_add(button as u8 * BUTTON_ROW_STRIDE);
        }

        Self {
            index,
            status: [false; BUTTONS_PER_STRIP],
            encoded,
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn status(&self) -> &[bool; BUTTONS_PER_STRIP] {
        &self.status
    }

    pub fn encoded(&self) -> &[[u8; 3]; BUTTONS_PER_STRIP] {
        &self.encoded
    }

    /// Update one button and re-encode only its message
    ///
    /// Returns the new LED message, or `None` when `button` is out of range.
    pub fn set_status(&mut self, button: usize, on: bool) -> Option<[u8; 3]> {
        let message = self.encoded.get_mut(button)?;
        self.status[button] = on;
        message[2] = if on { VELOCITY_ON } else { VELOCITY_OFF };
        Some(*message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_layout() {
        let buttons = ButtonSet::new(3, 0x90);
        assert_eq!(
            buttons.encoded(),
            &[[0x90, 2, 0], [0x90, 10, 0], [0x90, 18, 0], [0x90, 26, 0]]
        );
        assert_eq!(buttons.status(), &[false; 4]);
    }

    #[test]
    fn test_set_status_touches_one_button() {
        let mut buttons = ButtonSet::new(1, 0x90);
        let message = buttons.set_status(2, true).unwrap();

        assert_eq!(message, [0x90, 16, 127]);
        assert_eq!(buttons.status(), &[false, false, true, false]);
        assert_eq!(buttons.encoded()[0], [0x90, 0, 0]);
        assert_eq!(buttons.encoded()[2], [0x90, 16, 127]);

        buttons.set_status(2, false);
        assert_eq!(buttons.encoded()[2], [0x90, 16, 0]);
    }

    #[test]
    fn test_out_of_range_button() {
        let mut buttons = ButtonSet::new(1, 0x90);
        assert_eq!(buttons.set_status(4, true), None);
        assert_eq!(buttons.status(), &[false; 4]);
    }
}
