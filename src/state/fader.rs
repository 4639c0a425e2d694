//! Motorized fader state and its pitch bend wire encoding

use crate::midi::{convert, format_hex};

/// One motorized fader
///
/// `encoded` is always derived from (`status`, `current`): it is rewritten by
/// every path that changes `current` and never assigned on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Fader {
    /// Strip position (1-based)
    index: u8,
    /// Last confirmed position (0.0-1.0)
    current: f64,
    /// Latest position reported while touched, not yet confirmed
    pending: f64,
    /// True while a hand is on the fader
    touching: bool,
    /// Pitch bend message that moves the motor to `current`
    encoded: [u8; 3],
}

impl Fader {
    /// Create a fader at position 0.0 for the given strip and pitch bend status
    pub fn new(index: u8, status: u8) -> Self {
        let mut fader = Self {
            index,
            current: 0.0,
            pending: 0.0,
            touching: false,
            encoded: [status, 0x00, 0x00],
        };
        fader.set_current(0.0);
        fader
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn pending(&self) -> f64 {
        self.pending
    }

    pub fn is_touching(&self) -> bool {
        self.touching
    }

    /// Pitch bend message for the motor
    pub fn encoded(&self) -> [u8; 3] {
        self.encoded
    }

    /// Set the confirmed position (clamped) and re-encode it
    pub fn set_current(&mut self, value: f64) {
        self.current = convert::clamp_normalized(value);
        let (lsb, msb) = convert::split_14bit(convert::to_14bit(self.current));
        self.encoded[1] = lsb;
        self.encoded[2] = msb;
    }

    /// Flag only; the position is left alone
    pub fn set_touching(&mut self, touching: bool) {
        self.touching = touching;
    }

    /// Store an in-flight position while touched
    pub fn record_pending(&mut self, value: f64) {
        self.pending = convert::clamp_normalized(value);
    }

    /// Promote the pending position to `current` and return the message that
    /// parks the motor there
    pub fn commit_pending(&mut self) -> [u8; 3] {
        self.set_current(self.pending);
        tracing::trace!(
            "Fader {} committed {:.4} ({})",
            self.index,
            self.current,
            format_hex(&self.encoded)
        );
        self.encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::convert::{from_14bit, join_14bit};

    #[test]
    fn test_new_fader_encoding() {
        let fader = Fader::new(3, 0xE2);
        assert_eq!(fader.encoded(), [0xE2, 0x00, 0x00]);
        assert_eq!(fader.current(), 0.0);
        assert!(!fader.is_touching());
    }

    #[test]
    fn test_set_current_encodes_14bit() {
        let mut fader = Fader::new(1, 0xE0);

        fader.set_current(1.0);
        assert_eq!(fader.encoded(), [0xE0, 127, 127]);

        fader.set_current(0.5);
        // floor(0.5 * 16383) = 8191 = 63 * 128 + 127
        assert_eq!(fader.encoded(), [0xE0, 127, 63]);
    }

    #[test]
    fn test_set_current_clamps() {
        let mut fader = Fader::new(1, 0xE0);
        fader.set_current(1.5);
        assert_eq!(fader.current(), 1.0);
        fader.set_current(-0.2);
        assert_eq!(fader.current(), 0.0);
        assert_eq!(fader.encoded(), [0xE0, 0, 0]);
    }

    #[test]
    fn test_touching_leaves_position_alone() {
        let mut fader = Fader::new(2, 0xE1);
        fader.set_current(0.25);
        let before = fader.encoded();

        fader.set_touching(true);
        assert!(fader.is_touching());
        assert_eq!(fader.current(), 0.25);
        assert_eq!(fader.encoded(), before);
    }

    #[test]
    fn test_pending_does_not_move_current() {
        let mut fader = Fader::new(1, 0xE0);
        fader.set_current(0.1);
        fader.record_pending(0.9);
        assert_eq!(fader.current(), 0.1);
        assert_eq!(fader.pending(), 0.9);
    }

    #[test]
    fn test_commit_pending() {
        let mut fader = Fader::new(4, 0xE3);
        let value = 8192.0 / 16383.0;
        fader.record_pending(value);

        let sent = fader.commit_pending();
        assert_eq!(fader.current(), value);
        assert_eq!(sent, fader.encoded());
        assert_eq!(sent[0], 0xE3);

        let decoded = from_14bit(join_14bit(sent[1], sent[2]));
        assert!((decoded - value).abs() <= 1.0 / 16383.0);
    }
}
