//! MIDI utilities and value conversions
//!
//! Status bytes, 14-bit motor fader encoding, and hex formatting for logs.

/// Note On status on channel 1
pub const NOTE_ON: u8 = 0x90;

/// Pitch Bend status on channel 1 (fader 1 in Mackie Control mode)
pub const PITCH_BEND: u8 = 0xE0;

/// Velocity used for "pressed" / "LED on"
pub const VELOCITY_ON: u8 = 0x7F;

/// Velocity used for "released" / "LED off"
pub const VELOCITY_OFF: u8 = 0x00;

/// Largest 14-bit value carried by a pitch bend message
pub const MAX_14BIT: u16 = 16383;

/// Fader value conversion utilities
///
/// The encoder floors and the decoder divides by the same full-scale value,
/// so a decoded value is never more than one 14-bit step away from the
/// normalized value it was encoded from.
pub mod convert {
    use super::MAX_14BIT;

    const FULL_SCALE: f64 = MAX_14BIT as f64;

    /// Clamp a normalized value into [0.0, 1.0] (NaN becomes 0.0)
    pub fn clamp_normalized(value: f64) -> f64 {
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        }
    }

    /// Convert a normalized value to a 14-bit value (0-16383), flooring
    pub fn to_14bit(value: f64) -> u16 {
        (clamp_normalized(value) * FULL_SCALE).floor() as u16
    }

    /// Convert a 14-bit value to a normalized value
    pub fn from_14bit(value14: u16) -> f64 {
        f64::from(value14.min(MAX_14BIT)) / FULL_SCALE
    }

    /// Split a 14-bit value into (lsb, msb) 7-bit data bytes
    pub fn split_14bit(value14: u16) -> (u8, u8) {
        let value14 = value14.min(MAX_14BIT);
        ((value14 % 128) as u8, (value14 >> 7) as u8)
    }

    /// Join two 7-bit data bytes into a 14-bit value (high bits masked)
    pub fn join_14bit(lsb: u8, msb: u8) -> u16 {
        (u16::from(msb & 0x7F) << 7) | u16::from(lsb & 0x7F)
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_and_join() {
        assert_eq!(convert::split_14bit(0), (0, 0));
        assert_eq!(convert::split_14bit(8192), (0, 64));
        assert_eq!(convert::split_14bit(16383), (127, 127));
        assert_eq!(convert::join_14bit(0, 64), 8192);
        assert_eq!(convert::join_14bit(127, 127), 16383);
    }

    #[test]
    fn test_join_masks_high_bit() {
        assert_eq!(convert::join_14bit(0x80, 0x80), 0);
    }

    #[test]
    fn test_to_14bit_clamps() {
        assert_eq!(convert::to_14bit(-0.5), 0);
        assert_eq!(convert::to_14bit(1.0), 16383);
        assert_eq!(convert::to_14bit(7.0), 16383);
        assert_eq!(convert::to_14bit(f64::NAN), 0);
    }

    #[test]
    fn test_from_14bit_endpoints() {
        assert_eq!(convert::from_14bit(0), 0.0);
        assert_eq!(convert::from_14bit(16383), 1.0);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xE2, 0x00, 0x40]), "E2 00 40");
        assert_eq!(format_hex(&[]), "");
    }

    proptest! {
        #[test]
        fn prop_round_trip_within_one_step(step in 0u16..=16383) {
            let value = f64::from(step) / 16383.0;
            let (lsb, msb) = convert::split_14bit(convert::to_14bit(value));
            let decoded = convert::from_14bit(convert::join_14bit(lsb, msb));
            prop_assert!((decoded - value).abs() <= 1.0 / 16383.0 + 1e-12);
        }

        #[test]
        fn prop_data_bytes_are_7bit(value in 0.0f64..=1.0) {
            let (lsb, msb) = convert::split_14bit(convert::to_14bit(value));
            prop_assert!(lsb < 128);
            prop_assert!(msb < 128);
        }
    }
}
