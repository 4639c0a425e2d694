//! Inbound X-Touch message classification
//!
//! Cases are checked in priority order and are mutually exclusive.

use crate::config::LayoutConfig;
use crate::midi::{convert, VELOCITY_OFF, VELOCITY_ON};

/// What an inbound 3-byte message means for the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Fader position report (strip is 1-based)
    PitchBend { strip: u8, value14: u16 },
    /// Touch sensor pressed (`on`) or released
    Touch { strip: u8, on: bool },
    /// Note on at full velocity outside the touch sensor range
    BankSelect { note: u8 },
    /// Any other note on outside the touch sensor range (button release, LED echo)
    Indicator { note: u8, velocity: u8 },
    /// Not handled
    Unknown,
}

/// Classify one inbound message against the layout
pub fn classify(layout: &LayoutConfig, status: u8, data1: u8, data2: u8) -> Inbound {
    if let Some(strip) = layout.pitch_bend_strip(status) {
        return Inbound::PitchBend {
            strip,
            value14: convert::join_14bit(data1, data2),
        };
    }

    if status != layout.note_on {
        return Inbound::Unknown;
    }

    if let Some(strip) = layout.touch_strip(data1) {
        return match data2 {
            VELOCITY_ON => Inbound::Touch { strip, on: true },
            VELOCITY_OFF => Inbound::Touch { strip, on: false },
            _ => Inbound::Unknown,
        };
    }

    if data2 == VELOCITY_ON {
        Inbound::BankSelect { note: data1 }
    } else {
        Inbound::Indicator {
            note: data1,
            velocity: data2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn test_pitch_bend_range() {
        assert_eq!(
            classify(&layout(), 0xE2, 0x00, 0x40),
            Inbound::PitchBend {
                strip: 3,
                value14: 8192
            }
        );
        assert_eq!(
            classify(&layout(), 0xE8, 0x7F, 0x7F),
            Inbound::PitchBend {
                strip: 9,
                value14: 16383
            }
        );
        assert_eq!(classify(&layout(), 0xE9, 0x00, 0x40), Inbound::Unknown);
    }

    #[test]
    fn test_touch_sensors() {
        assert_eq!(
            classify(&layout(), 0x90, 0x6A, 0x7F),
            Inbound::Touch { strip: 3, on: true }
        );
        assert_eq!(
            classify(&layout(), 0x90, 0x70, 0x00),
            Inbound::Touch { strip: 9, on: false }
        );
        assert_eq!(classify(&layout(), 0x90, 0x68, 0x40), Inbound::Unknown);
    }

    #[test]
    fn test_bank_select_and_indicator() {
        assert_eq!(
            classify(&layout(), 0x90, 92, 0x7F),
            Inbound::BankSelect { note: 92 }
        );
        // Unmapped notes still classify as BankSelect; the table lookup decides
        assert_eq!(
            classify(&layout(), 0x90, 10, 0x7F),
            Inbound::BankSelect { note: 10 }
        );
        assert_eq!(
            classify(&layout(), 0x90, 92, 0x00),
            Inbound::Indicator {
                note: 92,
                velocity: 0
            }
        );
    }

    #[test]
    fn test_other_statuses_unknown() {
        assert_eq!(classify(&layout(), 0xB0, 0x10, 0x01), Inbound::Unknown);
        assert_eq!(classify(&layout(), 0x80, 92, 0x7F), Inbound::Unknown);
        assert_eq!(classify(&layout(), 0x91, 92, 0x7F), Inbound::Unknown);
    }
}
